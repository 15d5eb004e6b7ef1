//! Classifier — document type, parties, institutes and focus areas.

use coordination::{AgentName, SessionTierContext};

use super::types::Classification;
use super::AgentOutput;
use crate::errors::AgentError;
use crate::prompts;
use crate::runner::{AgentOverrides, AgentRunner};

fn build_prompt(document: &str, user_context: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(context) = user_context {
        prompt.push_str(&format!("USER CONTEXT: {context}\n\n"));
    }
    prompt.push_str("Classify the following document:\n\n");
    prompt.push_str(document);
    prompt
}

pub async fn run(
    runner: &AgentRunner,
    ctx: &SessionTierContext,
    document: &str,
    user_context: Option<&str>,
) -> Result<AgentOutput<Classification>, AgentError> {
    let overrides = AgentOverrides::system(prompts::system_prompt(prompts::CLASSIFIER));
    let result = runner
        .run::<Classification>(
            ctx,
            AgentName::Classifier,
            &build_prompt(document, user_context),
            &overrides,
        )
        .await?;
    Ok(result.into())
}
