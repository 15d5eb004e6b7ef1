//! Analyzer — clause-by-clause risk review.

use coordination::{AgentName, SessionTierContext};

use super::types::{Analysis, Classification};
use super::AgentOutput;
use crate::errors::AgentError;
use crate::prompts;
use crate::runner::{AgentOverrides, AgentRunner};

fn build_prompt(
    document: &str,
    classification: &Classification,
    user_context: Option<&str>,
) -> String {
    let classification_json = serde_json::to_string_pretty(classification).unwrap_or_default();
    let mut prompt = format!(
        "## DOCUMENT CLASSIFICATION\n{classification_json}\n\n## FULL DOCUMENT TEXT\n{document}\n\n"
    );
    if let Some(context) = user_context {
        prompt.push_str(&format!("## USER CONCERN\n{context}\n\n"));
    }
    prompt.push_str("Analyze every significant clause, identify risks and missing elements.");
    prompt
}

pub async fn run(
    runner: &AgentRunner,
    ctx: &SessionTierContext,
    document: &str,
    classification: &Classification,
    user_context: Option<&str>,
) -> Result<AgentOutput<Analysis>, AgentError> {
    let overrides = AgentOverrides::system(prompts::system_prompt(prompts::ANALYZER));
    let result = runner
        .run::<Analysis>(
            ctx,
            AgentName::Analyzer,
            &build_prompt(document, classification, user_context),
            &overrides,
        )
        .await?;
    Ok(result.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompt_embeds_classification_and_document() {
        let classification: Classification = serde_json::from_value(json!({
            "documentType": "residential_lease",
            "documentTypeLabel": "Residential lease"
        }))
        .unwrap();
        let p = build_prompt("Clause 1. Rent.", &classification, Some("penalty"));
        assert!(p.contains("\"documentType\": \"residential_lease\""));
        assert!(p.contains("## FULL DOCUMENT TEXT\nClause 1. Rent."));
        assert!(p.contains("## USER CONCERN\npenalty"));
    }
}
