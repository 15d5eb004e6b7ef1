//! Question prep — rewrites a colloquial question as a retrieval query.

use coordination::{AgentName, SessionTierContext};

use super::types::PreparedQuestion;
use super::AgentOutput;
use crate::errors::AgentError;
use crate::prompts;
use crate::runner::{AgentOverrides, AgentRunner};

pub async fn run(
    runner: &AgentRunner,
    ctx: &SessionTierContext,
    question: &str,
) -> Result<AgentOutput<PreparedQuestion>, AgentError> {
    let overrides = AgentOverrides::system(prompts::system_prompt(prompts::QUESTION_PREP));
    let prompt = format!("User: \"{question}\"");
    let result = runner
        .run::<PreparedQuestion>(ctx, AgentName::QuestionPrep, &prompt, &overrides)
        .await?;

    Ok(AgentOutput::from(result).map(|mut prepared| {
        if prepared.legal_query.trim().is_empty() {
            prepared.legal_query = question.to_string();
        }
        prepared
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{runner, FixedBackend};

    #[tokio::test]
    async fn rewrites_question() {
        let backend = FixedBackend::ok(
            r#"{"legalQuery": "retention of confirmatory deposit on tenant withdrawal", "keywords": ["deposit"], "legalAreas": ["lease"]}"#,
        );
        let out = run(
            &runner(backend.clone()),
            &SessionTierContext::default(),
            "can they keep my deposit if I leave?",
        )
        .await
        .unwrap();
        assert!(out.value.legal_query.starts_with("retention"));
        assert_eq!(out.value.keywords, vec!["deposit"]);
        assert_eq!(
            backend.last_prompt(),
            "User: \"can they keep my deposit if I leave?\""
        );
    }

    #[tokio::test]
    async fn blank_query_falls_back_to_question() {
        let backend = FixedBackend::ok(r#"{"legalQuery": "  "}"#);
        let out = run(&runner(backend), &SessionTierContext::default(), "what is a lease?")
            .await
            .unwrap();
        assert_eq!(out.value.legal_query, "what is a lease?");
    }
}
