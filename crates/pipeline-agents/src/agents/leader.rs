//! Leader — decides which route handles a request.
//!
//! Obvious cases are routed without a model call:
//! - document only, no message → document-analysis
//! - short message (< 500 chars), no document → corpus-qa
//! - long message (≥ 2000 chars), no document → document-analysis (a pasted document)
//!
//! Everything else goes to the leader model. When the leader agent is
//! disabled for the session the same inputs fall back to [`heuristic_route`].

use coordination::{AgentName, SessionTierContext};
use tracing::info;

use super::types::{LeaderDecision, LeaderRoute};
use super::AgentOutput;
use crate::errors::AgentError;
use crate::prompts;
use crate::runner::{AgentOverrides, AgentRunner};

/// Messages shorter than this with no document are plain questions.
pub const SHORT_QUESTION_CHARS: usize = 500;
/// Messages at least this long with no document are pasted documents.
pub const PASTED_DOCUMENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy)]
pub struct LeaderInput<'a> {
    pub message: Option<&'a str>,
    pub has_document: bool,
    pub document_name: Option<&'a str>,
}

impl LeaderInput<'_> {
    fn trimmed_message(&self) -> &str {
        self.message.map(str::trim).unwrap_or_default()
    }
}

fn decision(route: LeaderRoute, reasoning: &str, question: Option<&str>) -> LeaderDecision {
    LeaderDecision {
        route,
        reasoning: reasoning.to_string(),
        question: question.map(String::from),
        user_context: None,
        clarification_question: None,
    }
}

/// Route without a model call, when the input makes the answer obvious.
pub fn fast_route(input: &LeaderInput<'_>) -> Option<LeaderDecision> {
    let message = input.trimmed_message();
    let len = message.chars().count();

    if message.is_empty() && input.has_document {
        return Some(decision(
            LeaderRoute::DocumentAnalysis,
            "document attached without a question",
            None,
        ));
    }
    if input.has_document || message.is_empty() {
        return None;
    }
    if len < SHORT_QUESTION_CHARS {
        return Some(decision(
            LeaderRoute::CorpusQa,
            "short question without a document",
            Some(message),
        ));
    }
    if len >= PASTED_DOCUMENT_CHARS {
        return Some(decision(
            LeaderRoute::DocumentAnalysis,
            "long text without a document, treated as a pasted document",
            None,
        ));
    }
    None
}

/// Deterministic routing for every input, used when the leader is disabled.
pub fn heuristic_route(input: &LeaderInput<'_>) -> LeaderDecision {
    if let Some(d) = fast_route(input) {
        return d;
    }
    let message = input.trimmed_message();
    match (input.has_document, message.is_empty()) {
        (true, false) => LeaderDecision {
            user_context: Some(message.to_string()),
            ..decision(
                LeaderRoute::Hybrid,
                "document with a question",
                Some(message),
            )
        },
        (false, false) => decision(LeaderRoute::CorpusQa, "question without a document", Some(message)),
        _ => LeaderDecision {
            clarification_question: Some(
                "Do you want a document reviewed, or do you have a legal question?".into(),
            ),
            ..decision(LeaderRoute::Clarification, "empty request", None)
        },
    }
}

fn build_prompt(input: &LeaderInput<'_>) -> String {
    let attached = if input.has_document {
        format!("Yes ({})", input.document_name.unwrap_or("file"))
    } else {
        "No".to_string()
    };
    let message = match input.trimmed_message() {
        "" => "(no message)",
        m => m,
    };
    format!("FILE ATTACHED: {attached}\n\nUSER MESSAGE:\n{message}")
}

/// Decide the route for `input`.
pub async fn run(
    runner: &AgentRunner,
    ctx: &SessionTierContext,
    input: &LeaderInput<'_>,
) -> Result<AgentOutput<LeaderDecision>, AgentError> {
    if let Some(d) = fast_route(input) {
        info!(route = %d.route, reason = %d.reasoning, "Leader fast path");
        return Ok(AgentOutput::local(d));
    }
    if !ctx.is_agent_enabled(AgentName::Leader) {
        let d = heuristic_route(input);
        info!(route = %d.route, "Leader disabled, heuristic routing");
        return Ok(AgentOutput::local(d));
    }

    let overrides = AgentOverrides::system(prompts::system_prompt(prompts::LEADER));
    let result = runner
        .run::<LeaderDecision>(ctx, AgentName::Leader, &build_prompt(input), &overrides)
        .await?;
    let mut output = AgentOutput::from(result);

    // Keep the user's own words when the model drops the question.
    if output.value.route != LeaderRoute::Clarification && output.value.question.is_none() {
        let message = input.trimmed_message();
        if !message.is_empty() {
            output.value.question = Some(message.to_string());
        }
    }
    if output.value.route == LeaderRoute::Clarification
        && output.value.clarification_question.is_none()
    {
        output.value.clarification_question =
            Some("Could you tell me more about what you need?".into());
    }
    info!(route = %output.value.route, model = ?output.model_key, "Leader decided");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{runner, FixedBackend};

    fn input(message: Option<&str>, has_document: bool) -> LeaderInput<'_> {
        LeaderInput {
            message,
            has_document,
            document_name: None,
        }
    }

    #[test]
    fn fast_paths() {
        assert_eq!(
            fast_route(&input(None, true)).unwrap().route,
            LeaderRoute::DocumentAnalysis
        );
        assert_eq!(
            fast_route(&input(Some("  "), true)).unwrap().route,
            LeaderRoute::DocumentAnalysis
        );

        let q = fast_route(&input(Some("Can my landlord keep the deposit?"), false)).unwrap();
        assert_eq!(q.route, LeaderRoute::CorpusQa);
        assert_eq!(q.question.as_deref(), Some("Can my landlord keep the deposit?"));

        let pasted = "x".repeat(PASTED_DOCUMENT_CHARS);
        assert_eq!(
            fast_route(&input(Some(&pasted), false)).unwrap().route,
            LeaderRoute::DocumentAnalysis
        );
    }

    #[test]
    fn ambiguous_inputs_have_no_fast_path() {
        assert!(fast_route(&input(Some("is clause 5 legal?"), true)).is_none());
        let medium = "y".repeat(1000);
        assert!(fast_route(&input(Some(&medium), false)).is_none());
        assert!(fast_route(&input(None, false)).is_none());
    }

    #[test]
    fn heuristic_covers_ambiguous_inputs() {
        let hybrid = heuristic_route(&input(Some("is clause 5 legal?"), true));
        assert_eq!(hybrid.route, LeaderRoute::Hybrid);
        assert_eq!(hybrid.user_context.as_deref(), Some("is clause 5 legal?"));

        let medium = "y".repeat(1000);
        assert_eq!(heuristic_route(&input(Some(&medium), false)).route, LeaderRoute::CorpusQa);

        let empty = heuristic_route(&input(None, false));
        assert_eq!(empty.route, LeaderRoute::Clarification);
        assert!(empty.clarification_question.is_some());
    }

    #[tokio::test]
    async fn fast_path_makes_no_call() {
        let backend = FixedBackend::ok("{}");
        let out = run(&runner(backend.clone()), &SessionTierContext::default(), &input(None, true))
            .await
            .unwrap();
        assert_eq!(out.value.route, LeaderRoute::DocumentAnalysis);
        assert!(out.model_key.is_none());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn ambiguous_input_asks_the_model() {
        let backend = FixedBackend::ok(r#"{"route": "hybrid", "reasoning": "doc and question"}"#);
        let out = run(
            &runner(backend.clone()),
            &SessionTierContext::default(),
            &LeaderInput {
                message: Some("Is the penalty in clause 5 too high?"),
                has_document: true,
                document_name: Some("lease.pdf"),
            },
        )
        .await
        .unwrap();
        assert_eq!(out.value.route, LeaderRoute::Hybrid);
        assert_eq!(
            out.value.question.as_deref(),
            Some("Is the penalty in clause 5 too high?")
        );
        assert_eq!(out.model_key, Some("claude-haiku-4.5"));
        assert!(backend.last_prompt().contains("FILE ATTACHED: Yes (lease.pdf)"));
    }

    #[tokio::test]
    async fn disabled_leader_routes_heuristically() {
        let backend = FixedBackend::ok("{}");
        let ctx = SessionTierContext::default().with_disabled(AgentName::Leader);
        let out = run(&runner(backend.clone()), &ctx, &input(Some("is clause 5 legal?"), true))
            .await
            .unwrap();
        assert_eq!(out.value.route, LeaderRoute::Hybrid);
        assert_eq!(backend.calls(), 0);
    }
}
