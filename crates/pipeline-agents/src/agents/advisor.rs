//! Advisor — the plain-language final report.

use coordination::{AgentName, SessionTierContext};
use serde::Serialize;

use super::types::{Advice, Analysis, Classification, Investigation, ScoreBreakdown};
use super::AgentOutput;
use crate::errors::AgentError;
use crate::prompts;
use crate::runner::{AgentOverrides, AgentRunner};

/// Risks and actions kept in the final report.
pub const MAX_ITEMS: usize = 3;

fn build_prompt(
    classification: &Classification,
    analysis: &Analysis,
    investigation: &Investigation,
    user_context: Option<&str>,
) -> String {
    let mut parts = vec![
        format!("CLASSIFICATION:\n{}", pretty(classification)),
        format!("CLAUSE ANALYSIS:\n{}", pretty(analysis)),
        format!("LEGAL RESEARCH:\n{}", pretty(investigation)),
    ];
    if let Some(context) = user_context {
        parts.push(format!("USER CONCERN:\n{context}"));
    }
    parts.push(format!(
        "Write the final report. At most {MAX_ITEMS} risks and {MAX_ITEMS} actions."
    ));
    parts.join("\n\n")
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Enforce the report's shape regardless of what the model returned.
pub fn normalize(mut advice: Advice) -> Advice {
    advice.fairness_score = advice.fairness_score.clamp(1.0, 10.0);
    advice.risks.truncate(MAX_ITEMS);
    advice.actions.truncate(MAX_ITEMS);
    if advice.scores.is_none() {
        advice.scores = Some(ScoreBreakdown {
            legal_compliance: advice.fairness_score,
            contract_balance: advice.fairness_score,
            industry_practice: advice.fairness_score,
        });
    }
    advice
}

pub async fn run(
    runner: &AgentRunner,
    ctx: &SessionTierContext,
    classification: &Classification,
    analysis: &Analysis,
    investigation: &Investigation,
    user_context: Option<&str>,
) -> Result<AgentOutput<Advice>, AgentError> {
    let overrides = AgentOverrides::system(prompts::system_prompt(prompts::ADVISOR));
    let result = runner
        .run::<Advice>(
            ctx,
            AgentName::Advisor,
            &build_prompt(classification, analysis, investigation, user_context),
            &overrides,
        )
        .await?;
    Ok(AgentOutput::from(result).map(normalize))
}
