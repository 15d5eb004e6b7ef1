//! Investigator — statutes and case law for the clauses the analyzer flagged.
//!
//! Critical and high clauses must all be covered; medium ones are covered when
//! the model can. With nothing at medium or above the stage answers with no
//! findings and makes no call.

use coordination::{AgentName, SessionTierContext};

use super::types::{Analysis, Classification, Clause, Investigation, RiskLevel};
use super::AgentOutput;
use crate::errors::AgentError;
use crate::prompts;
use crate::runner::{AgentOverrides, AgentRunner};

fn build_prompt(classification: &Classification, mandatory: &[&Clause], optional: &[&Clause]) -> String {
    let mut lines = vec![format!(
        "Document: {} ({})",
        classification.document_type_label, classification.jurisdiction
    )];
    if let Some(sub) = &classification.document_sub_type {
        lines.push(format!("Sub-type: {sub}"));
    }
    if !classification.relevant_institutes.is_empty() {
        lines.push(format!(
            "Legal institutes: {}",
            classification.relevant_institutes.join(", ")
        ));
    }
    let laws: Vec<&str> = classification
        .applicable_laws
        .iter()
        .map(|l| l.reference.as_str())
        .collect();
    lines.push(format!("Applicable laws: {}", laws.join(", ")));
    lines.push(format!(
        "\nCRITICAL and HIGH clauses (cover ALL of them): {}",
        serde_json::to_string(mandatory).unwrap_or_default()
    ));
    if !optional.is_empty() {
        lines.push(format!(
            "\nMEDIUM clauses (cover if possible): {}",
            serde_json::to_string(optional).unwrap_or_default()
        ));
    }
    lines.push("\nFind statutes and decisions for EVERY critical and high clause.".into());
    lines.join("\n")
}

pub async fn run(
    runner: &AgentRunner,
    ctx: &SessionTierContext,
    classification: &Classification,
    analysis: &Analysis,
) -> Result<AgentOutput<Investigation>, AgentError> {
    let (mandatory, optional): (Vec<&Clause>, Vec<&Clause>) = analysis
        .clauses
        .iter()
        .filter(|c| c.risk_level.needs_investigation())
        .partition(|c| c.risk_level != RiskLevel::Medium);

    if mandatory.is_empty() && optional.is_empty() {
        return Ok(AgentOutput::local(Investigation::default()));
    }

    let overrides = AgentOverrides {
        web_search: true,
        ..AgentOverrides::system(prompts::system_prompt(prompts::INVESTIGATOR))
    };
    let result = runner
        .run::<Investigation>(
            ctx,
            AgentName::Investigator,
            &build_prompt(classification, &mandatory, &optional),
            &overrides,
        )
        .await?;
    Ok(result.into())
}
