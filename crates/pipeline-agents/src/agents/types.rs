//! Typed agent outputs.
//!
//! Models answer in camelCase JSON. Fields a model commonly omits default to
//! empty; the few fields a stage cannot do without are required, so a model
//! that drops them fails parsing and the runner moves to the next candidate.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Leader ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeaderRoute {
    DocumentAnalysis,
    CorpusQa,
    /// Document plus a question about it. Runs document analysis with the
    /// question as user context.
    Hybrid,
    Clarification,
}

impl fmt::Display for LeaderRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DocumentAnalysis => "document-analysis",
            Self::CorpusQa => "corpus-qa",
            Self::Hybrid => "hybrid",
            Self::Clarification => "clarification",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderDecision {
    pub route: LeaderRoute,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub user_context: Option<String>,
    #[serde(default)]
    pub clarification_question: Option<String>,
}

// ── Question prep ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedQuestion {
    pub legal_query: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub legal_areas: Vec<String>,
}

impl PreparedQuestion {
    /// Used when question prep is skipped: search with the question as asked.
    pub fn passthrough(question: &str) -> Self {
        Self {
            legal_query: question.to_string(),
            keywords: Vec::new(),
            legal_areas: Vec::new(),
        }
    }
}

// ── Corpus agent ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitedArticle {
    #[serde(default)]
    pub id: String,
    pub reference: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub relevance: String,
}

fn default_confidence() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusAnswer {
    pub answer: String,
    #[serde(default)]
    pub cited_articles: Vec<CitedArticle>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

// ── Classifier ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicableLaw {
    pub reference: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDate {
    pub date: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub document_type: String,
    #[serde(default)]
    pub document_type_label: String,
    #[serde(default)]
    pub document_sub_type: Option<String>,
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
    pub jurisdiction: String,
    #[serde(default)]
    pub applicable_laws: Vec<ApplicableLaw>,
    #[serde(default)]
    pub relevant_institutes: Vec<String>,
    #[serde(default)]
    pub legal_focus_areas: Vec<String>,
    #[serde(default)]
    pub key_dates: Vec<KeyDate>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub confidence: f64,
}

// ── Analyzer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }

    /// Clauses at this level are worth a legal search.
    pub fn needs_investigation(self) -> bool {
        matches!(self, Self::Critical | Self::High | Self::Medium)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_text: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub potential_violation: String,
    #[serde(default)]
    pub market_standard: String,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingElement {
    pub element: String,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub clauses: Vec<Clause>,
    #[serde(default)]
    pub missing_elements: Vec<MissingElement>,
    pub overall_risk: RiskLevel,
    #[serde(default)]
    pub positive_aspects: Vec<String>,
}

// ── Investigator ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LawReference {
    pub reference: String,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default = "default_true")]
    pub is_in_force: bool,
    #[serde(default)]
    pub last_modified: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtCase {
    pub reference: String,
    #[serde(default)]
    pub court: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub relevance: String,
    #[serde(default)]
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub clause_id: String,
    #[serde(default)]
    pub laws: Vec<LawReference>,
    #[serde(default)]
    pub court_cases: Vec<CourtCase>,
    #[serde(default)]
    pub legal_opinion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investigation {
    #[serde(default)]
    pub findings: Vec<Finding>,
}

// ── Advisor ─────────────────────────────────────────────────────────────────

/// Per-dimension scores, each 1–10.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub legal_compliance: f64,
    pub contract_balance: f64,
    pub industry_practice: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub severity: String,
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub legal_basis: String,
    #[serde(default)]
    pub court_case: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deadline {
    pub date: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(default)]
    pub priority: u32,
    pub action: String,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub fairness_score: f64,
    #[serde(default)]
    pub scores: Option<ScoreBreakdown>,
    pub summary: String,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub deadlines: Vec<Deadline>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub needs_lawyer: bool,
    #[serde(default)]
    pub lawyer_specialization: String,
    #[serde(default)]
    pub lawyer_reason: String,
}
