//! Progress event types emitted by the pipeline orchestrator.
//!
//! A run emits, per stage, `running` followed by exactly one of `done`,
//! `error` or `skipped`, and then exactly one terminal event: `complete`,
//! `clarification` or `error`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::router::AgentName;
use crate::state::Phase;

/// Every stage that reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelinePhase {
    Leader,
    QuestionPrep,
    CorpusSearch,
    CorpusAgent,
    Classifier,
    Analyzer,
    Investigator,
    Advisor,
}

impl PipelinePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::QuestionPrep => "question-prep",
            Self::CorpusSearch => "corpus-search",
            Self::CorpusAgent => "corpus-agent",
            Self::Classifier => "classifier",
            Self::Analyzer => "analyzer",
            Self::Investigator => "investigator",
            Self::Advisor => "advisor",
        }
    }

    /// The cached session phase, for document-analysis stages.
    pub fn cached_phase(self) -> Option<Phase> {
        match self {
            Self::Classifier => Some(Phase::Classifier),
            Self::Analyzer => Some(Phase::Analyzer),
            Self::Investigator => Some(Phase::Investigator),
            Self::Advisor => Some(Phase::Advisor),
            _ => None,
        }
    }
}

impl From<Phase> for PipelinePhase {
    fn from(p: Phase) -> Self {
        match p {
            Phase::Classifier => Self::Classifier,
            Phase::Analyzer => Self::Analyzer,
            Phase::Investigator => Self::Investigator,
            Phase::Advisor => Self::Advisor,
        }
    }
}

impl From<AgentName> for PipelinePhase {
    fn from(agent: AgentName) -> Self {
        match agent {
            AgentName::Leader => Self::Leader,
            AgentName::QuestionPrep => Self::QuestionPrep,
            AgentName::CorpusAgent => Self::CorpusAgent,
            AgentName::Classifier => Self::Classifier,
            AgentName::Analyzer => Self::Analyzer,
            AgentName::Investigator => Self::Investigator,
            AgentName::Advisor => Self::Advisor,
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Running,
    Done,
    Error,
    Skipped,
}

impl StageStatus {
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// The two fixed stage sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// classifier → analyzer → investigator → advisor
    DocumentAnalysis,
    /// question-prep → corpus-search → corpus-agent
    CorpusQa,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentAnalysis => "document-analysis",
            Self::CorpusQa => "corpus-qa",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Historical average phase durations, sent before the first stage.
    Estimate { seconds: BTreeMap<Phase, f64> },

    /// The session id a document-analysis run persists under.
    Session { session_id: String },

    /// A stage transition.
    Stage {
        phase: PipelinePhase,
        status: StageStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timing_ms: Option<u64>,
        timestamp: DateTime<Utc>,
    },

    /// Terminal: the route finished.
    Complete { route: Route, result: Value },

    /// Terminal: the request needs a clarifying answer from the user.
    Clarification { question: String },

    /// Terminal: a load-bearing stage failed.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phase: Option<PipelinePhase>,
        message: String,
    },
}

impl ProgressEvent {
    pub fn stage(phase: PipelinePhase, status: StageStatus) -> Self {
        Self::Stage {
            phase,
            status,
            summary: None,
            output: None,
            timing_ms: None,
            timestamp: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete { .. } | Self::Clarification { .. } | Self::Error { .. }
        )
    }

    /// `(phase, status)` for stage events.
    pub fn stage_status(&self) -> Option<(PipelinePhase, StageStatus)> {
        match self {
            Self::Stage { phase, status, .. } => Some((*phase, *status)),
            _ => None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Estimate { .. } => "estimate",
            Self::Session { .. } => "session",
            Self::Stage { .. } => "stage",
            Self::Complete { .. } => "complete",
            Self::Clarification { .. } => "clarification",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_event_wire_shape() {
        let ev = ProgressEvent::Stage {
            phase: PipelinePhase::CorpusSearch,
            status: StageStatus::Skipped,
            summary: Some("retriever offline".into()),
            output: None,
            timing_ms: Some(12),
            timestamp: Utc::now(),
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "stage");
        assert_eq!(v["phase"], "corpus-search");
        assert_eq!(v["status"], "skipped");
        assert!(v.get("output").is_none());
    }

    #[test]
    fn terminal_classification() {
        assert!(ProgressEvent::Clarification {
            question: "Which contract?".into()
        }
        .is_terminal());
        assert!(ProgressEvent::Complete {
            route: Route::CorpusQa,
            result: json!({})
        }
        .is_terminal());
        assert!(!ProgressEvent::stage(PipelinePhase::Leader, StageStatus::Running).is_terminal());
    }

    #[test]
    fn phase_mapping_round_trips() {
        for p in Phase::ALL {
            assert_eq!(PipelinePhase::from(p).cached_phase(), Some(p));
        }
        assert_eq!(PipelinePhase::Leader.cached_phase(), None);
    }
}
