//! Session record types for the resumable document-analysis route.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cached phase of the document-analysis route, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Classifier,
    Analyzer,
    Investigator,
    Advisor,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Self::Classifier,
        Self::Analyzer,
        Self::Investigator,
        Self::Advisor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classifier => "classifier",
            Self::Analyzer => "analyzer",
            Self::Investigator => "investigator",
            Self::Advisor => "advisor",
        }
    }

    /// Name of the session field holding this phase's result.
    pub fn result_field(self) -> &'static str {
        match self {
            Self::Classifier => "classification",
            Self::Analyzer => "analysis",
            Self::Investigator => "investigation",
            Self::Advisor => "advice",
        }
    }

    /// Seconds assumed for a phase when no history exists.
    pub fn default_estimate_secs(self) -> f64 {
        match self {
            Self::Classifier => 12.0,
            Self::Analyzer => 25.0,
            Self::Investigator => 22.0,
            Self::Advisor => 18.0,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    /// Accepts both the phase name (`classifier`) and its result field
    /// (`classification`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s || p.result_field() == s)
            .ok_or_else(|| format!("unknown phase: {s}"))
    }
}

/// Wall-clock span of one completed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PhaseTiming {
    pub fn between(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            started_at,
            completed_at,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    InProgress,
    Complete,
    Error,
}

/// Durable record of one document-analysis run.
///
/// Phase results fill monotonically: once a phase is non-null it is never
/// reset to null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSession {
    pub session_id: String,
    pub document_hash: String,
    #[serde(default)]
    pub classification: Option<Value>,
    #[serde(default)]
    pub analysis: Option<Value>,
    #[serde(default)]
    pub investigation: Option<Value>,
    #[serde(default)]
    pub advice: Option<Value>,
    #[serde(default)]
    pub phase_timing: BTreeMap<Phase, PhaseTiming>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineSession {
    pub fn new(session_id: impl Into<String>, document_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            document_hash: document_hash.into(),
            classification: None,
            analysis: None,
            investigation: None,
            advice: None,
            phase_timing: BTreeMap::new(),
            status: SessionStatus::InProgress,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn phase(&self, phase: Phase) -> Option<&Value> {
        match phase {
            Phase::Classifier => self.classification.as_ref(),
            Phase::Analyzer => self.analysis.as_ref(),
            Phase::Investigator => self.investigation.as_ref(),
            Phase::Advisor => self.advice.as_ref(),
        }
    }

    fn phase_slot(&mut self, phase: Phase) -> &mut Option<Value> {
        match phase {
            Phase::Classifier => &mut self.classification,
            Phase::Analyzer => &mut self.analysis,
            Phase::Investigator => &mut self.investigation,
            Phase::Advisor => &mut self.advice,
        }
    }

    pub fn completed_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL.into_iter().filter(|p| self.phase(*p).is_some())
    }

    /// First phase without a result, in route order.
    pub fn first_incomplete(&self) -> Option<Phase> {
        Phase::ALL.into_iter().find(|p| self.phase(*p).is_none())
    }

    /// Apply a partial update. Absent or null values never clear a phase.
    pub fn apply(&mut self, patch: SessionPatch) {
        for (phase, value) in patch.results {
            if !value.is_null() {
                *self.phase_slot(phase) = Some(value);
            }
        }
        self.phase_timing.extend(patch.timings);
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.last_error.is_some() {
            self.last_error = patch.last_error;
        }
        if self.advice.is_some() && self.status == SessionStatus::InProgress {
            self.status = SessionStatus::Complete;
        }
        self.updated_at = Utc::now();
    }
}

/// Merge-only update for a session row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub results: BTreeMap<Phase, Value>,
    pub timings: BTreeMap<Phase, PhaseTiming>,
    pub status: Option<SessionStatus>,
    pub last_error: Option<String>,
}

impl SessionPatch {
    pub fn result(phase: Phase, value: Value) -> Self {
        Self {
            results: BTreeMap::from([(phase, value)]),
            ..Self::default()
        }
    }

    pub fn timing(phase: Phase, timing: PhaseTiming) -> Self {
        Self {
            timings: BTreeMap::from([(phase, timing)]),
            ..Self::default()
        }
    }

    pub fn status(status: SessionStatus, last_error: Option<String>) -> Self {
        Self {
            status: Some(status),
            last_error,
            ..Self::default()
        }
    }
}
