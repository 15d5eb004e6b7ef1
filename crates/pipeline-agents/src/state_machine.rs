//! Pipeline State Machine — explicit states and legal transition guards.
//!
//! Every pipeline run moves through a small, fixed graph:
//!
//! ```text
//! Idle → LeaderRouting → DocumentAnalysis ─┐
//!                      → CorpusQa ─────────┼→ Done
//!                      → Clarification ────┘
//! any non-terminal ──────────────────────────→ Error
//! ```
//!
//! The orchestrator calls `advance()` at each route boundary. Each call
//! validates the edge and appends it to the transition log, so a finished run
//! can be summarised or replayed from its log.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of pipeline states.
///
/// Every run starts at `Idle` and terminates at either `Done` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    Idle,
    /// Deciding which route handles the request.
    LeaderRouting,
    /// Route A: classifier → analyzer → investigator → advisor.
    DocumentAnalysis,
    /// Route B: question-prep → corpus-search → corpus-agent.
    CorpusQa,
    /// The request needs a clarifying answer before any route can run.
    Clarification,
    /// Terminal: a result (or clarification question) was delivered.
    Done,
    /// Terminal: a load-bearing stage failed or the run was cancelled.
    Error,
}

impl PipelineState {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LeaderRouting => "leader-routing",
            Self::DocumentAnalysis => "document-analysis",
            Self::CorpusQa => "corpus-qa",
            Self::Clarification => "clarification",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_legal_transition(from: PipelineState, to: PipelineState) -> bool {
    use PipelineState::*;

    // Any non-terminal state can transition to Error.
    if to == Error && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Idle, LeaderRouting)
            | (LeaderRouting, DocumentAnalysis)
            | (LeaderRouting, CorpusQa)
            | (LeaderRouting, Clarification)
            | (DocumentAnalysis, Done)
            | (CorpusQa, Done)
            | (Clarification, Done)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PipelineState,
    pub to: PipelineState,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal state transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// The pipeline state machine for one run.
pub struct StateMachine {
    current: PipelineState,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: PipelineState::Idle,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> PipelineState {
        self.current
    }

    /// Attempt to advance to the next state.
    pub fn advance(
        &mut self,
        to: PipelineState,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(from = %self.current, to = %to, "State transition");

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    /// Transition to `Error` from any non-terminal state.
    pub fn fail(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(PipelineState::Error, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// One-line history, e.g. `idle → done (12ms, 3 transitions) [...]`.
    pub fn summary(&self) -> String {
        let states: Vec<&str> = self.transitions.iter().map(|t| t.to.as_str()).collect();
        let mut out = format!(
            "{} → {} ({}ms, {} transitions)",
            PipelineState::Idle,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        );
        if !states.is_empty() {
            out.push_str(&format!(" [{}]", states.join(" → ")));
        }
        out
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
