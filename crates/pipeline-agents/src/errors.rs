//! Error taxonomy for provider calls, agent execution and pipeline runs.
//!
//! ## Layers
//!
//! | Error               | Scope                | Surfaced to caller?                     |
//! |---------------------|----------------------|-----------------------------------------|
//! | `ProviderCallError` | one candidate        | no, the runner advances to the next one |
//! | `AgentError`        | one agent call       | fatal or skipped, per stage role        |
//! | `PipelineError`     | one pipeline run     | yes, as the single terminal error event |
//!
//! Persistence failures (`coordination::StoreError`) never appear here: the
//! orchestrator logs them and carries on as if no cache existed.

use std::fmt;
use std::sync::LazyLock;

use coordination::{AgentName, PipelinePhase, Provider};
use regex::Regex;
use thiserror::Error;

use crate::state_machine::IllegalTransition;

/// Why one candidate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCategory {
    /// Network failure, timeout or 5xx.
    Transient,
    /// Explicit rate-limit signal from the provider.
    RateLimit,
    /// The model answered but the output was not the expected JSON.
    ParseFailure,
    /// Missing key or rejected request (4xx other than 429).
    Configuration,
}

impl fmt::Display for RetryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::ParseFailure => write!(f, "parse_failure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// A single candidate's failure. Always recovered by moving down the chain.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderCallError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unparseable output: {0}")]
    Unparseable(String),

    #[error("empty response")]
    EmptyResponse,

    #[error("no API key configured for {0}")]
    MissingApiKey(Provider),
}

impl ProviderCallError {
    pub fn retry_category(&self) -> RetryCategory {
        match self {
            Self::Timeout | Self::Transport(_) | Self::EmptyResponse => RetryCategory::Transient,
            Self::Http { status, .. } if *status >= 500 => RetryCategory::Transient,
            Self::Http { .. } | Self::MissingApiKey(_) => RetryCategory::Configuration,
            Self::RateLimited(_) => RetryCategory::RateLimit,
            Self::Unparseable(_) => RetryCategory::ParseFailure,
        }
    }
}

/// A failed candidate, kept for the aggregate error.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFailure {
    pub model_key: &'static str,
    pub error: ProviderCallError,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.model_key,
            self.error.retry_category(),
            self.error
        )
    }
}

fn join_failures(failures: &[CandidateFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of an agent call that produced no result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AgentError {
    #[error("{agent}: all {attempts} candidates failed ({})", join_failures(.failures))]
    ChainExhausted {
        agent: AgentName,
        attempts: usize,
        failures: Vec<CandidateFailure>,
    },

    #[error("{agent}: no provider available for any candidate")]
    NoProviderAvailable { agent: AgentName },

    #[error("{agent}: disabled for this session")]
    Disabled { agent: AgentName },
}

impl AgentError {
    pub fn agent(&self) -> AgentName {
        match self {
            Self::ChainExhausted { agent, .. }
            | Self::NoProviderAvailable { agent }
            | Self::Disabled { agent } => *agent,
        }
    }

    /// Number of network calls that were made before giving up.
    pub fn attempts(&self) -> usize {
        match self {
            Self::ChainExhausted { attempts, .. } => *attempts,
            _ => 0,
        }
    }
}

/// Fatal outcome of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{phase} failed: {source}")]
    Stage {
        phase: PipelinePhase,
        #[source]
        source: AgentError,
    },

    #[error("{phase} failed: {message}")]
    Collaborator {
        phase: PipelinePhase,
        message: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    State(#[from] IllegalTransition),
}

impl From<AgentError> for PipelineError {
    fn from(source: AgentError) -> Self {
        Self::Stage {
            phase: source.agent().into(),
            source,
        }
    }
}

impl PipelineError {
    pub fn phase(&self) -> Option<PipelinePhase> {
        match self {
            Self::Stage { phase, .. } | Self::Collaborator { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Message safe to show to the requester.
    pub fn public_message(&self) -> String {
        redact_secrets(&self.to_string())
    }
}

static SECRET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (sk-ant-[A-Za-z0-9_\-]{8,})
        | (sk-[A-Za-z0-9_\-]{16,})
        | (gsk_[A-Za-z0-9]{16,})
        | (csk-[A-Za-z0-9]{16,})
        | (AIza[0-9A-Za-z_\-]{20,})
        | ((?i:bearer)\s+[A-Za-z0-9._\-]{8,})
        | ([?&]key=[^&\s]+)
        ",
    )
    .unwrap()
});

/// Replace API keys, bearer tokens and `key=` query parameters with `[REDACTED]`.
pub fn redact_secrets(text: &str) -> String {
    SECRET_RE.replace_all(text, "[REDACTED]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_classification() {
        let server = ProviderCallError::Http {
            status: 503,
            body: "overloaded".into(),
        };
        let client = ProviderCallError::Http {
            status: 400,
            body: "bad".into(),
        };
        assert_eq!(server.retry_category(), RetryCategory::Transient);
        assert_eq!(client.retry_category(), RetryCategory::Configuration);
        assert_eq!(
            ProviderCallError::RateLimited("slow down".into()).retry_category(),
            RetryCategory::RateLimit
        );
    }

    #[test]
    fn exhausted_message_names_agent_and_attempts() {
        let err = AgentError::ChainExhausted {
            agent: AgentName::Analyzer,
            attempts: 2,
            failures: vec![
                CandidateFailure {
                    model_key: "claude-sonnet-4.5",
                    error: ProviderCallError::Timeout,
                },
                CandidateFailure {
                    model_key: "gemini-2.5-pro",
                    error: ProviderCallError::Unparseable("no JSON".into()),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("analyzer: all 2 candidates failed"));
        assert!(msg.contains("gemini-2.5-pro [parse_failure]"));
        assert_eq!(err.attempts(), 2);
        assert_eq!(
            AgentError::NoProviderAvailable {
                agent: AgentName::Leader
            }
            .attempts(),
            0
        );
    }

    #[test]
    fn agent_error_maps_to_its_stage() {
        let err: PipelineError = AgentError::Disabled {
            agent: AgentName::QuestionPrep,
        }
        .into();
        assert_eq!(err.phase(), Some(PipelinePhase::QuestionPrep));
    }

    #[test]
    fn redacts_known_key_shapes() {
        let raw = "POST https://x/v1/models/g:generateContent?key=AIzaSyA1234567890abcdefghij failed; \
                   header Bearer abcdef123456 and sk-ant-api03-secretsecret";
        let clean = redact_secrets(raw);
        assert!(!clean.contains("AIzaSy"));
        assert!(!clean.contains("abcdef123456"));
        assert!(!clean.contains("secretsecret"));
        assert!(clean.contains("generateContent"));
    }

    #[test]
    fn pipeline_error_public_message_is_redacted() {
        let err = PipelineError::Collaborator {
            phase: PipelinePhase::CorpusSearch,
            message: "auth failed for sk-abcdefghijklmnopqrstuvwx".into(),
        };
        assert_eq!(err.phase(), Some(PipelinePhase::CorpusSearch));
        assert!(err.public_message().contains("[REDACTED]"));
    }
}
