//! Agent Runner — one agent call executed against its fallback chain.
//!
//! ```text
//! agent disabled in context → Disabled (no network call)
//! tier chain ──filter(provider enabled)──▶ effective chain
//!     │ empty → NoProviderAvailable (no network call)
//!     ▼
//! for candidate in effective chain (one at a time):
//!     complete() ──▶ extract JSON ──▶ deserialize T
//!        any failure → record, advance
//!     success → detached cost row, return
//! all failed → ChainExhausted
//! ```
//!
//! Moving to the next candidate is the whole retry strategy: there is no
//! same-candidate retry or backoff, and candidates never run concurrently.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use coordination::{agent_chain, AgentName, ModelDescriptor, ProviderAvailability, SessionTierContext, Tier};
use serde::de::DeserializeOwned;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::errors::{AgentError, CandidateFailure, ProviderCallError};
use crate::json::parse_agent_json;
use crate::providers::{CompletionBackend, CompletionRequest};
use crate::telemetry::{log_cost_detached, CostLogEntry, SharedCostSink};

/// Per-call adjustments to an agent's defaults.
#[derive(Debug, Clone, Default)]
pub struct AgentOverrides {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
    pub web_search: bool,
}

impl AgentOverrides {
    pub fn system(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(prompt.into()),
            ..Self::default()
        }
    }
}

/// What one successful agent call produced.
#[derive(Debug, Clone)]
pub struct AgentExecutionResult<T> {
    pub parsed: T,
    pub used_model_key: &'static str,
    /// The winner was not the first effective candidate.
    pub used_fallback: bool,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub duration_ms: u64,
    /// Candidates tried, including the winner.
    pub attempts: usize,
}

/// Executes agent calls with failover and cost logging.
#[derive(Clone)]
pub struct AgentRunner {
    backend: Arc<dyn CompletionBackend>,
    availability: ProviderAvailability,
    cost_sink: SharedCostSink,
    cost_tasks: TaskTracker,
}

impl AgentRunner {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        availability: ProviderAvailability,
        cost_sink: SharedCostSink,
    ) -> Self {
        Self {
            backend,
            availability,
            cost_sink,
            cost_tasks: TaskTracker::new(),
        }
    }

    pub fn availability(&self) -> &ProviderAvailability {
        &self.availability
    }

    /// The tier chain minus candidates whose provider is disabled.
    pub fn effective_chain(&self, agent: AgentName, tier: Tier) -> Vec<&'static ModelDescriptor> {
        agent_chain(agent, tier)
            .into_iter()
            .filter(|m| self.availability.is_model_available(m))
            .collect()
    }

    /// Wait for pending cost writes. Used before process exit and in tests.
    pub async fn flush_cost_log(&self) {
        self.cost_tasks.close();
        self.cost_tasks.wait().await;
        self.cost_tasks.reopen();
    }

    /// Run `agent` on `prompt` and parse its JSON answer into `T`.
    pub async fn run<T: DeserializeOwned>(
        &self,
        ctx: &SessionTierContext,
        agent: AgentName,
        prompt: &str,
        overrides: &AgentOverrides,
    ) -> Result<AgentExecutionResult<T>, AgentError> {
        if !ctx.is_agent_enabled(agent) {
            info!(agent = %agent, "Agent disabled for this session");
            return Err(AgentError::Disabled { agent });
        }

        let chain = self.effective_chain(agent, ctx.tier);
        if chain.is_empty() {
            warn!(agent = %agent, tier = %ctx.tier, "No enabled provider in chain");
            return Err(AgentError::NoProviderAvailable { agent });
        }

        let defaults = agent.defaults();
        let request = CompletionRequest {
            system: overrides.system_prompt.clone(),
            prompt: prompt.to_string(),
            max_tokens: overrides.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: overrides.temperature.unwrap_or(defaults.temperature),
            json_output: true,
            web_search: overrides.web_search,
        };

        let mut failures = Vec::new();
        for (index, model) in chain.iter().copied().enumerate() {
            let started = Instant::now();
            let outcome = match self.backend.complete(model, &request).await {
                Ok(response) => parse_agent_json::<T>(&response.text)
                    .map(|parsed| (parsed, response))
                    .map_err(|e| ProviderCallError::Unparseable(e.to_string())),
                Err(e) => Err(e),
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok((parsed, response)) => {
                    let used_fallback = index > 0;
                    info!(
                        agent = %agent,
                        model = model.key,
                        attempt = index + 1,
                        used_fallback,
                        duration_ms,
                        "Agent call succeeded"
                    );
                    log_cost_detached(
                        &self.cost_tasks,
                        self.cost_sink.clone(),
                        CostLogEntry {
                            timestamp: Utc::now(),
                            agent,
                            model_key: model.key.to_string(),
                            provider: model.provider,
                            tokens_in: response.tokens_in,
                            tokens_out: response.tokens_out,
                            cost_usd: model.cost_usd(response.tokens_in, response.tokens_out),
                            duration_ms,
                            used_fallback,
                            sid: Some(ctx.sid.clone()),
                        },
                    );
                    return Ok(AgentExecutionResult {
                        parsed,
                        used_model_key: model.key,
                        used_fallback,
                        tokens_in: response.tokens_in,
                        tokens_out: response.tokens_out,
                        duration_ms,
                        attempts: index + 1,
                    });
                }
                Err(error) => {
                    warn!(
                        agent = %agent,
                        model = model.key,
                        category = %error.retry_category(),
                        error = %error,
                        "Candidate failed, advancing"
                    );
                    failures.push(CandidateFailure {
                        model_key: model.key,
                        error,
                    });
                }
            }
        }

        Err(AgentError::ChainExhausted {
            agent,
            attempts: failures.len(),
            failures,
        })
    }
}
