//! The seven pipeline agents.
//!
//! | Agent          | Route             | Input                                   | Output              |
//! |----------------|-------------------|-----------------------------------------|---------------------|
//! | leader         | entry             | message, document presence              | `LeaderDecision`    |
//! | question-prep  | corpus-qa         | colloquial question                     | `PreparedQuestion`  |
//! | corpus-agent   | corpus-qa         | question + retrieved articles           | `CorpusAnswer`      |
//! | classifier     | document-analysis | document text                           | `Classification`    |
//! | analyzer       | document-analysis | document + classification               | `Analysis`          |
//! | investigator   | document-analysis | classification + flagged clauses        | `Investigation`     |
//! | advisor        | document-analysis | classification + analysis + research    | `Advice`            |
//!
//! Each agent is a free function over [`AgentRunner`](crate::runner::AgentRunner):
//! it builds the prompt, runs the agent's fallback chain and post-processes
//! the parsed output. Some agents can answer without a model call (leader
//! fast paths, investigator with nothing flagged, corpus agent with no
//! articles); their output then carries no model key.

pub mod advisor;
pub mod analyzer;
pub mod classifier;
pub mod corpus_agent;
pub mod investigator;
pub mod leader;
pub mod question_prep;
pub mod types;

pub use types::{
    Advice, Analysis, Classification, CorpusAnswer, Investigation, LeaderDecision, LeaderRoute,
    PreparedQuestion, RiskLevel,
};

use crate::runner::AgentExecutionResult;

/// An agent's result and the model that produced it.
#[derive(Debug, Clone)]
pub struct AgentOutput<T> {
    pub value: T,
    /// `None` when the agent answered without a model call.
    pub model_key: Option<&'static str>,
    pub used_fallback: bool,
}

impl<T> AgentOutput<T> {
    /// Output produced without calling a model.
    pub fn local(value: T) -> Self {
        Self {
            value,
            model_key: None,
            used_fallback: false,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AgentOutput<U> {
        AgentOutput {
            value: f(self.value),
            model_key: self.model_key,
            used_fallback: self.used_fallback,
        }
    }
}

impl<T> From<AgentExecutionResult<T>> for AgentOutput<T> {
    fn from(result: AgentExecutionResult<T>) -> Self {
        Self {
            value: result.parsed,
            model_key: Some(result.used_model_key),
            used_fallback: result.used_fallback,
        }
    }
}

/// Shared test harness: a backend that answers from a script, keyed by agent
/// system prompt.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use coordination::{ModelDescriptor, ProviderAvailability};

    use crate::errors::ProviderCallError;
    use crate::providers::{CompletionBackend, CompletionRequest, CompletionResponse};
    use crate::runner::AgentRunner;
    use crate::telemetry::InMemoryCostLog;

    /// Replies with `reply` to every call and records the requests.
    pub struct FixedBackend {
        reply: Result<String, ProviderCallError>,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FixedBackend {
        pub fn ok(reply: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(ProviderCallError::Http {
                    status: 503,
                    body: "unavailable".into(),
                }),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_prompt(&self) -> String {
            self.requests
                .lock()
                .unwrap()
                .last()
                .map(|r| r.prompt.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl CompletionBackend for FixedBackend {
        async fn complete(
            &self,
            _model: &'static ModelDescriptor,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, ProviderCallError> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map(|text| CompletionResponse {
                text,
                tokens_in: 10,
                tokens_out: 10,
            })
        }
    }

    pub fn runner(backend: Arc<FixedBackend>) -> AgentRunner {
        AgentRunner::new(
            backend,
            ProviderAvailability::all(),
            Arc::new(InMemoryCostLog::new()),
        )
    }
}
