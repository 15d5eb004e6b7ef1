//! Shared harness for pipeline integration tests.
//!
//! [`ScriptedBackend`] answers each agent from a script keyed by the agent's
//! system prompt, so a whole pipeline run can be driven without a network.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use coordination::{
    AgentName, InMemorySessionStore, ModelDescriptor, ProviderAvailability, SessionCache, Tier,
};
use pipeline_agents::errors::ProviderCallError;
use pipeline_agents::prompts;
use pipeline_agents::providers::{CompletionBackend, CompletionRequest, CompletionResponse};
use pipeline_agents::telemetry::{InMemoryCostLog, SharedCostSink};
use pipeline_agents::{AgentRunner, Orchestrator};
use serde_json::{json, Value};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail,
    /// Never answers; signals `ScriptedBackend::hung` first.
    Hang,
}

/// One call seen by the backend.
#[derive(Debug, Clone)]
pub struct Call {
    pub agent: AgentName,
    pub model: &'static str,
    /// Ambient tier while the call ran.
    pub tier: Tier,
    pub prompt: String,
}

pub struct ScriptedBackend {
    scripts: HashMap<AgentName, Script>,
    failing_models: HashSet<&'static str>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    pub hung: Notify,
}

fn agent_for(system: Option<&str>) -> Option<AgentName> {
    let system = system?;
    [
        (AgentName::Leader, prompts::LEADER),
        (AgentName::QuestionPrep, prompts::QUESTION_PREP),
        (AgentName::CorpusAgent, prompts::CORPUS_AGENT),
        (AgentName::Classifier, prompts::CLASSIFIER),
        (AgentName::Analyzer, prompts::ANALYZER),
        (AgentName::Investigator, prompts::INVESTIGATOR),
        (AgentName::Advisor, prompts::ADVISOR),
    ]
    .into_iter()
    .find(|(_, role)| prompts::system_prompt(role) == system)
    .map(|(agent, _)| agent)
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            failing_models: HashSet::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
            hung: Notify::new(),
        }
    }

    pub fn reply(mut self, agent: AgentName, value: Value) -> Self {
        self.scripts.insert(agent, Script::Reply(value.to_string()));
        self
    }

    pub fn raw_reply(mut self, agent: AgentName, text: &str) -> Self {
        self.scripts.insert(agent, Script::Reply(text.to_string()));
        self
    }

    pub fn fail(mut self, agent: AgentName) -> Self {
        self.scripts.insert(agent, Script::Fail);
        self
    }

    pub fn hang(mut self, agent: AgentName) -> Self {
        self.scripts.insert(agent, Script::Hang);
        self
    }

    /// Every call to this catalog model fails, whatever the agent.
    pub fn fail_model(mut self, key: &'static str) -> Self {
        self.failing_models.insert(key);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, agent: AgentName) -> usize {
        self.calls().iter().filter(|c| c.agent == agent).count()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(
        &self,
        model: &'static ModelDescriptor,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderCallError> {
        let Some(agent) = agent_for(request.system.as_deref()) else {
            return Err(ProviderCallError::Transport("unknown system prompt".into()));
        };
        self.calls.lock().unwrap().push(Call {
            agent,
            model: model.key,
            tier: coordination::router::current_tier(),
            prompt: request.prompt.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_models.contains(model.key) {
            return Err(ProviderCallError::RateLimited("scripted".into()));
        }
        match self.scripts.get(&agent) {
            Some(Script::Reply(text)) => Ok(CompletionResponse {
                text: text.clone(),
                tokens_in: 1200,
                tokens_out: 300,
            }),
            Some(Script::Hang) => {
                self.hung.notify_one();
                std::future::pending().await
            }
            Some(Script::Fail) | None => Err(ProviderCallError::Http {
                status: 503,
                body: format!("{agent} unavailable"),
            }),
        }
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

pub const LEASE: &str = "\
RESIDENTIAL LEASE AGREEMENT
Art. 1 The landlord lets the flat in Via Roma 1 to the tenant.
Art. 7 The tenant pays a penalty of twelve months of rent on early termination.
Art. 9 The security deposit is six months of rent and is not refundable.";

pub fn classification() -> Value {
    json!({
        "documentType": "residential_lease",
        "documentTypeLabel": "Residential lease",
        "jurisdiction": "IT",
        "parties": [{"role": "landlord", "name": "ACME", "type": "company"}],
        "applicableLaws": [{"reference": "L. 431/1998", "name": "Lease law"}],
        "summary": "Four-year residential lease.",
        "confidence": 0.9
    })
}

pub fn analysis() -> Value {
    json!({
        "clauses": [
            {"id": "art7", "title": "Early termination penalty", "riskLevel": "critical"},
            {"id": "art9", "title": "Deposit", "riskLevel": "high"},
            {"id": "art1", "title": "Object", "riskLevel": "low"}
        ],
        "overallRisk": "high",
        "positiveAspects": ["Clear object"]
    })
}

pub fn investigation() -> Value {
    json!({
        "findings": [
            {"clauseId": "art9", "legalOpinion": "Deposit above three months is void."}
        ]
    })
}

pub fn advice() -> Value {
    json!({
        "fairnessScore": 3,
        "summary": "Two clauses are likely unenforceable.",
        "risks": [{"severity": "high", "title": "Deposit cap exceeded"}],
        "actions": [{"priority": 1, "action": "Ask to reduce the deposit"}],
        "needsLawyer": true
    })
}

/// A backend that completes document analysis.
pub fn document_analysis_script() -> ScriptedBackend {
    ScriptedBackend::new()
        .reply(AgentName::Classifier, classification())
        .reply(AgentName::Analyzer, analysis())
        .reply(AgentName::Investigator, investigation())
        .reply(AgentName::Advisor, advice())
}

pub fn runner(backend: Arc<ScriptedBackend>) -> (AgentRunner, Arc<InMemoryCostLog>) {
    let costs = Arc::new(InMemoryCostLog::new());
    let sink: SharedCostSink = costs.clone();
    let runner = AgentRunner::new(backend, ProviderAvailability::all(), sink);
    (runner, costs)
}

/// Orchestrator over an in-memory session store, returned for inspection.
pub fn orchestrator(backend: Arc<ScriptedBackend>) -> (Orchestrator, SessionCache) {
    let cache = SessionCache::new(InMemorySessionStore::new().shared());
    let (runner, _) = runner(backend);
    (Orchestrator::new(runner).with_cache(cache.clone()), cache)
}
