//! Session Tier Context — per-invocation tier and agent switches.
//!
//! A [`SessionTierContext`] is built once per pipeline invocation and then
//! only read. It travels two ways:
//!
//! - explicitly, as a parameter to the orchestrator and agent runner;
//! - ambiently, through a tokio task-local installed by
//!   [`SessionTierContext::scope`], for code that does not take it as a
//!   parameter ([`current_tier`], [`is_agent_enabled`]).
//!
//! The task-local is bound to the future passed to `scope`, so it survives
//! every `.await` inside it, is invisible to other tasks, and is gone once the
//! future completes. `tokio::spawn`ed tasks do not inherit it.
//!
//! Without a context, reads return the defaults: tier `Partner`, every agent
//! enabled.

use std::collections::BTreeSet;
use std::future::Future;

use serde::{Deserialize, Serialize};

use super::tiers::{AgentName, Tier};

tokio::task_local! {
    static SESSION_TIER: SessionTierContext;
}

/// Tier and kill switches for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTierContext {
    pub tier: Tier,
    #[serde(default)]
    pub disabled_agents: BTreeSet<AgentName>,
    /// Identifier of the requesting session, carried into cost rows.
    pub sid: String,
}

impl Default for SessionTierContext {
    fn default() -> Self {
        Self::new(Tier::default())
    }
}

impl SessionTierContext {
    /// New context with a random sid and every agent enabled.
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            disabled_agents: BTreeSet::new(),
            sid: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = sid.into();
        self
    }

    pub fn with_disabled(mut self, agent: AgentName) -> Self {
        self.disabled_agents.insert(agent);
        self
    }

    pub fn with_disabled_agents(mut self, agents: impl IntoIterator<Item = AgentName>) -> Self {
        self.disabled_agents.extend(agents);
        self
    }

    pub fn is_agent_enabled(&self, agent: AgentName) -> bool {
        !self.disabled_agents.contains(&agent)
    }

    /// Run `fut` with this context installed as the ambient one.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        SESSION_TIER.scope(self, fut).await
    }
}

/// The ambient context, if one is installed on the current task.
pub fn current() -> Option<SessionTierContext> {
    SESSION_TIER.try_with(Clone::clone).ok()
}

/// Ambient tier, or `Partner` outside any scope.
pub fn current_tier() -> Tier {
    SESSION_TIER.try_with(|ctx| ctx.tier).unwrap_or_default()
}

/// Ambient kill switch, or `true` outside any scope.
pub fn is_agent_enabled(agent: AgentName) -> bool {
    SESSION_TIER
        .try_with(|ctx| ctx.is_agent_enabled(agent))
        .unwrap_or(true)
}
