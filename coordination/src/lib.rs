//! Coordination Library
//!
//! Shared building blocks for the legal-analysis agent pipeline:
//!
//! - **Model registry** (`registry`): static catalog of models, providers and
//!   per-token prices, plus live provider availability.
//! - **Tier routing** (`router`): per-agent fallback chains scoped to a
//!   capability tier, and the per-invocation [`SessionTierContext`].
//! - **Session state** (`state`): resumable, merge-only session records with
//!   pluggable persistence and historical phase timings.
//! - **Progress events** (`events`): stage and terminal events plus sinks.
//!
//! # Usage
//!
//! ```ignore
//! use coordination::{agent_chain, AgentName, SessionTierContext, Tier};
//!
//! let ctx = SessionTierContext::new(Tier::Associate);
//! let chain = agent_chain(AgentName::Analyzer, ctx.tier);
//! assert_eq!(chain[0].key, "gemini-2.5-pro");
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod events;
pub mod registry;
pub mod router;
pub mod state;

// Re-export key registry types
pub use registry::{model, models, ModelDescriptor, Provider, ProviderAvailability};

// Re-export key routing types
pub use router::{
    agent_chain, estimate_tier_cost, get_agent_chain, tier_info, AgentChainInfo, AgentDefaults,
    AgentName, SessionTierContext, Tier, TierCostEstimate, TierInfo,
};

// Re-export key session types
pub use state::{
    document_hash, InMemorySessionStore, JsonFileSessionStore, Phase, PhaseTiming,
    PipelineSession, SessionCache, SessionStatus, SessionStore, SharedSessionStore, StoreError,
    StoreResult,
};

// Re-export key event types
pub use events::{
    ChannelSink, PipelinePhase, ProgressEvent, ProgressSink, RecordingSink, Route, StageStatus,
};
