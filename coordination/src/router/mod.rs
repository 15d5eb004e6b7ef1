//! Model routing: tier-scoped fallback chains and the per-invocation context
//! that selects the tier.

pub mod context;
pub mod tiers;

pub use context::{current_tier, SessionTierContext};
pub use tiers::{
    agent_chain, estimate_tier_cost, get_agent_chain, is_agent_enabled, tier_info, AgentChainInfo,
    AgentDefaults, AgentName, ChainEntry, Tier, TierCostEstimate, TierInfo,
};
