//! Tier Resolver — per-agent fallback chains scoped to a capability tier.
//!
//! Every agent has one declared chain (ordered model keys, best first). A tier
//! selects a suffix of that chain through a start-index table, so lower tiers
//! skip the expensive head and never add models the higher tier lacks:
//!
//! ```text
//! partner    [m0, m1, m2, m3, m4]
//! associate      [m1, m2, m3, m4]
//! intern             [m2, m3, m4]
//! ```
//!
//! Chains are not filtered by provider availability here. The agent runner
//! does that at call time so diagnostics still show the intended sequence.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::context::{self, SessionTierContext};
use crate::registry::{self, ModelDescriptor, Provider, ProviderAvailability};

/// Capability/cost level. Ordered by capability: `Intern < Associate < Partner`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Cheapest models only.
    Intern,
    /// Mid-range.
    Associate,
    /// Full chain, best model first.
    #[default]
    Partner,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Self::Intern, Self::Associate, Self::Partner];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intern => "intern",
            Self::Associate => "associate",
            Self::Partner => "partner",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown tier: {s} (expected intern, associate or partner)"))
    }
}

/// The seven pipeline agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentName {
    Leader,
    QuestionPrep,
    CorpusAgent,
    Classifier,
    Analyzer,
    Investigator,
    Advisor,
}

/// Generation defaults for an agent, overridable per call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentDefaults {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl AgentName {
    pub const ALL: [AgentName; 7] = [
        Self::Leader,
        Self::QuestionPrep,
        Self::Classifier,
        Self::CorpusAgent,
        Self::Analyzer,
        Self::Investigator,
        Self::Advisor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::QuestionPrep => "question-prep",
            Self::CorpusAgent => "corpus-agent",
            Self::Classifier => "classifier",
            Self::Analyzer => "analyzer",
            Self::Investigator => "investigator",
            Self::Advisor => "advisor",
        }
    }

    pub fn defaults(self) -> AgentDefaults {
        let (max_tokens, temperature) = match self {
            Self::Leader => (512, 0.0),
            Self::QuestionPrep => (1024, 0.2),
            Self::CorpusAgent => (4096, 0.2),
            Self::Classifier => (4096, 0.0),
            Self::Analyzer => (8192, 0.0),
            Self::Investigator => (8192, 0.0),
            Self::Advisor => (4096, 0.0),
        };
        AgentDefaults {
            max_tokens,
            temperature,
        }
    }

    /// Typical (input, output) token counts of one call, for estimates.
    pub fn typical_tokens(self) -> (u64, u64) {
        match self {
            Self::Leader => (800, 200),
            Self::QuestionPrep => (1000, 400),
            Self::Classifier => (5000, 1200),
            Self::CorpusAgent => (8000, 2000),
            Self::Analyzer => (10_000, 4000),
            Self::Investigator => (6000, 3000),
            Self::Advisor => (8000, 2000),
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| format!("unknown agent: {s}"))
    }
}

// ── Chains ──────────────────────────────────────────────────────────────────

const FAST_CHAIN: &[&str] = &[
    "claude-haiku-4.5",
    "gemini-2.5-flash",
    "cerebras-gpt-oss-120b",
    "groq-llama4-scout",
    "mistral-small-3",
];

const CORPUS_CHAIN: &[&str] = &[
    "claude-sonnet-4.5",
    "claude-haiku-4.5",
    "gemini-2.5-flash",
    "cerebras-gpt-oss-120b",
    "groq-llama4-scout",
];

const REASONING_CHAIN: &[&str] = &[
    "claude-sonnet-4.5",
    "gemini-2.5-pro",
    "mistral-large-3",
    "groq-llama3-70b",
    "cerebras-gpt-oss-120b",
];

// Investigator needs server-side web search, which only Anthropic offers.
const INVESTIGATOR_CHAIN: &[&str] = &["claude-sonnet-4.5", "claude-haiku-4.5"];

/// The full (partner-tier) chain for an agent.
pub fn full_chain_keys(agent: AgentName) -> &'static [&'static str] {
    match agent {
        AgentName::Leader | AgentName::QuestionPrep | AgentName::Classifier => FAST_CHAIN,
        AgentName::CorpusAgent => CORPUS_CHAIN,
        AgentName::Analyzer | AgentName::Advisor => REASONING_CHAIN,
        AgentName::Investigator => INVESTIGATOR_CHAIN,
    }
}

/// Index into the full chain where `tier` starts for `agent`.
fn tier_start(agent: AgentName, tier: Tier) -> usize {
    match (agent, tier) {
        (_, Tier::Partner) => 0,
        (_, Tier::Associate) => 1,
        (AgentName::Investigator, Tier::Intern) => 1,
        (_, Tier::Intern) => 2,
    }
}

/// Tier-scoped chain keys. Never empty.
pub fn chain_keys(agent: AgentName, tier: Tier) -> &'static [&'static str] {
    let keys = full_chain_keys(agent);
    let start = tier_start(agent, tier).min(keys.len().saturating_sub(1));
    &keys[start..]
}

/// Tier-scoped, ordered candidate list for `agent`.
pub fn agent_chain(agent: AgentName, tier: Tier) -> Vec<&'static ModelDescriptor> {
    chain_keys(agent, tier)
        .iter()
        .filter_map(|key| registry::model(key))
        .collect()
}

/// Candidate list for `agent` at the tier of the ambient session context.
pub fn get_agent_chain(agent: AgentName) -> Vec<&'static ModelDescriptor> {
    agent_chain(agent, context::current_tier())
}

/// Whether `agent` is switched on in the ambient session context.
pub fn is_agent_enabled(agent: AgentName) -> bool {
    context::is_agent_enabled(agent)
}

// ── Diagnostics ─────────────────────────────────────────────────────────────

/// One chain position with its live availability.
#[derive(Debug, Clone, Serialize)]
pub struct ChainEntry {
    pub key: &'static str,
    pub display_name: &'static str,
    pub provider: Provider,
    pub available: bool,
}

/// Chain view for one agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentChainInfo {
    pub agent: AgentName,
    pub chain: Vec<ChainEntry>,
    /// Position of the first available candidate (0 when none is available).
    pub active_index: usize,
    pub active_model: &'static str,
    pub enabled: bool,
}

/// Full tier report for a session.
#[derive(Debug, Clone, Serialize)]
pub struct TierInfo {
    pub current: Tier,
    pub agents: Vec<AgentChainInfo>,
}

/// Describe every agent's chain for the session's tier.
pub fn tier_info(ctx: &SessionTierContext, availability: &ProviderAvailability) -> TierInfo {
    let agents = AgentName::ALL
        .into_iter()
        .map(|agent| {
            let chain: Vec<ChainEntry> = agent_chain(agent, ctx.tier)
                .into_iter()
                .map(|m| ChainEntry {
                    key: m.key,
                    display_name: m.display_name,
                    provider: m.provider,
                    available: availability.is_model_available(m),
                })
                .collect();
            let active_index = chain.iter().position(|e| e.available).unwrap_or(0);
            AgentChainInfo {
                agent,
                active_model: chain.get(active_index).map(|e| e.key).unwrap_or_default(),
                active_index,
                chain,
                enabled: ctx.is_agent_enabled(agent),
            }
        })
        .collect();

    TierInfo {
        current: ctx.tier,
        agents,
    }
}

/// Rough per-query cost for a tier.
#[derive(Debug, Clone, Serialize)]
pub struct TierCostEstimate {
    pub tier: Tier,
    pub per_query_usd: f64,
    pub label: String,
}

/// Estimate the cost of one full query using typical token counts and the
/// first available model of each enabled agent's chain.
pub fn estimate_tier_cost(
    ctx: &SessionTierContext,
    availability: &ProviderAvailability,
) -> TierCostEstimate {
    let total: f64 = AgentName::ALL
        .into_iter()
        .filter(|a| ctx.is_agent_enabled(*a))
        .filter_map(|agent| {
            let chain = agent_chain(agent, ctx.tier);
            let model = chain
                .iter()
                .find(|m| availability.is_model_available(m))
                .or_else(|| chain.first())
                .copied()?;
            let (tin, tout) = agent.typical_tokens();
            Some(model.cost_usd(tin, tout))
        })
        .sum();

    let (per_query_usd, label) = if total < 0.001 {
        (0.0, "~free".to_string())
    } else if total < 0.01 {
        (total, format!("~{:.1}c", total * 100.0))
    } else {
        (total, format!("~${:.3}", total))
    };

    TierCostEstimate {
        tier: ctx.tier,
        per_query_usd,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_chain_key_resolves() {
        for agent in AgentName::ALL {
            for key in full_chain_keys(agent) {
                assert!(registry::model(key).is_some(), "{agent}: {key} missing");
            }
        }
    }

    #[test]
    fn lower_tiers_are_suffixes_and_never_empty() {
        for agent in AgentName::ALL {
            let partner = chain_keys(agent, Tier::Partner);
            let associate = chain_keys(agent, Tier::Associate);
            let intern = chain_keys(agent, Tier::Intern);

            assert!(!intern.is_empty(), "{agent} intern chain empty");
            assert!(partner.ends_with(associate), "{agent}: associate not a suffix");
            assert!(associate.ends_with(intern), "{agent}: intern not a suffix");
            assert_eq!(agent_chain(agent, Tier::Intern).len(), intern.len());
        }
    }

    #[test]
    fn investigator_intern_keeps_haiku() {
        assert_eq!(
            chain_keys(AgentName::Investigator, Tier::Intern),
            &["claude-haiku-4.5"]
        );
        assert_eq!(
            chain_keys(AgentName::Analyzer, Tier::Intern)[0],
            "mistral-large-3"
        );
    }

    #[test]
    fn tier_ordering_and_parsing() {
        assert!(Tier::Intern < Tier::Associate);
        assert!(Tier::Associate < Tier::Partner);
        assert_eq!(Tier::default(), Tier::Partner);
        assert_eq!("ASSOCIATE".parse::<Tier>().unwrap(), Tier::Associate);
    }

    #[test]
    fn agent_names_are_kebab_case() {
        assert_eq!(
            serde_json::to_string(&AgentName::QuestionPrep).unwrap(),
            "\"question-prep\""
        );
        assert_eq!(
            "corpus-agent".parse::<AgentName>().unwrap(),
            AgentName::CorpusAgent
        );
    }

    #[test]
    fn ambient_chain_defaults_to_partner() {
        let chain = get_agent_chain(AgentName::Classifier);
        assert_eq!(chain[0].key, "claude-haiku-4.5");
        assert_eq!(chain.len(), 5);
    }

    #[test]
    fn tier_info_marks_first_available() {
        let ctx = SessionTierContext::new(Tier::Partner);
        let avail = ProviderAvailability::from_providers([Provider::Gemini]);
        let info = tier_info(&ctx, &avail);

        let analyzer = info
            .agents
            .iter()
            .find(|a| a.agent == AgentName::Analyzer)
            .unwrap();
        assert_eq!(analyzer.active_index, 1);
        assert_eq!(analyzer.active_model, "gemini-2.5-pro");
        assert!(!analyzer.chain[0].available);
        assert!(analyzer.enabled);
    }

    #[test]
    fn cost_estimate_drops_with_tier_and_disabled_agents() {
        let avail = ProviderAvailability::all();
        let partner = estimate_tier_cost(&SessionTierContext::new(Tier::Partner), &avail);
        let intern = estimate_tier_cost(&SessionTierContext::new(Tier::Intern), &avail);
        assert!(partner.per_query_usd > intern.per_query_usd);
        assert!(partner.label.starts_with("~$"));

        let mut ctx = SessionTierContext::new(Tier::Partner);
        for agent in AgentName::ALL {
            ctx = ctx.with_disabled(agent);
        }
        let nothing = estimate_tier_cost(&ctx, &avail);
        assert_eq!(nothing.per_query_usd, 0.0);
        assert_eq!(nothing.label, "~free");
    }
}
