//! Pipeline configuration.
//!
//! Values come from, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config` or `PIPELINE_CONFIG`)
//! 3. `PIPELINE_*` environment variables
//!
//! Provider API keys are only read from the environment.
//!
//! ```toml
//! timeout_secs = 90
//! tier = "associate"
//! disabled_agents = ["investigator"]
//! session_dir = ".pipeline/sessions"
//! cost_log = ".pipeline/agent-costs.jsonl"
//! corpus = "data/corpus.json"
//!
//! [base_urls]
//! groq = "http://localhost:8080/v1"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use coordination::{AgentName, Provider, SessionTierContext, Tier};
use serde::Deserialize;

use crate::providers::ProviderCredentials;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_TIMEOUT_SECS: u64 = 900;
const DEFAULT_SESSION_DIR: &str = ".pipeline/sessions";
const DEFAULT_COST_LOG: &str = ".pipeline/agent-costs.jsonl";

/// Runtime settings for the pipeline binary.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Per-request HTTP timeout for provider calls.
    pub timeout: Duration,
    /// Tier used when a session does not pick one.
    pub tier: Tier,
    pub disabled_agents: BTreeSet<AgentName>,
    pub session_dir: PathBuf,
    pub cost_log: PathBuf,
    /// Statute corpus for the corpus-qa route (JSON array of articles).
    pub corpus: Option<PathBuf>,
    pub base_urls: BTreeMap<Provider, String>,
}

/// On-disk overlay; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    timeout_secs: Option<u64>,
    tier: Option<Tier>,
    disabled_agents: Option<Vec<AgentName>>,
    session_dir: Option<PathBuf>,
    cost_log: Option<PathBuf>,
    corpus: Option<PathBuf>,
    #[serde(default)]
    base_urls: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            tier: Tier::default(),
            disabled_agents: BTreeSet::new(),
            session_dir: PathBuf::from(DEFAULT_SESSION_DIR),
            cost_log: PathBuf::from(DEFAULT_COST_LOG),
            corpus: None,
            base_urls: BTreeMap::new(),
        }
    }
}

/// `PIPELINE_BASE_URL_GROQ`, `PIPELINE_BASE_URL_OPENAI`, ...
fn base_url_var(provider: Provider) -> String {
    format!("PIPELINE_BASE_URL_{}", provider.as_str().to_ascii_uppercase())
}

fn parse_agent_list(raw: &str) -> Result<BTreeSet<AgentName>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<AgentName>().map_err(anyhow::Error::msg))
        .collect()
}

impl PipelineConfig {
    /// Defaults, then the TOML file, then the process environment.
    ///
    /// `path` wins over `PIPELINE_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var("PIPELINE_CONFIG").ok().map(PathBuf::from);
        let path = path.map(Path::to_path_buf).or(from_env);

        let mut config = Self::default();
        if let Some(path) = path {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            config
                .apply_toml(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_toml(&mut self, raw: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(raw)?;
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(tier) = file.tier {
            self.tier = tier;
        }
        if let Some(agents) = file.disabled_agents {
            self.disabled_agents = agents.into_iter().collect();
        }
        if let Some(dir) = file.session_dir {
            self.session_dir = dir;
        }
        if let Some(path) = file.cost_log {
            self.cost_log = path;
        }
        if file.corpus.is_some() {
            self.corpus = file.corpus;
        }
        for (name, url) in file.base_urls {
            let provider: Provider = name.parse().map_err(anyhow::Error::msg)?;
            self.base_urls.insert(provider, url);
        }
        Ok(())
    }

    /// Overlay `PIPELINE_*` variables read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get("PIPELINE_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("PIPELINE_TIMEOUT_SECS is not a number: {raw}"))?;
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = get("PIPELINE_TIER") {
            self.tier = raw.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(raw) = lookup("PIPELINE_DISABLED_AGENTS") {
            self.disabled_agents = parse_agent_list(&raw)?;
        }
        if let Some(dir) = get("PIPELINE_SESSION_DIR") {
            self.session_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("PIPELINE_COST_LOG") {
            self.cost_log = PathBuf::from(path);
        }
        if let Some(path) = get("PIPELINE_CORPUS") {
            self.corpus = Some(PathBuf::from(path));
        }
        for provider in Provider::ALL {
            if let Some(url) = get(&base_url_var(provider)) {
                self.base_urls.insert(provider, url);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let secs = self.timeout.as_secs();
        if secs == 0 || secs > MAX_TIMEOUT_SECS {
            bail!("timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {secs}");
        }
        for (provider, url) in &self.base_urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("base URL for {provider} must be http(s): {url}");
            }
        }
        if self.disabled_agents.len() == AgentName::ALL.len() {
            bail!("every agent is disabled; nothing could run");
        }
        Ok(())
    }

    /// API keys from the environment plus configured base URLs.
    pub fn credentials(&self) -> ProviderCredentials {
        self.base_urls
            .iter()
            .fold(ProviderCredentials::from_env(), |creds, (provider, url)| {
                creds.with_base_url(*provider, url.clone())
            })
    }

    /// Context for one invocation. `tier` overrides the configured default.
    pub fn session_context(&self, tier: Option<Tier>) -> SessionTierContext {
        SessionTierContext::new(tier.unwrap_or(self.tier))
            .with_disabled_agents(self.disabled_agents.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_validate() {
        let config = PipelineConfig::default();
        assert_eq!(config.tier, Tier::Partner);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env(&[
                ("PIPELINE_TIER", "intern"),
                ("PIPELINE_TIMEOUT_SECS", "30"),
                ("PIPELINE_DISABLED_AGENTS", "investigator, question-prep"),
                ("PIPELINE_BASE_URL_GROQ", "http://localhost:9000/v1"),
            ]))
            .unwrap();
        assert_eq!(config.tier, Tier::Intern);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.disabled_agents.contains(&AgentName::Investigator));
        assert!(config.disabled_agents.contains(&AgentName::QuestionPrep));
        assert_eq!(
            config.base_urls.get(&Provider::Groq).map(String::as_str),
            Some("http://localhost:9000/v1")
        );

        let ctx = config.session_context(None);
        assert!(!ctx.is_agent_enabled(AgentName::Investigator));
        assert!(ctx.is_agent_enabled(AgentName::Analyzer));
        assert_eq!(config.session_context(Some(Tier::Partner)).tier, Tier::Partner);
    }

    #[test]
    fn bad_env_values_are_errors() {
        let mut config = PipelineConfig::default();
        assert!(config.apply_env(env(&[("PIPELINE_TIER", "senior")])).is_err());
        assert!(config
            .apply_env(env(&[("PIPELINE_DISABLED_AGENTS", "leader,reviewer")]))
            .is_err());
        assert!(config.apply_env(env(&[("PIPELINE_TIMEOUT_SECS", "soon")])).is_err());
    }

    #[test]
    fn toml_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(
            &path,
            r#"
timeout_secs = 45
tier = "associate"
disabled_agents = ["investigator"]
corpus = "corpus.json"

[base_urls]
openai = "https://proxy.internal/v1"
"#,
        )
        .unwrap();

        let mut config = PipelineConfig::default();
        config
            .apply_toml(&std::fs::read_to_string(&path).unwrap())
            .unwrap();
        config.apply_env(env(&[("PIPELINE_TIER", "intern")])).unwrap();

        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.tier, Tier::Intern);
        assert_eq!(config.corpus, Some(PathBuf::from("corpus.json")));
        assert_eq!(
            config.credentials().base_url(Provider::OpenAi),
            "https://proxy.internal/v1"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        let mut config = PipelineConfig::default();
        assert!(config.apply_toml("max_retries = 3").is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let config = PipelineConfig {
            timeout: Duration::from_secs(0),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.base_urls.insert(Provider::Groq, "localhost:8080".into());
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            disabled_agents: AgentName::ALL.into_iter().collect(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
