//! Model Registry — static catalog of models and the providers serving them.
//!
//! The catalog is process-wide and immutable. Which providers are usable at
//! runtime is a separate concern tracked by [`ProviderAvailability`]: a
//! provider is enabled iff its API key is configured.
//!
//! | Provider  | Key variable        | Wire protocol           |
//! |-----------|---------------------|-------------------------|
//! | anthropic | `ANTHROPIC_API_KEY` | Messages API            |
//! | gemini    | `GEMINI_API_KEY`    | generateContent         |
//! | openai    | `OPENAI_API_KEY`    | chat completions        |
//! | mistral   | `MISTRAL_API_KEY`   | chat completions (compat) |
//! | groq      | `GROQ_API_KEY`      | chat completions (compat) |
//! | cerebras  | `CEREBRAS_API_KEY`  | chat completions (compat) |
//! | deepseek  | `DEEPSEEK_API_KEY`  | chat completions (compat) |

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An LLM vendor reachable over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Mistral,
    Groq,
    Cerebras,
    #[serde(rename = "deepseek")]
    DeepSeek,
}

impl Provider {
    pub const ALL: [Provider; 7] = [
        Self::Anthropic,
        Self::Gemini,
        Self::OpenAi,
        Self::Mistral,
        Self::Groq,
        Self::Cerebras,
        Self::DeepSeek,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Mistral => "mistral",
            Self::Groq => "groq",
            Self::Cerebras => "cerebras",
            Self::DeepSeek => "deepseek",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn env_key(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Mistral => "MISTRAL_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Cerebras => "CEREBRAS_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    /// Default API base URL.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Mistral => "https://api.mistral.ai/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Cerebras => "https://api.cerebras.ai/v1",
            Self::DeepSeek => "https://api.deepseek.com",
        }
    }

    /// Whether the provider speaks the OpenAI chat-completions dialect.
    pub fn is_openai_compatible(self) -> bool {
        !matches!(self, Self::Anthropic | Self::Gemini)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

/// Immutable description of one model in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    /// Catalog key used in fallback chains (e.g. `claude-haiku-4.5`).
    pub key: &'static str,
    pub provider: Provider,
    /// Identifier sent on the wire.
    pub model_id: &'static str,
    pub display_name: &'static str,
    /// USD per million input tokens.
    pub input_cost_per_1m: f64,
    /// USD per million output tokens.
    pub output_cost_per_1m: f64,
    pub context_window: u32,
}

impl ModelDescriptor {
    /// Cost in USD of a call with the given token counts.
    pub fn cost_usd(&self, tokens_in: u64, tokens_out: u64) -> f64 {
        (tokens_in as f64 / 1_000_000.0) * self.input_cost_per_1m
            + (tokens_out as f64 / 1_000_000.0) * self.output_cost_per_1m
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.provider)
    }
}

// ── Catalog ─────────────────────────────────────────────────────────────────

static MODELS: [ModelDescriptor; 13] = [
    ModelDescriptor {
        key: "claude-opus-4.5",
        provider: Provider::Anthropic,
        model_id: "claude-opus-4-5-20251101",
        display_name: "Claude Opus 4.5",
        input_cost_per_1m: 15.0,
        output_cost_per_1m: 75.0,
        context_window: 200_000,
    },
    ModelDescriptor {
        key: "claude-sonnet-4.5",
        provider: Provider::Anthropic,
        model_id: "claude-sonnet-4-5-20250929",
        display_name: "Claude Sonnet 4.5",
        input_cost_per_1m: 3.0,
        output_cost_per_1m: 15.0,
        context_window: 200_000,
    },
    ModelDescriptor {
        key: "claude-haiku-4.5",
        provider: Provider::Anthropic,
        model_id: "claude-haiku-4-5-20251001",
        display_name: "Claude Haiku 4.5",
        input_cost_per_1m: 1.0,
        output_cost_per_1m: 5.0,
        context_window: 200_000,
    },
    ModelDescriptor {
        key: "gemini-2.5-flash",
        provider: Provider::Gemini,
        model_id: "gemini-2.5-flash",
        display_name: "Gemini 2.5 Flash",
        input_cost_per_1m: 0.15,
        output_cost_per_1m: 0.6,
        context_window: 1_000_000,
    },
    ModelDescriptor {
        key: "gemini-2.5-pro",
        provider: Provider::Gemini,
        model_id: "gemini-2.5-pro",
        display_name: "Gemini 2.5 Pro",
        input_cost_per_1m: 1.25,
        output_cost_per_1m: 10.0,
        context_window: 1_000_000,
    },
    ModelDescriptor {
        key: "gpt-4o-mini",
        provider: Provider::OpenAi,
        model_id: "gpt-4o-mini",
        display_name: "GPT-4o Mini",
        input_cost_per_1m: 0.15,
        output_cost_per_1m: 0.6,
        context_window: 128_000,
    },
    ModelDescriptor {
        key: "gpt-5",
        provider: Provider::OpenAi,
        model_id: "gpt-5",
        display_name: "GPT-5",
        input_cost_per_1m: 1.25,
        output_cost_per_1m: 10.0,
        context_window: 400_000,
    },
    ModelDescriptor {
        key: "mistral-large-3",
        provider: Provider::Mistral,
        model_id: "mistral-large-2512",
        display_name: "Mistral Large 3",
        input_cost_per_1m: 0.5,
        output_cost_per_1m: 1.5,
        context_window: 256_000,
    },
    ModelDescriptor {
        key: "mistral-small-3",
        provider: Provider::Mistral,
        model_id: "mistral-small-3.2-24b-instruct",
        display_name: "Mistral Small 3.2",
        input_cost_per_1m: 0.06,
        output_cost_per_1m: 0.18,
        context_window: 128_000,
    },
    ModelDescriptor {
        key: "groq-llama4-scout",
        provider: Provider::Groq,
        model_id: "meta-llama/llama-4-scout-17b-16e-instruct",
        display_name: "Llama 4 Scout (Groq)",
        input_cost_per_1m: 0.11,
        output_cost_per_1m: 0.34,
        context_window: 128_000,
    },
    ModelDescriptor {
        key: "groq-llama3-70b",
        provider: Provider::Groq,
        model_id: "llama-3.3-70b-versatile",
        display_name: "Llama 3.3 70B (Groq)",
        input_cost_per_1m: 0.59,
        output_cost_per_1m: 0.79,
        context_window: 128_000,
    },
    ModelDescriptor {
        key: "cerebras-gpt-oss-120b",
        provider: Provider::Cerebras,
        model_id: "gpt-oss-120b",
        display_name: "GPT-OSS 120B (Cerebras)",
        input_cost_per_1m: 0.35,
        output_cost_per_1m: 0.75,
        context_window: 128_000,
    },
    ModelDescriptor {
        key: "deepseek-v3",
        provider: Provider::DeepSeek,
        model_id: "deepseek-chat",
        display_name: "DeepSeek V3.2",
        input_cost_per_1m: 0.28,
        output_cost_per_1m: 0.42,
        context_window: 128_000,
    },
];

/// Look up a model by catalog key.
pub fn model(key: &str) -> Option<&'static ModelDescriptor> {
    MODELS.iter().find(|m| m.key == key)
}

/// Iterate the whole catalog.
pub fn models() -> impl Iterator<Item = &'static ModelDescriptor> {
    MODELS.iter()
}

// ── Availability ────────────────────────────────────────────────────────────

/// The set of providers that may be called right now.
///
/// Chains are declared independently of this; the agent runner filters a
/// chain through it at execution time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderAvailability {
    enabled: BTreeSet<Provider>,
}

impl ProviderAvailability {
    /// Providers whose API key variable is set and non-empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = Provider::ALL
            .into_iter()
            .filter(|p| {
                lookup(p.env_key())
                    .map(|v| !v.trim().is_empty())
                    .unwrap_or(false)
            })
            .collect();
        Self { enabled }
    }

    pub fn from_providers(providers: impl IntoIterator<Item = Provider>) -> Self {
        Self {
            enabled: providers.into_iter().collect(),
        }
    }

    pub fn all() -> Self {
        Self::from_providers(Provider::ALL)
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, provider: Provider) -> bool {
        self.enabled.contains(&provider)
    }

    pub fn is_model_available(&self, model: &ModelDescriptor) -> bool {
        self.is_enabled(model.provider)
    }

    pub fn enabled(&self) -> impl Iterator<Item = Provider> + '_ {
        self.enabled.iter().copied()
    }

    pub fn disable(&mut self, provider: Provider) {
        self.enabled.remove(&provider);
    }
}
