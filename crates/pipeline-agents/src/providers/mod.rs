//! LLM provider backends.
//!
//! [`CompletionBackend`] is the seam between the agent runner and the
//! network. [`HttpBackend`] dispatches on the model's provider:
//!
//! ```text
//! anthropic ──▶ anthropic::complete   (Messages API)
//! gemini    ──▶ gemini::complete      (generateContent)
//! others    ──▶ openai_compat::complete (chat completions)
//! ```

pub mod anthropic;
pub mod gemini;
pub mod openai_compat;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use coordination::{ModelDescriptor, Provider, ProviderAvailability};
use tracing::debug;

use crate::errors::ProviderCallError;

/// Maximum characters of an error body kept in errors and logs.
const ERROR_BODY_LIMIT: usize = 500;

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider for a JSON object where supported.
    pub json_output: bool,
    /// Allow provider-side web search where supported (Anthropic only).
    pub web_search: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

/// Performs a completion against one model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        model: &'static ModelDescriptor,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderCallError>;
}

/// API keys and base URL overrides per provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    keys: BTreeMap<Provider, String>,
    base_urls: BTreeMap<Provider, String>,
}

impl ProviderCredentials {
    /// Keys from each provider's environment variable.
    pub fn from_env() -> Self {
        let keys = Provider::ALL
            .into_iter()
            .filter_map(|p| {
                std::env::var(p.env_key())
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (p, v))
            })
            .collect();
        Self {
            keys,
            base_urls: BTreeMap::new(),
        }
    }

    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.keys.insert(provider, key.into());
        self
    }

    pub fn with_base_url(mut self, provider: Provider, url: impl Into<String>) -> Self {
        self.base_urls.insert(provider, url.into());
        self
    }

    pub fn key(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    pub fn base_url(&self, provider: Provider) -> &str {
        self.base_urls
            .get(&provider)
            .map(String::as_str)
            .unwrap_or_else(|| provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Providers with a key are the ones the runner may call.
    pub fn availability(&self) -> ProviderAvailability {
        ProviderAvailability::from_providers(self.keys.keys().copied())
    }
}

/// Real HTTP backend over a shared `reqwest::Client`.
pub struct HttpBackend {
    client: reqwest::Client,
    credentials: ProviderCredentials,
}

impl HttpBackend {
    pub fn new(credentials: ProviderCredentials, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn credentials(&self) -> &ProviderCredentials {
        &self.credentials
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn complete(
        &self,
        model: &'static ModelDescriptor,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderCallError> {
        let provider = model.provider;
        let key = self
            .credentials
            .key(provider)
            .ok_or(ProviderCallError::MissingApiKey(provider))?;
        let base = self.credentials.base_url(provider);
        debug!(model = model.key, provider = %provider, "Sending completion request");

        match provider {
            Provider::Anthropic => {
                anthropic::complete(&self.client, base, key, model, request).await
            }
            Provider::Gemini => gemini::complete(&self.client, base, key, model, request).await,
            _ => openai_compat::complete(&self.client, base, key, model, request).await,
        }
    }
}

/// Map a reqwest send error.
pub(crate) fn transport_error(e: reqwest::Error) -> ProviderCallError {
    if e.is_timeout() {
        ProviderCallError::Timeout
    } else {
        ProviderCallError::Transport(e.without_url().to_string())
    }
}

/// Turn a non-success status into the matching error.
pub(crate) async fn status_error(response: reqwest::Response) -> ProviderCallError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let cut = (0..=ERROR_BODY_LIMIT)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        body.truncate(cut);
    }
    if status == 429 {
        ProviderCallError::RateLimited(body)
    } else {
        ProviderCallError::Http { status, body }
    }
}

/// POST `body` and decode a JSON response, mapping failures to
/// [`ProviderCallError`].
pub(crate) async fn post_json(
    builder: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ProviderCallError> {
    let response = builder.json(body).send().await.map_err(transport_error)?;
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| ProviderCallError::Transport(format!("invalid response body: {e}")))
}
