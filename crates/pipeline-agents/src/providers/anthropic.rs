//! Anthropic Messages API.

use coordination::ModelDescriptor;
use serde::{Deserialize, Serialize};

use super::{post_json, CompletionRequest, CompletionResponse};
use crate::errors::ProviderCallError;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const WEB_SEARCH_MAX_USES: u32 = 5;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

fn build_body(model: &ModelDescriptor, request: &CompletionRequest) -> serde_json::Value {
    let tools = if request.web_search {
        vec![serde_json::json!({
            "type": "web_search_20250305",
            "name": "web_search",
            "max_uses": WEB_SEARCH_MAX_USES,
        })]
    } else {
        Vec::new()
    };
    let body = MessagesRequest {
        model: model.model_id,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        system: request.system.as_deref(),
        messages: vec![Message {
            role: "user",
            content: &request.prompt,
        }],
        tools,
    };
    serde_json::to_value(body).unwrap_or_default()
}

fn parse_response(value: serde_json::Value) -> Result<CompletionResponse, ProviderCallError> {
    let response: MessagesResponse = serde_json::from_value(value)
        .map_err(|e| ProviderCallError::Transport(format!("unexpected response shape: {e}")))?;

    // Web search interleaves tool blocks with text; keep the text only.
    let text: String = response
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect();
    if text.trim().is_empty() {
        return Err(ProviderCallError::EmptyResponse);
    }

    let (tokens_in, tokens_out) = response
        .usage
        .map(|u| (u.input_tokens, u.output_tokens))
        .unwrap_or_default();
    Ok(CompletionResponse {
        text,
        tokens_in,
        tokens_out,
    })
}

pub async fn complete(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &ModelDescriptor,
    request: &CompletionRequest,
) -> Result<CompletionResponse, ProviderCallError> {
    let body = build_body(model, request);
    let builder = client
        .post(format!("{base_url}/messages"))
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION);
    parse_response(post_json(builder, &body).await?)
}
