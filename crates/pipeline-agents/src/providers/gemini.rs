//! Google Gemini `generateContent`.

use coordination::ModelDescriptor;
use serde::{Deserialize, Serialize};

use super::{post_json, CompletionRequest, CompletionResponse};
use crate::errors::ProviderCallError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

fn build_body(request: &CompletionRequest) -> serde_json::Value {
    let body = GenerateRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        system_instruction: request.system.as_deref().map(|text| Content {
            role: None,
            parts: vec![Part { text }],
        }),
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
            response_mime_type: request.json_output.then_some("application/json"),
        },
    };
    serde_json::to_value(body).unwrap_or_default()
}

fn parse_response(value: serde_json::Value) -> Result<CompletionResponse, ProviderCallError> {
    let response: GenerateResponse = serde_json::from_value(value)
        .map_err(|e| ProviderCallError::Transport(format!("unexpected response shape: {e}")))?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ProviderCallError::EmptyResponse);
    }
    let (tokens_in, tokens_out) = response
        .usage_metadata
        .map(|u| (u.prompt_token_count, u.candidates_token_count))
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
    let body = build_body(request);
    // Key goes in a header so it never appears in logged URLs.
    let builder = client
        .post(format!(
            "{base_url}/models/{}:generateContent",
            model.model_id
        ))
        .header("x-goog-api-key", api_key);
    parse_response(post_json(builder, &body).await?)
}
