//! OpenAI chat-completions dialect (OpenAI, Mistral, Groq, Cerebras, DeepSeek).

use coordination::{ModelDescriptor, Provider};
use serde::{Deserialize, Serialize};

use super::{post_json, CompletionRequest, CompletionResponse};
use crate::errors::ProviderCallError;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn build_body(model: &ModelDescriptor, request: &CompletionRequest) -> serde_json::Value {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.prompt,
    });

    // OpenAI's own API renamed the token limit; compatible hosts kept the old name.
    let (max_tokens, max_completion_tokens) = if model.provider == Provider::OpenAi {
        (None, Some(request.max_tokens))
    } else {
        (Some(request.max_tokens), None)
    };

    let body = ChatRequest {
        model: model.model_id,
        messages,
        temperature: request.temperature,
        max_tokens,
        max_completion_tokens,
        response_format: request.json_output.then_some(ResponseFormat {
            kind: "json_object",
        }),
    };
    serde_json::to_value(body).unwrap_or_default()
}

fn parse_response(value: serde_json::Value) -> Result<CompletionResponse, ProviderCallError> {
    let response: ChatResponse = serde_json::from_value(value)
        .map_err(|e| ProviderCallError::Transport(format!("unexpected response shape: {e}")))?;
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or(ProviderCallError::EmptyResponse)?;
    let (tokens_in, tokens_out) = response
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
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
        .post(format!("{base_url}/chat/completions"))
        .bearer_auth(api_key);
    parse_response(post_json(builder, &body).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: Some("Reply in JSON.".into()),
            prompt: "Classify this.".into(),
            max_tokens: 512,
            temperature: 0.2,
            json_output: true,
            web_search: false,
        }
    }

    #[test]
    fn groq_body_uses_max_tokens_and_json_mode() {
        let model = coordination::model("groq-llama4-scout").unwrap();
        let body = build_body(model, &request());

        assert_eq!(body["model"], "meta-llama/llama-4-scout-17b-16e-instruct");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Classify this.");
        assert_eq!(body["max_tokens"], 512);
        assert!(body.get("max_completion_tokens").is_none());
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn openai_body_uses_max_completion_tokens() {
        let model = coordination::model("gpt-4o-mini").unwrap();
        let mut req = request();
        req.system = None;
        req.json_output = false;
        let body = build_body(model, &req);

        assert_eq!(body["max_completion_tokens"], 512);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn parses_text_and_usage() {
        let resp = parse_response(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"a\":1}"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30}
        }))
        .unwrap();
        assert_eq!(resp.text, "{\"a\":1}");
        assert_eq!((resp.tokens_in, resp.tokens_out), (120, 30));
    }

    #[test]
    fn empty_choices_is_an_error() {
        let err = parse_response(json!({"choices": []})).unwrap_err();
        assert_eq!(err, ProviderCallError::EmptyResponse);
    }
}
