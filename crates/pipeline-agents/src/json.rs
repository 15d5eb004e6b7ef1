//! Tolerant JSON extraction from free-form model output.
//!
//! Models wrap JSON in code fences, prepend prose, or append commentary. The
//! extractor tries, in order:
//!
//! 1. the body of the first ```` ``` ```` / ```` ```json ```` fence;
//! 2. the whole trimmed text;
//! 3. each balanced `{...}` / `[...]` region, left to right, skipping
//!    brackets inside string literals.
//!
//! The first candidate that parses wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?([\s\S]*?)\r?\n?```").unwrap());

#[derive(Debug, Error, PartialEq)]
pub enum JsonExtractError {
    #[error("no JSON found in model output ({len} chars)")]
    NotFound { len: usize },

    #[error("JSON does not match expected shape: {0}")]
    Shape(String),
}

/// Extract the first JSON value from `text`.
pub fn extract_json(text: &str) -> Result<Value, JsonExtractError> {
    if let Some(caps) = FENCE_RE.captures(text) {
        if let Some(body) = caps.get(1) {
            if let Ok(v) = serde_json::from_str(body.as_str().trim()) {
                return Ok(v);
            }
        }
    }

    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Ok(v);
    }

    let mut from = 0;
    while let Some(offset) = trimmed[from..].find(['{', '[']) {
        let start = from + offset;
        if let Some(region) = balanced_region(&trimmed[start..]) {
            if let Ok(v) = serde_json::from_str(region) {
                return Ok(v);
            }
        }
        from = start + 1;
    }

    Err(JsonExtractError::NotFound { len: text.len() })
}

/// Extract JSON from `text` and deserialize it into `T`.
pub fn parse_agent_json<T: DeserializeOwned>(text: &str) -> Result<T, JsonExtractError> {
    let value = extract_json(text)?;
    serde_json::from_value(value).map_err(|e| JsonExtractError::Shape(e.to_string()))
}

/// The balanced bracket region starting at the first byte of `text`.
fn balanced_region(text: &str) -> Option<&str> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn plain_object() {
        assert_eq!(extract_json(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn fenced_with_language_tag() {
        let raw = "Here you go:\n```json\n{\"route\": \"corpus-qa\"}\n```\nThanks";
        assert_eq!(extract_json(raw).unwrap(), json!({"route": "corpus-qa"}));
    }

    #[test]
    fn fenced_without_language_tag() {
        let raw = "```\n[1, 2, 3]\n```";
        assert_eq!(extract_json(raw).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn prose_wrapped_object() {
        let raw = "Sure! The classification is {\"documentType\": \"lease\"} as requested.";
        assert_eq!(
            extract_json(raw).unwrap(),
            json!({"documentType": "lease"})
        );
    }

    #[test]
    fn nested_with_braces_inside_strings() {
        let raw = r#"Result: {"clause": "pay {rent} [monthly]", "items": [{"n": 1}, {"n": 2}]} done {"#;
        let v = extract_json(raw).unwrap();
        assert_eq!(v["clause"], "pay {rent} [monthly]");
        assert_eq!(v["items"][1]["n"], 2);
    }

    #[test]
    fn escaped_quote_inside_string() {
        let raw = r#"text {"q": "he said \"}\" loudly"} tail"#;
        assert_eq!(extract_json(raw).unwrap()["q"], "he said \"}\" loudly");
    }

    #[test]
    fn skips_unparseable_region_and_finds_next() {
        let raw = "see [section 3] then {\"ok\": true}";
        assert_eq!(extract_json(raw).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn broken_fence_falls_back_to_scan() {
        let raw = "```json\n{\"a\": 1,}\n```\n{\"a\": 2}";
        assert_eq!(extract_json(raw).unwrap(), json!({"a": 2}));
    }

    #[test]
    fn no_json_is_an_error() {
        assert_eq!(
            extract_json("I cannot help with that."),
            Err(JsonExtractError::NotFound { len: 24 })
        );
        assert!(extract_json("{\"unterminated\": ").is_err());
    }

    #[test]
    fn typed_parse_reports_shape_mismatch() {
        #[derive(Debug, Deserialize)]
        struct Out {
            #[allow(dead_code)]
            route: String,
        }
        let err = parse_agent_json::<Out>(r#"{"other": 1}"#).unwrap_err();
        assert!(matches!(err, JsonExtractError::Shape(_)));
        assert!(parse_agent_json::<Out>(r#"{"route": "x"}"#).is_ok());
    }
}
