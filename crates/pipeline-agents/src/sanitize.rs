//! Input sanitation at the pipeline boundary.
//!
//! | Input      | Limit             | Over limit        |
//! |------------|-------------------|-------------------|
//! | document   | 500,000 chars     | truncated         |
//! | question   | 2,000 chars       | truncated         |
//! | session id | `[A-Za-z0-9_-]{5,100}` | rejected     |
//!
//! Carriage returns become newlines; other control characters except tab are
//! stripped from text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::errors::PipelineError;

pub const MAX_DOCUMENT_CHARS: usize = 500_000;
pub const MAX_QUESTION_CHARS: usize = 2_000;

static SESSION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{5,100}$").unwrap());

fn strip_control(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .map(|c| if c == '\r' { '\n' } else { c })
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

fn truncate_chars(text: String, max: usize, what: &str) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => {
            warn!(input = what, limit = max, "Input truncated");
            text[..byte_idx].to_string()
        }
        None => text,
    }
}

/// Clean document text. `None` when nothing meaningful is left.
pub fn sanitize_document(text: &str) -> Option<String> {
    let clean = strip_control(text);
    let trimmed = clean.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed.to_string(), MAX_DOCUMENT_CHARS, "document"))
}

/// Clean a user question. `None` when blank.
pub fn sanitize_question(text: &str) -> Option<String> {
    let clean = strip_control(text);
    let trimmed = clean.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed.to_string(), MAX_QUESTION_CHARS, "question"))
}

pub fn validate_session_id(id: &str) -> Result<(), PipelineError> {
    if SESSION_ID_RE.is_match(id) {
        Ok(())
    } else {
        Err(PipelineError::InvalidInput(format!(
            "session id must match [A-Za-z0-9_-]{{5,100}}, got {} chars",
            id.chars().count()
        )))
    }
}
