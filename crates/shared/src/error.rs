use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_DETAIL_CHARS: usize = 512;

/// JSON body the upload endpoint sends alongside a 4xx/5xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerErrorBody {
    pub error: String,
}

impl ServerErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Extracts a human-readable reason from a failed upload response.
///
/// Prefers the `error` field of a JSON body, falls back to the trimmed text
/// body, and returns `None` for empty or binary bodies.
pub fn server_error_detail(body: &[u8]) -> Option<String> {
    if let Ok(parsed) = serde_json::from_slice::<ServerErrorBody>(body) {
        return Some(truncate(parsed.error.trim()));
    }

    let text = std::str::from_utf8(body).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(truncate(text))
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
