//! Decoding a located fragment into a notification.

use serde_json::{Map, Value};

/// Name of the field carrying the human-readable message.
const CONTENT_FIELD: &str = "Content";

/// A message the agent wants shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub content: String,
}

/// Why a fragment did not produce a notification.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not valid JSON, or valid JSON that is not an object.
    #[error("invalid JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no \"Content\" field")]
    MissingContent,

    #[error("\"Content\" is null")]
    NullContent,

    #[error("\"Content\" is not a string")]
    ContentNotString,
}

/// Parses `fragment` and extracts its `"Content"` string.
pub fn try_decode(fragment: &str) -> Result<Notification, DecodeError> {
    let object: Map<String, Value> = serde_json::from_str(fragment)?;

    match object.get(CONTENT_FIELD) {
        None => Err(DecodeError::MissingContent),
        Some(Value::Null) => Err(DecodeError::NullContent),
        Some(Value::String(s)) => Ok(Notification { content: s.clone() }),
        Some(_) => Err(DecodeError::ContentNotString),
    }
}

/// Like [`try_decode`], discarding the reason for failure.
pub fn decode(fragment: &str) -> Option<Notification> {
    try_decode(fragment).ok()
}
