//! JSON response bodies.
//!
//! Success: `{"message": ..., "content": ...}` (`content` omitted when empty).
//! Failure: `{"error": ...}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<T>,
}

impl<T> Envelope<T> {
    pub fn with_content(message: impl Into<String>, content: T) -> Self {
        Self {
            message: message.into(),
            content: Some(content),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            content: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
