//! Event layer errors.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`EventError::Decode`] | `EVENT_DECODE` | No |
//! | [`EventError::InvalidCall`] | `EVENT_INVALID_CALL` | No |

use thiserror::Error;
use weft_types::ErrorCode;

/// Failure to interpret a wire message.
#[derive(Debug, Error)]
pub enum EventError {
    /// Payload did not match the expected shape.
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// A master call was structurally valid JSON but semantically wrong.
    #[error("invalid master call: {0}")]
    InvalidCall(String),
}

impl EventError {
    /// Creates an invalid call error.
    pub fn invalid_call(message: impl Into<String>) -> Self {
        Self::InvalidCall(message.into())
    }
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "EVENT_DECODE",
            Self::InvalidCall(_) => "EVENT_INVALID_CALL",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
