//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Nothing here is
//! retried or recovered; every variant surfaces to the caller of
//! [`MallamClient::chat_completions`](super::MallamClient::chat_completions).

use thiserror::Error;

/// Errors that can occur while talking to the chat completions endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The HTTP request could not be sent (DNS, connect, TLS, transport timeout).
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The response headers arrived but the body could not be read.
    #[error("failed to read response body: {reason}")]
    BodyReadFailed {
        reason: String,
    },

    /// The response body is not valid JSON for a chat completion.
    #[error("invalid response body: {reason}")]
    InvalidResponse {
        reason: String,
        body: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl InferenceError {
    /// Whether the request never produced a readable response.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            InferenceError::ConnectionFailed { .. } | InferenceError::BodyReadFailed { .. }
        )
    }

    /// The raw body text, if this is an `InvalidResponse`.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            InferenceError::InvalidResponse { body, .. } => Some(body),
            _ => None,
        }
    }
}
