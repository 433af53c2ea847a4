//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while calling an endpoint
///
/// Every variant is treated the same way by the dispatcher: the attempt
/// failed and the task moves on to the next endpoint slot.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Check if this is a rate limit rejection
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }
}
