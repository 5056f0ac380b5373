use std::time::Duration;

use thiserror::Error;

/// Errors returned by a model backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP 429. The only error the turn loop retries.
    #[error("Rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Response contained no choices")]
    EmptyChoices,
}

impl LlmError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
