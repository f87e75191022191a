//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur talking to a model provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not found: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Whether retrying the same request could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::Network(_) => true,
            LlmError::MissingApiKey(_) | LlmError::InvalidResponse(_) | LlmError::Json(_) => false,
        }
    }
}
