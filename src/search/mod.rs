//! External knowledge search
//!
//! A pure capability from the planner's perspective: prompt in, finding text
//! out. The production client speaks the Perplexity-style chat-completions
//! API; retry policy lives here at the transport level, not in the loops.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SearchConfig;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Errors from the search provider
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("API key not found: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Internet search capability consumed by the research executor and the
/// transportation augmenter.
#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    /// Run one search with the fully rendered prompt and return the raw
    /// finding text.
    async fn search(&self, prompt: &str) -> Result<String, SearchError>;
}

/// Perplexity-style online search client
pub struct SonarClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl SonarClient {
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let api_key =
            std::env::var(&config.api_key_env).map_err(|_| SearchError::MissingApiKey(config.api_key_env.clone()))?;
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(SearchError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    fn parse_response(&self, api_response: SonarResponse) -> Result<String, SearchError> {
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| SearchError::InvalidResponse("search returned no content".to_string()))
    }
}

#[async_trait]
impl KnowledgeSearch for SonarClient {
    async fn search(&self, prompt: &str) -> Result<String, SearchError> {
        debug!(%self.model, prompt_len = prompt.len(), "search: called");
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "search: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self.http.post(url.clone()).bearer_auth(&self.api_key).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(SearchError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "search: retryable error");
                last_error = Some(SearchError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(SearchError::ApiError { status, message: text });
            }

            let api_response: SonarResponse = response
                .json()
                .await
                .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;
            return self.parse_response(api_response);
        }

        Err(last_error.unwrap_or_else(|| SearchError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

#[derive(Debug, Deserialize)]
struct SonarResponse {
    choices: Vec<SonarChoice>,
}

#[derive(Debug, Deserialize)]
struct SonarChoice {
    message: SonarMessage,
}

#[derive(Debug, Deserialize)]
struct SonarMessage {
    content: Option<String>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_takes_first_choice() {
        let client = SonarClient {
            model: "sonar-pro".into(),
            api_key: "k".into(),
            base_url: "https://api.perplexity.ai".into(),
            http: Client::new(),
            max_tokens: 4096,
        };

        let response: SonarResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "1. Les Halles market..."}}]
        }))
        .unwrap();

        assert_eq!(client.parse_response(response).unwrap(), "1. Les Halles market...");
    }

    #[test]
    fn test_parse_response_rejects_empty() {
        let client = SonarClient {
            model: "sonar-pro".into(),
            api_key: "k".into(),
            base_url: "https://api.perplexity.ai".into(),
            http: Client::new(),
            max_tokens: 4096,
        };

        let response: SonarResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": ""}}]
        }))
        .unwrap();

        assert!(client.parse_response(response).is_err());
    }
}
