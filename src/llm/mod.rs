//! LLM clients
//!
//! Provider clients implementing the [`LlmClient`] trait, plus the fallback
//! decorator that chains providers in order.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod fallback;
mod openai;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use fallback::FallbackClient;
pub use openai::OpenAiClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage, ToolCall, ToolDefinition};

use crate::config::LlmConfig;

/// Create an LLM client for the provider named in config.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicClient::from_config(config)?)),
        "openai" => Ok(Arc::new(OpenAiClient::from_config(config)?)),
        other => Err(LlmError::InvalidResponse(format!(
            "Unknown LLM provider: '{}'. Supported: anthropic, openai",
            other
        ))),
    }
}

/// Build the provider chain: the primary client, wrapped in a
/// [`FallbackClient`] when a fallback provider is configured.
pub fn build_chain(primary: &LlmConfig, fallback: Option<&LlmConfig>) -> Result<Arc<dyn LlmClient>, LlmError> {
    let first = create_client(primary)?;
    match fallback {
        None => Ok(first),
        Some(cfg) => {
            let second = create_client(cfg)?;
            Ok(Arc::new(FallbackClient::new(vec![first, second])))
        }
    }
}
