//! Provider fallback chain
//!
//! An explicit decorator over [`LlmClient`]: providers are tried in the
//! configured order and the first success wins. This replaces any notion of
//! process-global model singletons - the chain is built once at startup and
//! injected wherever a client is needed.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

/// Tries each wrapped client in order until one succeeds.
pub struct FallbackClient {
    clients: Vec<Arc<dyn LlmClient>>,
}

impl FallbackClient {
    pub fn new(clients: Vec<Arc<dyn LlmClient>>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl LlmClient for FallbackClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut last_error = None;

        for (idx, client) in self.clients.iter().enumerate() {
            match client.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(provider_index = idx, error = %e, "complete: provider failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("no providers configured".to_string())))
    }
}
