//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent.
///
/// The planning loops carry their own transcripts in the request; no
/// conversation state is kept behind this trait. Implementations own their
/// transport-level retry policy; loop bounding is the caller's job.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request, blocking until complete.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
