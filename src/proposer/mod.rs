//! The content-proposer boundary
//!
//! Every planning loop asks the model for a specific structured shape by
//! offering a single submit tool and requiring it to be called. A response
//! that doesn't match the requested shape is a hard failure of the issuing
//! step - there is no guessing and no silent fallback output.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::llm::{CompletionRequest, LlmClient, LlmError, Message, ToolDefinition};

/// Errors crossing the proposer boundary
#[derive(Debug, Error)]
pub enum ProposerError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("malformed proposer output for '{tool}': {reason}")]
    MalformedOutput { tool: String, reason: String },
}

impl ProposerError {
    pub fn malformed(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// One structured-output request: a prompt plus the submit tool the model
/// must call.
#[derive(Debug, Clone)]
pub struct ProposalRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub tool: ToolDefinition,
    pub max_tokens: u32,
}

/// The capability the planning loops consume.
///
/// `propose` returns the raw submit-tool input; [`propose_typed`] layers the
/// serde deserialization on top. `condense` is the one free-text path,
/// used only to shorten findings for progress reporting.
#[async_trait]
pub trait ContentProposer: Send + Sync {
    async fn propose(&self, request: ProposalRequest) -> Result<serde_json::Value, ProposerError>;

    async fn condense(&self, prompt: &str, max_tokens: u32) -> Result<String, ProposerError>;
}

/// Request a proposal and deserialize it into the loop's response type.
pub async fn propose_typed<T: DeserializeOwned>(
    proposer: &dyn ContentProposer,
    request: ProposalRequest,
) -> Result<T, ProposerError> {
    let tool_name = request.tool.name.clone();
    let value = proposer.propose(request).await?;
    serde_json::from_value(value).map_err(|e| ProposerError::malformed(tool_name, e.to_string()))
}

/// [`ContentProposer`] over an injected LLM client (possibly a fallback
/// chain). This is the only production implementation.
pub struct LlmProposer {
    llm: Arc<dyn LlmClient>,
}

impl LlmProposer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentProposer for LlmProposer {
    async fn propose(&self, request: ProposalRequest) -> Result<serde_json::Value, ProposerError> {
        let tool_name = request.tool.name.clone();
        debug!(tool = %tool_name, "propose: called");

        let completion = CompletionRequest {
            system_prompt: request.system_prompt,
            messages: request.messages,
            tools: vec![request.tool],
            max_tokens: request.max_tokens,
        };

        let response = self.llm.complete(completion).await?;

        if let Some(call) = response.tool_calls.into_iter().find(|c| c.name == tool_name) {
            return Ok(call.input);
        }

        // Some models answer with the JSON inline instead of calling the tool.
        if let Some(content) = &response.content
            && let Ok(value) = serde_json::from_str::<serde_json::Value>(content)
            && value.is_object()
        {
            debug!(tool = %tool_name, "propose: recovered JSON object from text content");
            return Ok(value);
        }

        Err(ProposerError::malformed(tool_name, "response contained no submit tool call"))
    }

    async fn condense(&self, prompt: &str, max_tokens: u32) -> Result<String, ProposerError> {
        debug!(prompt_len = prompt.len(), "condense: called");
        let completion = CompletionRequest {
            system_prompt: "You condense reference text. Reply with the condensed text only.".to_string(),
            messages: vec![Message::user(prompt)],
            tools: vec![],
            max_tokens,
        };

        let response = self.llm.complete(completion).await?;
        response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProposerError::malformed("condense", "empty completion"))
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Scripted proposer for unit tests: responses are queued per tool name,
    /// so concurrent loops can't race each other's scripts.
    pub struct MockProposer {
        by_tool: Mutex<HashMap<String, VecDeque<serde_json::Value>>>,
        condense_reply: String,
        call_count: AtomicUsize,
    }

    impl MockProposer {
        pub fn new() -> Self {
            Self {
                by_tool: Mutex::new(HashMap::new()),
                condense_reply: "condensed".to_string(),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn enqueue(self, tool: &str, value: serde_json::Value) -> Self {
            self.by_tool
                .lock()
                .unwrap()
                .entry(tool.to_string())
                .or_default()
                .push_back(value);
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentProposer for MockProposer {
        async fn propose(&self, request: ProposalRequest) -> Result<serde_json::Value, ProposerError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.by_tool
                .lock()
                .unwrap()
                .get_mut(&request.tool.name)
                .and_then(|queue| queue.pop_front())
                .ok_or_else(|| ProposerError::malformed(request.tool.name, "no scripted response"))
        }

        async fn condense(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ProposerError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.condense_reply.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, StopReason, TokenUsage, ToolCall};

    fn submit_tool() -> ToolDefinition {
        ToolDefinition::new("submit_queries", "Submit queries", serde_json::json!({"type": "object"}))
    }

    fn request() -> ProposalRequest {
        ProposalRequest {
            system_prompt: "plan".into(),
            messages: vec![Message::user("go")],
            tool: submit_tool(),
            max_tokens: 1000,
        }
    }

    fn tool_response(name: &str, input: serde_json::Value) -> CompletionResponse {
        CompletionResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "tc_1".into(),
                name: name.into(),
                input,
            }],
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    #[tokio::test]
    async fn test_propose_returns_tool_input() {
        let llm = Arc::new(MockLlmClient::new(vec![tool_response(
            "submit_queries",
            serde_json::json!({"queries": [{"rationale": "r", "query": "q"}]}),
        )]));
        let proposer = LlmProposer::new(llm);

        let value = proposer.propose(request()).await.unwrap();
        assert_eq!(value["queries"][0]["query"], "q");
    }

    #[tokio::test]
    async fn test_missing_tool_call_without_json_is_malformed() {
        let llm = Arc::new(MockLlmClient::new(vec![CompletionResponse {
            content: Some("I couldn't decide".into()),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }]));
        let proposer = LlmProposer::new(llm);

        let err = proposer.propose(request()).await.unwrap_err();
        assert!(matches!(err, ProposerError::MalformedOutput { .. }));
    }

    #[tokio::test]
    async fn test_inline_json_object_is_recovered() {
        let llm = Arc::new(MockLlmClient::new(vec![CompletionResponse {
            content: Some(r#"{"queries": []}"#.into()),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }]));
        let proposer = LlmProposer::new(llm);

        let value = proposer.propose(request()).await.unwrap();
        assert!(value["queries"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_propose_typed_rejects_shape_mismatch() {
        #[derive(serde::Deserialize)]
        struct Expected {
            #[allow(dead_code)]
            queries: Vec<String>,
        }

        let llm = Arc::new(MockLlmClient::new(vec![tool_response(
            "submit_queries",
            serde_json::json!({"nope": true}),
        )]));
        let proposer = LlmProposer::new(llm);

        let result = propose_typed::<Expected>(&proposer, request()).await;
        assert!(matches!(result, Err(ProposerError::MalformedOutput { .. })));
    }

    #[tokio::test]
    async fn test_condense_requires_nonempty_content() {
        let llm = Arc::new(MockLlmClient::new(vec![CompletionResponse {
            content: Some("   ".into()),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }]));
        let proposer = LlmProposer::new(llm);

        assert!(proposer.condense("summarize this", 500).await.is_err());
    }
}
