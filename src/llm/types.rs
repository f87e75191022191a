//! Provider-agnostic request/response types
//!
//! Modeled on the Anthropic Messages API but thin enough to map onto any
//! chat-completions provider. The planner only ever issues blocking,
//! single-shot completions - no conversation state lives here.

use serde::{Deserialize, Serialize};

/// Everything needed for one completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    /// Tools offered to the model. The proposer always offers exactly one
    /// submit tool; an empty list means free-text output.
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A tool offered to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Anthropic Messages API tool format
    pub fn to_anthropic_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema,
        })
    }

    /// OpenAI chat-completions function format
    pub fn to_openai_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    pub fn from_anthropic(s: &str) -> Self {
        match s {
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        }
    }

    pub fn from_openai(s: &str) -> Self {
        match s {
            "tool_calls" => StopReason::ToolUse,
            "length" => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token counts, for logging
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Free-text content, if any
    pub content: Option<String>,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hello");

        let msg = Message::assistant("hi");
        assert_eq!(msg.role, Role::Assistant);
    }

    #[test]
    fn test_stop_reason_mappings() {
        assert_eq!(StopReason::from_anthropic("tool_use"), StopReason::ToolUse);
        assert_eq!(StopReason::from_anthropic("end_turn"), StopReason::EndTurn);
        assert_eq!(StopReason::from_anthropic("whatever"), StopReason::EndTurn);
        assert_eq!(StopReason::from_openai("tool_calls"), StopReason::ToolUse);
        assert_eq!(StopReason::from_openai("length"), StopReason::MaxTokens);
    }

    #[test]
    fn test_tool_schemas() {
        let tool = ToolDefinition::new(
            "submit_queries",
            "Submit the query list",
            serde_json::json!({"type": "object"}),
        );

        let anthropic = tool.to_anthropic_schema();
        assert_eq!(anthropic["name"], "submit_queries");
        assert!(anthropic["input_schema"].is_object());

        let openai = tool.to_openai_schema();
        assert_eq!(openai["type"], "function");
        assert_eq!(openai["function"]["name"], "submit_queries");
    }
}
