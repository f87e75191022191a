//! OpenAI chat-completions client, used as the fallback provider

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Role, StopReason, TokenUsage, ToolCall};
use crate::config::LlmConfig;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// OpenAI API client
pub struct OpenAiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key()?;
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, "build_request_body: called");
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];

        for msg in &request.messages {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(serde_json::json!({
                "role": role,
                "content": msg.content,
            }));
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": request.max_tokens.min(self.max_tokens),
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request.tools.iter().map(|t| t.to_openai_schema()).collect::<Vec<_>>());
            body["tool_choice"] = serde_json::json!("auto");
        }

        body
    }

    fn parse_response(&self, api_response: OpenAiResponse) -> Result<CompletionResponse, LlmError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

        let mut tool_calls = Vec::new();
        for call in choice.message.tool_calls.unwrap_or_default() {
            // Arguments arrive as a JSON-encoded string
            let input: serde_json::Value = serde_json::from_str(&call.function.arguments)?;
            tool_calls.push(ToolCall {
                id: call.id,
                name: call.function.name,
                input,
            });
        }

        Ok(CompletionResponse {
            content: choice.message.content,
            tool_calls,
            stop_reason: StopReason::from_openai(&choice.finish_reason),
            usage: TokenUsage {
                input_tokens: api_response.usage.prompt_tokens,
                output_tokens: api_response.usage.completion_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "complete: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "complete: retryable error");
                last_error = Some(LlmError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError { status, message: text });
            }

            let api_response: OpenAiResponse = response.json().await?;
            return self.parse_response(api_response);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: OpenAiUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn test_client() -> OpenAiClient {
        OpenAiClient {
            model: "gpt-4.1".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            max_tokens: 8192,
        }
    }

    #[test]
    fn test_system_prompt_becomes_first_message() {
        let request = CompletionRequest {
            system_prompt: "You plan trips".to_string(),
            messages: vec![Message::user("go")],
            tools: vec![],
            max_tokens: 500,
        };

        let body = test_client().build_request_body(&request);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_tokens"], 500);
    }

    #[test]
    fn test_parse_response_decodes_string_arguments() {
        let api_response: OpenAiResponse = serde_json::from_value(serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {
                            "name": "submit_queries",
                            "arguments": "{\"queries\":[]}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7}
        }))
        .unwrap();

        let parsed = test_client().parse_response(api_response).unwrap();
        assert_eq!(parsed.stop_reason, StopReason::ToolUse);
        assert_eq!(parsed.tool_calls[0].input, serde_json::json!({"queries": []}));
    }

    #[test]
    fn test_parse_response_requires_a_choice() {
        let api_response: OpenAiResponse = serde_json::from_value(serde_json::json!({
            "choices": [],
            "usage": {"prompt_tokens": 0, "completion_tokens": 0}
        }))
        .unwrap();

        assert!(test_client().parse_response(api_response).is_err());
    }
}
