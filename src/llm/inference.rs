//! Chat completions over an OpenAI-compatible HTTP API.
//!
//! Supports tool-use (function calling) in the OpenAI-compatible format.

use super::{ChatRequest, CompletionBackend};
use crate::types::*;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Inference client for any server exposing `/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: Vec<MessagePayload<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolPayload<'a>>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolPayload<'a> {
    r#type: &'a str,
    function: FunctionPayload<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionPayload<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolCallPayload {
    id: String,
    function: FunctionCallPayload,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionCallPayload {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallPayload>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl InferenceClient {
    /// Create a new inference client. An empty `api_key` sends no auth header.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }
}

fn build_payload<'a>(request: &'a ChatRequest) -> ChatPayload<'a> {
    let messages = request
        .messages
        .iter()
        .map(|m| MessagePayload {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect();

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(|t| ToolPayload {
                    r#type: "function",
                    function: FunctionPayload {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
        )
    };

    ChatPayload {
        model: &request.model,
        messages,
        tools,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

fn into_response(body: ChatResponse) -> InferenceResponse {
    let Some(choice) = body.choices.into_iter().next() else {
        return InferenceResponse::default();
    };

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|tc| {
            let arguments = serde_json::from_str(&tc.function.arguments).unwrap_or_else(|e| {
                warn!("Tool call '{}' has malformed arguments: {}", tc.function.name, e);
                serde_json::Value::Object(Default::default())
            });
            ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments,
            }
        })
        .collect();

    let usage = body
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    InferenceResponse {
        content: choice.message.content,
        tool_calls,
        usage,
    }
}

#[async_trait]
impl CompletionBackend for InferenceClient {
    async fn chat(&self, request: &ChatRequest) -> Result<InferenceResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        debug!(
            "Inference request to model: {} ({} messages, {} tools)",
            request.model,
            request.messages.len(),
            request.tools.len()
        );

        let mut builder = self.http.post(&url).json(&build_payload(request));
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let resp = builder.send().await.context("Inference request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Inference failed ({}): {}", status, body);
        }

        let body: ChatResponse = resp.json().await.context("Failed to parse inference response")?;
        Ok(into_response(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_omits_empty_tools() {
        let request = ChatRequest::new("m", vec![ChatMessage::user("hi")]).temperature(0.1);
        let value = serde_json::to_value(build_payload(&request)).unwrap();
        assert!(value.get("tools").is_none());
        assert_eq!(value["messages"], json!([{"role": "user", "content": "hi"}]));
        assert_eq!(value["temperature"], json!(0.1));
    }

    #[test]
    fn test_payload_wraps_tools_as_functions() {
        let tool = ToolDefinition::new("get_weather", "Weather", json!({"type": "object"}))
            .with_id("t1");
        let request = ChatRequest::new("m", vec![]).tools(vec![tool]);
        let value = serde_json::to_value(build_payload(&request)).unwrap();
        assert_eq!(
            value["tools"],
            json!([{
                "type": "function",
                "function": {
                    "name": "get_weather",
                    "description": "Weather",
                    "parameters": {"type": "object"}
                }
            }])
        );
    }

    #[test]
    fn test_response_decodes_tool_call_arguments() {
        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "create_new_tool",
                            "arguments": "{\"task_description\":\"weather\"}"
                        }
                    }]
                }
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
        }))
        .unwrap();

        let resp = into_response(body);
        assert!(resp.content.is_none());
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].arguments["task_description"], "weather");
        assert_eq!(resp.usage.total_tokens, 7);
    }

    #[test]
    fn test_malformed_arguments_become_empty_object() {
        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": "x",
                    "tool_calls": [{
                        "id": "c",
                        "function": {"name": "f", "arguments": "{not json"}
                    }]
                }
            }]
        }))
        .unwrap();
        let resp = into_response(body);
        assert_eq!(resp.tool_calls[0].arguments, json!({}));
    }

    #[test]
    fn test_no_choices_is_empty_response() {
        let body: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        let resp = into_response(body);
        assert!(resp.content.is_none());
        assert!(resp.tool_calls.is_empty());
    }
}
