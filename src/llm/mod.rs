//! Completion backend seam and its OpenAI-compatible implementation.

pub mod inference;

pub use inference::InferenceClient;

use crate::types::{ChatMessage, InferenceResponse, ToolDefinition};
use anyhow::Result;
use async_trait::async_trait;

/// One chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            max_tokens: 2048,
            temperature: 0.7,
        }
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Anything that can answer a chat completion request.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<InferenceResponse>;
}
