//! Shared types used across the catalog, the agent loop and the backends.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

/// Classification of a stored tool definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// The meta-tool. Never removed.
    Core,
    /// Synthesized from a completion.
    LlmGenerated,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core => write!(f, "core"),
            Self::LlmGenerated => write!(f, "llm_generated"),
        }
    }
}

impl ToolKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "core" => Some(Self::Core),
            "llm_generated" => Some(Self::LlmGenerated),
            _ => None,
        }
    }
}

/// A tool definition as stored in the catalog and exposed to the model.
///
/// `id` and `kind` are optional on input; the catalog fills them in on upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    /// JSON Schema object: `type`, `properties` and optionally `required`.
    pub parameters: serde_json::Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ToolKind>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            parameters,
            kind: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: ToolKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Text indexed for similarity search: `"<name>: <description>"`.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

/// Result of a tool synthesis request.
///
/// Failures are values, not errors: the agent loop turns them into a
/// conversational reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreationOutcome {
    Created(ToolDefinition),
    Failed { error: String },
}

impl CreationOutcome {
    pub fn tool(&self) -> Option<&ToolDefinition> {
        match self {
            Self::Created(def) => Some(def),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Created(_) => None,
            Self::Failed { error } => Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Inference types
// ---------------------------------------------------------------------------

/// A chat message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A tool call request from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Response from inference including potential tool calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
}

/// Token usage from an inference call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedding_text_joins_name_and_description() {
        let def = ToolDefinition::new("get_weather", "Look up the weather", json!({}));
        assert_eq!(def.embedding_text(), "get_weather: Look up the weather");
    }

    #[test]
    fn test_kind_serializes_under_type_key() {
        let def = ToolDefinition::new("t", "d", json!({"type": "object", "properties": {}}))
            .with_id("abc")
            .with_kind(ToolKind::LlmGenerated);
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["type"], "llm_generated");
        assert_eq!(value["id"], "abc");
    }

    #[test]
    fn test_missing_id_and_kind_are_omitted() {
        let def = ToolDefinition::new("t", "d", json!({}));
        let value = serde_json::to_value(&def).unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("type").is_none());
    }

    #[test]
    fn test_failed_outcome_serializes_as_error_object() {
        let outcome = CreationOutcome::Failed { error: "boom".into() };
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json!({"error": "boom"}));
        assert_eq!(outcome.error(), Some("boom"));
        assert!(outcome.tool().is_none());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(ToolKind::parse("core"), Some(ToolKind::Core));
        assert_eq!(ToolKind::parse("llm_generated"), Some(ToolKind::LlmGenerated));
        assert_eq!(ToolKind::parse("builtin"), None);
    }
}
