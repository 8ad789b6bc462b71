//! Configuration schema for toolsmith.toml.

use serde::{Deserialize, Serialize};

use crate::store::Distance;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsmithConfig {
    /// Chroma server base URL.
    pub chroma_url: String,

    /// Collection holding the tool definitions.
    pub collection_name: String,

    /// Distance metric for the collection.
    pub distance: Distance,

    /// OpenAI-compatible embeddings endpoint base URL.
    pub embedding_api_url: String,

    /// Embedding credential. Empty disables similarity search.
    pub embedding_api_key: String,

    /// Embedding model name.
    pub embedding_model: String,

    /// OpenAI-compatible chat completions base URL.
    pub llm_api_url: String,

    /// Completion credential (may be empty for local servers).
    pub llm_api_key: String,

    /// Model used for both chat turns and tool synthesis.
    pub model: String,

    /// Maximum tokens per completion.
    pub max_tokens: u32,

    /// Sampling temperature for tool synthesis.
    pub synthesis_temperature: f64,

    /// Sampling temperature for chat turns.
    pub chat_temperature: f64,

    /// Relevant tools offered per turn, in addition to the meta-tool.
    pub max_tools: usize,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for ToolsmithConfig {
    fn default() -> Self {
        Self {
            chroma_url: "http://localhost:8000".into(),
            collection_name: "tools".into(),
            distance: Distance::Cosine,
            embedding_api_url: "https://api.openai.com".into(),
            embedding_api_key: String::new(),
            embedding_model: "text-embedding-3-small".into(),
            llm_api_url: "http://localhost:11434".into(),
            llm_api_key: String::new(),
            model: "llama3.1".into(),
            max_tokens: 2048,
            synthesis_temperature: 0.1,
            chat_temperature: 0.7,
            max_tools: 5,
            log_level: "info".into(),
        }
    }
}

/// Environment variables recognised as overrides.
pub const ENV_OVERRIDES: &[&str] = &[
    "CHROMA_URL",
    "TOOLSMITH_COLLECTION",
    "EMBEDDING_API_URL",
    "OPENAI_API_KEY",
    "EMBEDDING_MODEL",
    "LLM_BASE_URL",
    "LLM_API_KEY",
    "LLM_MODEL",
];

impl ToolsmithConfig {
    /// Apply environment-style overrides through `lookup`.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// clobber a file setting.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ENV_OVERRIDES {
            let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            match *key {
                "CHROMA_URL" => self.chroma_url = value,
                "TOOLSMITH_COLLECTION" => self.collection_name = value,
                "EMBEDDING_API_URL" => self.embedding_api_url = value,
                "OPENAI_API_KEY" => self.embedding_api_key = value,
                "EMBEDDING_MODEL" => self.embedding_model = value,
                "LLM_BASE_URL" => self.llm_api_url = value,
                "LLM_API_KEY" => self.llm_api_key = value,
                "LLM_MODEL" => self.model = value,
                _ => {}
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Whether an embedding credential is configured.
    pub fn embeddings_enabled(&self) -> bool {
        !self.embedding_api_key.trim().is_empty()
    }
}
