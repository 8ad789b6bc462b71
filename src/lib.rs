//! Toolsmith: tool retrieval and synthesis for LLM agents.
//!
//! Keeps a catalog of tool definitions in a vector store, serves the tools
//! relevant to a request (always led by the `create_new_tool` meta-tool), and
//! creates new tool definitions on demand from a completion backend.

pub mod agent;
pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod store;
pub mod synthesis;
pub mod types;

pub use catalog::{CatalogSettings, ToolCatalog};
pub use error::{CatalogError, StoreError};
pub use types::{CreationOutcome, ToolDefinition, ToolKind};
