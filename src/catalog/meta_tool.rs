//! The meta-tool: the one tool that creates other tools.

use crate::types::{ToolDefinition, ToolKind};
use serde_json::json;

pub const META_TOOL_ID: &str = "core_create_tool_001";
pub const META_TOOL_NAME: &str = "create_new_tool";

/// Hardcoded meta-tool definition, seeded into the catalog and used as the
/// fallback when it cannot be read back from storage.
pub fn meta_tool() -> ToolDefinition {
    ToolDefinition::new(
        META_TOOL_NAME,
        "Creates a new tool when none of the available tools can accomplish the \
         user's task. Describe in detail what the new tool should do, its inputs \
         and its expected output.",
        json!({
            "type": "object",
            "properties": {
                "task_description": {
                    "type": "string",
                    "description": "Detailed description of the task the new tool must perform"
                },
                "suggested_name": {
                    "type": "string",
                    "description": "Optional snake_case name for the new tool"
                }
            },
            "required": ["task_description"]
        }),
    )
    .with_id(META_TOOL_ID)
    .with_kind(ToolKind::Core)
}
