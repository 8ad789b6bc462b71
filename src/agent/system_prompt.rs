//! System prompt for chat turns.
//!
//! Layers (in order):
//! 1. Role (what the assistant is)
//! 2. Tool policy (when to call which tool)
//! 3. Available tool names for this turn

use crate::catalog::META_TOOL_NAME;
use crate::types::ToolDefinition;

const ROLE: &str = r#"
# Role

You are a helpful assistant that accomplishes tasks by calling tools.
Each turn you are offered a small set of tools relevant to the user's request.
"#;

/// Build the system prompt for one turn.
pub fn build_system_prompt(tools: &[ToolDefinition]) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(ROLE);

    prompt.push_str("\n# Tool Policy\n\n");
    prompt.push_str("Call an existing tool when one fits the request.\n");
    prompt.push_str(&format!(
        "If none of them can do the job, call `{}` with a detailed task description \
         so a suitable tool gets created.\n",
        META_TOOL_NAME
    ));
    prompt.push_str("Answer directly when no tool is needed.\n");

    if !tools.is_empty() {
        prompt.push_str("\n# Available Tools\n\n");
        for tool in tools {
            prompt.push_str(&format!("- `{}`: {}\n", tool.name, tool.description));
        }
    }

    prompt
}
