//! Tool synthesis: prompt construction and strict parsing of the model's
//! JSON answer into a [`ToolDefinition`].

use crate::error::{CatalogError, Result};
use crate::types::ToolDefinition;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(.*?)\s*\n```").expect("fenced JSON pattern is valid")
});

/// Build the prompt asking the model for exactly one tool definition.
pub fn build_creation_prompt(task_description: &str, suggested_name: Option<&str>) -> String {
    let name_hint = match suggested_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!(
            "Use the name `{}` for the tool unless it is clearly unsuitable.",
            name
        ),
        None => "Choose a short, descriptive snake_case name for the tool.".to_string(),
    };

    format!(
        r#"You design tool definitions for an AI agent.

Create ONE tool that accomplishes the following task:

{task}

{name_hint}

Respond with exactly one JSON object inside a ```json fenced code block and nothing else.
The object must have these keys:
- "name": snake_case identifier for the tool
- "description": one or two sentences explaining what the tool does and when to use it
- "parameters": a JSON Schema object with "type": "object", a "properties" map from
  parameter name to its schema (each with "type" and "description"), and a "required"
  array listing the mandatory parameters

Example:
```json
{{
  "name": "get_current_weather",
  "description": "Get the current weather for a city.",
  "parameters": {{
    "type": "object",
    "properties": {{
      "city": {{"type": "string", "description": "City name"}}
    }},
    "required": ["city"]
  }}
}}
```"#,
        task = task_description.trim(),
        name_hint = name_hint,
    )
}

/// Pull the JSON text out of a completion.
///
/// Prefers the first ```json fenced block, closed by a fence at the start of
/// a line; otherwise accepts the whole
/// response only when it is already a bare `{...}` object.
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(caps) = FENCED_JSON.captures(response) {
        if let Some(body) = caps.get(1) {
            return Ok(body.as_str());
        }
    }

    let trimmed = response.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Ok(trimmed);
    }

    Err(CatalogError::GenerationFormat(
        "expected a ```json fenced block or a bare JSON object".into(),
    ))
}

/// Parse extracted text, keeping the raw text on failure.
pub fn parse_json(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| CatalogError::GenerationParse {
        message: e.to_string(),
        raw: text.to_string(),
    })
}

/// Check the generated object and turn it into a definition.
///
/// Only `name`, `description` and `parameters` are taken from the model; any
/// `id` or `type` it emitted is dropped so the catalog assigns fresh ones.
pub fn validate_definition(value: &Value) -> Result<ToolDefinition> {
    let obj = value
        .as_object()
        .ok_or_else(|| CatalogError::Validation("expected a JSON object".into()))?;

    let missing: Vec<&str> = ["name", "description", "parameters"]
        .into_iter()
        .filter(|k| !obj.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(CatalogError::Validation(format!(
            "missing required keys: {}",
            missing.join(", ")
        )));
    }

    let name = non_empty_str(obj, "name")?;
    let description = non_empty_str(obj, "description")?;

    let parameters = &obj["parameters"];
    let params = parameters
        .as_object()
        .ok_or_else(|| CatalogError::Validation("'parameters' must be an object".into()))?;
    for key in ["type", "properties"] {
        if !params.contains_key(key) {
            return Err(CatalogError::Validation(format!(
                "'parameters' is missing '{}'",
                key
            )));
        }
    }

    Ok(ToolDefinition::new(name, description, parameters.clone()))
}

fn non_empty_str<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Result<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CatalogError::Validation(format!("'{}' must be a non-empty string", key)))
}

/// Extract, parse and validate a raw completion in one go.
pub fn definition_from_completion(response: &str) -> Result<ToolDefinition> {
    let text = extract_json(response)?;
    let value = parse_json(text)?;
    validate_definition(&value)
}
