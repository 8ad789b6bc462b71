//! Chat turn handling and the interactive loop.
//!
//! Each turn:
//! 1. Fetches the meta-tool plus tools relevant to the user's input
//! 2. Calls inference with those tools
//! 3. Dispatches tool calls (tool creation, or the execution placeholder)
//! 4. Records the exchange in the conversation history

use crate::agent::{context, system_prompt};
use crate::catalog::{ToolCatalog, META_TOOL_NAME};
use crate::config::ToolsmithConfig;
use crate::llm::{ChatRequest, CompletionBackend};
use crate::types::*;
use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Agent answering chat turns with tools from the catalog.
pub struct Agent {
    catalog: Arc<ToolCatalog>,
    completion: Arc<dyn CompletionBackend>,
    model: String,
    max_tools: usize,
    max_tokens: u32,
    temperature: f64,
}

impl Agent {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        completion: Arc<dyn CompletionBackend>,
        config: &ToolsmithConfig,
    ) -> Self {
        Self {
            catalog,
            completion,
            model: config.model.clone(),
            max_tools: config.max_tools,
            max_tokens: config.max_tokens,
            temperature: config.chat_temperature,
        }
    }

    /// Handle one user turn and return the reply text.
    ///
    /// The user input and the reply are appended to `history`.
    pub async fn handle_turn(&self, input: &str, history: &mut Vec<ChatMessage>) -> Result<String> {
        let tools = self.catalog.get_available_tools(input, self.max_tools).await?;
        let prompt = system_prompt::build_system_prompt(&tools);
        let messages = context::build_messages(&prompt, history, input);

        let request = ChatRequest::new(&self.model, messages)
            .tools(tools)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature);
        let response = self.completion.chat(&request).await?;

        let mut parts = Vec::new();
        if let Some(text) = response.content.filter(|c| !c.trim().is_empty()) {
            parts.push(text);
        }
        for call in &response.tool_calls {
            info!("Tool call: {}({})", call.name, call.arguments);
            parts.push(self.dispatch(call).await);
        }
        let reply = parts.join("\n");

        history.push(ChatMessage::user(input));
        history.push(ChatMessage::assistant(reply.clone()));
        context::trim_history(history);

        Ok(reply)
    }

    /// Run a single tool call and describe the result.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        if call.name != META_TOOL_NAME {
            return execute_generated_tool(call);
        }

        let task = call
            .arguments
            .get("task_description")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if task.trim().is_empty() {
            return "Error: missing 'task_description' argument".into();
        }
        let suggested_name = call.arguments.get("suggested_name").and_then(|v| v.as_str());

        match self.catalog.execute_tool_creation(task, suggested_name).await {
            CreationOutcome::Created(def) => format!(
                "Created tool '{}' (id: {})",
                def.name,
                def.id.as_deref().unwrap_or_default()
            ),
            CreationOutcome::Failed { error } => format!("Error: {}", error),
        }
    }
}

/// Placeholder for running LLM-generated tools.
fn execute_generated_tool(call: &ToolCall) -> String {
    warn!("No executor for tool '{}'", call.name);
    format!(
        "Tool '{}' was selected, but executing generated tools is not implemented yet.",
        call.name
    )
}

/// Read user lines from `input` and answer each until `exit`, end of input,
/// or cancellation.
pub async fn run_chat_loop<R, W>(
    agent: &Agent,
    input: R,
    mut output: W,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut history: Vec<ChatMessage> = Vec::new();

    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = match agent.handle_turn(input, &mut history).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Turn failed: {:#}", e);
                format!("Sorry, something went wrong handling that request ({})", e)
            }
        };
        output.write_all(format!("{}\n", reply).as_bytes()).await?;
    }

    output.write_all(b"\nBye.\n").await?;
    output.flush().await?;
    info!("Chat loop exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSettings, META_TOOL_ID};
    use crate::embedding::testing::BagOfWords;
    use crate::llm::testing::ScriptedBackend;
    use crate::store::MemoryStore;
    use serde_json::json;

    const WEATHER_BLOCK: &str = "```json\n{\"name\":\"get_current_weather\",\"description\":\"Get the weather for a city\",\"parameters\":{\"type\":\"object\",\"properties\":{\"city\":{\"type\":\"string\"}},\"required\":[\"city\"]}}\n```";

    /// One backend serves both the chat turns and tool synthesis, in call order.
    fn agent(backend: Arc<ScriptedBackend>) -> (Agent, Arc<ToolCatalog>) {
        let catalog = Arc::new(
            ToolCatalog::new(Arc::new(MemoryStore::new()), CatalogSettings::default())
                .with_embedder(Arc::new(BagOfWords))
                .with_completion(backend.clone()),
        );
        let agent = Agent::new(catalog.clone(), backend, &ToolsmithConfig::default());
        (agent, catalog)
    }

    fn tool_call(name: &str, arguments: serde_json::Value) -> InferenceResponse {
        InferenceResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                name: name.into(),
                arguments,
            }],
            usage: TokenUsage::default(),
        }
    }

    #[tokio::test]
    async fn test_plain_reply_is_returned_and_recorded() {
        let backend = Arc::new(ScriptedBackend::new().reply_text("Hello there"));
        let (agent, _) = agent(backend.clone());
        let mut history = Vec::new();

        let reply = agent.handle_turn("hi", &mut history).await.unwrap();
        assert_eq!(reply, "Hello there");
        assert_eq!(history.len(), 2);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].tools[0].id.as_deref(), Some(META_TOOL_ID));
        assert_eq!(requests[0].messages[0].role, ChatRole::System);
    }

    #[tokio::test]
    async fn test_meta_tool_call_creates_tool() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .reply(tool_call(
                    META_TOOL_NAME,
                    json!({"task_description": "weather lookup by city", "suggested_name": "get_current_weather"}),
                ))
                .reply_text(WEATHER_BLOCK),
        );
        let (agent, catalog) = agent(backend.clone());
        let mut history = Vec::new();

        let reply = agent
            .handle_turn("what's the weather in Oslo?", &mut history)
            .await
            .unwrap();
        assert!(reply.starts_with("Created tool 'get_current_weather' (id: tool_"));
        assert_eq!(catalog.count().await.unwrap(), 2);
        assert_eq!(backend.request_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_creation_is_prefixed_error() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .reply(tool_call(META_TOOL_NAME, json!({"task_description": "x"})))
                .reply_text("no json here"),
        );
        let (agent, catalog) = agent(backend);
        let reply = agent.handle_turn("do x", &mut Vec::new()).await.unwrap();
        assert!(reply.starts_with("Error: "));
        assert_eq!(catalog.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_meta_tool_call_without_task_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new());
        let (agent, _) = agent(backend.clone());
        let call = ToolCall {
            id: "c".into(),
            name: META_TOOL_NAME.into(),
            arguments: json!({}),
        };
        assert_eq!(
            agent.dispatch(&call).await,
            "Error: missing 'task_description' argument"
        );
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_other_tools_hit_placeholder() {
        let backend = Arc::new(
            ScriptedBackend::new().reply(tool_call("get_current_weather", json!({"city": "Oslo"}))),
        );
        let (agent, _) = agent(backend);
        let reply = agent.handle_turn("weather?", &mut Vec::new()).await.unwrap();
        assert!(reply.contains("not implemented yet"));
    }

    #[tokio::test]
    async fn test_chat_loop_answers_until_exit() {
        let backend = Arc::new(ScriptedBackend::new().reply_text("first answer"));
        let (agent, _) = agent(backend.clone());
        let input: &[u8] = b"hello\n\nexit\nnever read\n";
        let mut output = Vec::new();

        run_chat_loop(&agent, input, &mut output, CancellationToken::new())
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("first answer"));
        assert!(text.ends_with("Bye.\n"));
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_chat_loop_apologises_on_turn_error() {
        let backend = Arc::new(ScriptedBackend::new().fail("model offline"));
        let (agent, _) = agent(backend);
        let input: &[u8] = b"hello\n";
        let mut output = Vec::new();

        run_chat_loop(&agent, input, &mut output, CancellationToken::new())
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Sorry, something went wrong"));
        assert!(text.contains("model offline"));
        assert!(!text.contains('\x1b'));
    }

    #[tokio::test]
    async fn test_chat_loop_stops_when_cancelled() {
        let backend = Arc::new(ScriptedBackend::new());
        let (agent, _) = agent(backend.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (_client, server) = tokio::io::duplex(64);
        let reader = tokio::io::BufReader::new(server);
        let mut output = Vec::new();
        run_chat_loop(&agent, reader, &mut output, cancel).await.unwrap();
        assert_eq!(backend.request_count(), 0);
    }
}
