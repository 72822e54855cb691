//! The tool-call orchestration loop.
//!
//! One `/query` request runs one loop: call the provider, execute any tool
//! calls it requests through the MCP transport, feed the results back, and
//! stop on the first reply with no tool calls or when the iteration budget
//! runs out. Per-tool failures are relayed to the model as the tool result;
//! the loop never retries a tool call on its own.

use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::AnvylResult;

use super::{
    to_provider_tools, AgentToolDef, ChatMessage, ChatProvider, QueryResponse, ToolCallRecord,
    ToolTransport,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The agent orchestrator, generic over its provider and tool transport.
pub struct AgentRunner<P, T> {
    provider: P,
    transport: T,
    model: String,
    max_iterations: u32,

    /// The tool catalog, fetched once per service lifetime.
    catalog: OnceCell<Vec<AgentToolDef>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<P, T> AgentRunner<P, T>
where
    P: ChatProvider,
    T: ToolTransport,
{
    /// Creates a runner.
    pub fn new(provider: P, transport: T, model: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            provider,
            transport,
            model: model.into(),
            max_iterations,
            catalog: OnceCell::new(),
        }
    }

    /// The model this runner asks for.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The cached tool catalog, fetching it on first use.
    pub async fn catalog(&self) -> AnvylResult<&[AgentToolDef]> {
        let tools = self
            .catalog
            .get_or_try_init(|| self.transport.list_tools())
            .await?;
        Ok(tools)
    }

    /// Answers one natural-language query.
    pub async fn query(&self, query: &str, host_id: Option<&str>) -> AnvylResult<QueryResponse> {
        let tools = self.catalog().await?;
        let tool_schemas = to_provider_tools(tools);

        let mut messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: Some(system_prompt(tools, host_id)),
                ..Default::default()
            },
            ChatMessage {
                role: "user".to_string(),
                content: Some(query.to_string()),
                ..Default::default()
            },
        ];

        let mut trace: Vec<ToolCallRecord> = Vec::new();

        for _ in 0..self.max_iterations {
            let reply = self
                .provider
                .chat(&self.model, &messages, &tool_schemas)
                .await?;

            let calls = reply.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                return Ok(QueryResponse {
                    reply: reply.content.unwrap_or_default(),
                    tool_calls: trace,
                    model: self.model.clone(),
                });
            }

            messages.push(reply);

            for call in calls {
                let arguments: Value =
                    serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| json!({}));

                let result = match self
                    .transport
                    .call_tool(&call.function.name, &arguments)
                    .await
                {
                    Result::Ok(text) => text,
                    // The model is expected to handle the failure or retry.
                    Err(error) => format!("tool error: {}", error),
                };

                trace.push(ToolCallRecord {
                    name: call.function.name.clone(),
                    arguments,
                    result: result.clone(),
                });

                messages.push(ChatMessage {
                    role: "tool".to_string(),
                    content: Some(result),
                    tool_call_id: Some(call.id),
                    ..Default::default()
                });
            }
        }

        Ok(QueryResponse {
            reply: format!(
                "exceeded tool-call budget after {} iterations without a final answer",
                self.max_iterations
            ),
            tool_calls: trace,
            model: self.model.clone(),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Builds the fixed system preamble, naming the available tools.
fn system_prompt(tools: &[AgentToolDef], host_id: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are Anvyl, an autonomous infrastructure agent managing Docker containers \
         and hosts on a single node.\n\
         \n\
         Use the available tools to carry out the user's instruction, then answer with \
         the results, including relevant ids, statuses and metrics. Always fetch real \
         information with the tools; never invent data. If a tool fails, report what \
         happened and suggest a next step. Work autonomously: never ask follow-up \
         questions.\n\
         \n\
         Available tools:\n",
    );

    for tool in tools {
        prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
    }

    if let Some(host_id) = host_id {
        prompt.push_str(&format!(
            "\nThe user asked to target host '{}'. Cross-host execution is not \
             implemented; if that host is not the local one, say so in your reply.\n",
            host_id
        ));
    }

    prompt
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{AnvylError, AnvylResult};

    /// A provider that plays back a scripted sequence of assistant messages.
    struct ScriptedProvider {
        script: Mutex<Vec<ChatMessage>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(script: Vec<ChatMessage>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: &[Value],
        ) -> AnvylResult<ChatMessage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                // Past the end of the script: keep requesting the same tool.
                return Ok(tool_call_message("list_containers", "{}"));
            }
            Ok(script.remove(0))
        }
    }

    /// A transport that records invocations and returns canned results.
    #[derive(Default)]
    struct RecordingTransport {
        fail_tools: Vec<String>,
        invocations: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolTransport for RecordingTransport {
        async fn list_tools(&self) -> AnvylResult<Vec<AgentToolDef>> {
            Ok(vec![AgentToolDef {
                name: "list_containers".to_string(),
                description: "List containers".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            }])
        }

        async fn call_tool(&self, name: &str, _arguments: &Value) -> AnvylResult<String> {
            self.invocations.lock().unwrap().push(name.to_string());
            if self.fail_tools.iter().any(|t| t == name) {
                return Err(AnvylError::EngineUnavailable("engine is down".to_string()));
            }
            Ok("2 containers running".to_string())
        }
    }

    fn tool_call_message(name: &str, arguments: &str) -> ChatMessage {
        ChatMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(vec![super::super::ToolCallMessage {
                id: "call_1".to_string(),
                kind: "function".to_string(),
                function: super::super::FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }]),
            tool_call_id: None,
        }
    }

    fn final_message(text: &str) -> ChatMessage {
        ChatMessage {
            role: "assistant".to_string(),
            content: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_tool_round_trip_produces_trace() {
        let provider = ScriptedProvider::new(vec![
            tool_call_message("list_containers", "{\"all\": true}"),
            final_message("There are 2 containers."),
        ]);
        let runner = AgentRunner::new(provider, RecordingTransport::default(), "test-model", 8);

        let response = runner.query("how many containers?", None).await.unwrap();
        assert_eq!(response.reply, "There are 2 containers.");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "list_containers");
        assert_eq!(response.tool_calls[0].arguments, json!({"all": true}));
        assert_eq!(response.tool_calls[0].result, "2 containers running");
        assert_eq!(response.model, "test-model");
    }

    #[tokio::test]
    async fn test_direct_answer_needs_no_tools() {
        let provider = ScriptedProvider::new(vec![final_message("Hello!")]);
        let runner = AgentRunner::new(provider, RecordingTransport::default(), "test-model", 8);

        let response = runner.query("say hello", None).await.unwrap();
        assert_eq!(response.reply, "Hello!");
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_iteration_budget_is_enforced() {
        // An empty script makes the provider request tools forever.
        let provider = ScriptedProvider::new(vec![]);
        let runner = AgentRunner::new(provider, RecordingTransport::default(), "test-model", 3);

        let response = runner.query("loop forever", None).await.unwrap();
        assert!(response.reply.contains("exceeded tool-call budget"));
        assert_eq!(response.tool_calls.len(), 3);
        assert_eq!(runner.provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_tool_failure_is_relayed_not_fatal() {
        let provider = ScriptedProvider::new(vec![
            tool_call_message("list_containers", "{}"),
            final_message("The engine appears to be down."),
        ]);
        let transport = RecordingTransport {
            fail_tools: vec!["list_containers".to_string()],
            ..Default::default()
        };
        let runner = AgentRunner::new(provider, transport, "test-model", 8);

        let response = runner.query("list containers", None).await.unwrap();
        assert_eq!(response.reply, "The engine appears to be down.");
        assert!(response.tool_calls[0].result.contains("tool error"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_fall_back_to_empty_object() {
        let provider = ScriptedProvider::new(vec![
            tool_call_message("list_containers", "{not json"),
            final_message("done"),
        ]);
        let runner = AgentRunner::new(provider, RecordingTransport::default(), "test-model", 8);

        let response = runner.query("list", None).await.unwrap();
        assert_eq!(response.tool_calls[0].arguments, json!({}));
    }

    #[tokio::test]
    async fn test_host_id_lands_in_system_prompt() {
        let tools = vec![];
        let prompt = system_prompt(&tools, Some("remote-1"));
        assert!(prompt.contains("remote-1"));
        assert!(prompt.contains("not implemented"));
    }
}
