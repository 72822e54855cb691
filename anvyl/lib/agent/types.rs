use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AnvylResult;

//--------------------------------------------------------------------------------------------------
// Types: Provider Wire
//--------------------------------------------------------------------------------------------------

/// One message in an OpenAI-compatible chat conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user`, `assistant` or `tool`.
    pub role: String,

    /// Text content; absent on pure tool-call turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool invocations requested by the assistant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallMessage>>,

    /// For `tool` messages: the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A tool invocation inside an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMessage {
    /// Provider-assigned call id.
    pub id: String,

    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// The function being invoked.
    pub function: FunctionCall,
}

/// The function half of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Tool name.
    pub name: String,

    /// Arguments as a JSON-encoded string, the way providers send them.
    pub arguments: String,
}

/// A tool definition as fetched from the MCP catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentToolDef {
    /// Tool name.
    pub name: String,

    /// One-line description.
    pub description: String,

    /// JSON schema of the arguments object.
    pub input_schema: Value,
}

//--------------------------------------------------------------------------------------------------
// Types: API Surface
//--------------------------------------------------------------------------------------------------

/// Request body for `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The natural-language instruction.
    pub query: String,

    /// Optional target host. Pass-through into the system prompt only;
    /// cross-host execution is not implemented.
    #[serde(default)]
    pub host_id: Option<String>,
}

/// Response body for `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The model's final textual reply.
    pub reply: String,

    /// Every tool invocation made while answering, in order.
    pub tool_calls: Vec<ToolCallRecord>,

    /// The model that produced the reply.
    pub model: String,
}

/// One entry of the tool-call trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name.
    pub name: String,

    /// Arguments the model supplied.
    pub arguments: Value,

    /// The tool result (or a short error string) relayed to the model.
    pub result: String,
}

/// Response body for `GET /info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfoResponse {
    /// Model in use.
    pub model: String,

    /// Model provider base URL.
    pub provider_url: String,

    /// MCP server URL the agent routes tools through.
    pub mcp_url: String,

    /// Names of the available tools.
    pub tools: Vec<String>,
}

/// Request body for `POST /hosts` (record a known remote host).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddKnownHostRequest {
    /// Host id.
    pub host_id: String,

    /// Host address.
    pub host_ip: String,
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// The chat-completions seam, so the orchestration loop is testable with a
/// scripted provider.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// One chat-completions round trip; returns the assistant message.
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> AnvylResult<ChatMessage>;
}

/// The tool-invocation seam over the MCP server.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Fetches the advertised tool catalog.
    async fn list_tools(&self) -> AnvylResult<Vec<AgentToolDef>>;

    /// Invokes one tool and returns its text result.
    async fn call_tool(&self, name: &str, arguments: &Value) -> AnvylResult<String>;
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Renders a tool catalog in the provider's chat-completions `tools` format.
pub fn to_provider_tools(tools: &[AgentToolDef]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                },
            })
        })
        .collect()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
