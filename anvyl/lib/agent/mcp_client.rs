use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    config::DEFAULT_MCP_TIMEOUT_SECS,
    mcp::{RpcId, RpcRequest, RpcResponse},
    AnvylError, AnvylResult,
};

use super::{AgentToolDef, ToolTransport};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// JSON-RPC client for the MCP server's HTTP transport.
#[derive(Debug, Clone)]
pub struct McpClient {
    url: String,
    http: reqwest::Client,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl McpClient {
    /// Creates a client against the MCP endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_MCP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            url: url.into(),
            http,
        }
    }

    /// One JSON-RPC round trip.
    async fn request(&self, method: &str, params: Value) -> AnvylResult<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(RpcId::Str(uuid::Uuid::new_v4().to_string())),
            method: method.to_string(),
            params: Some(params),
        };

        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            let reason = error
                .data
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or(error.message.as_str());
            return Err(AnvylError::Internal(format!(
                "mcp error {}: {}",
                error.code, reason
            )));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ToolTransport for McpClient {
    async fn list_tools(&self) -> AnvylResult<Vec<AgentToolDef>> {
        let result = self.request("tools/list", json!({})).await?;

        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AnvylError::Internal("mcp tools/list returned no tool array".to_string())
            })?
            .iter()
            .filter_map(|tool| {
                Some(AgentToolDef {
                    name: tool.get("name")?.as_str()?.to_string(),
                    description: tool
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    input_schema: tool
                        .get("input_schema")
                        .cloned()
                        .unwrap_or_else(|| json!({"type": "object"})),
                })
            })
            .collect();

        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> AnvylResult<String> {
        let result = self
            .request(
                "tools/call",
                json!({"name": name, "arguments": arguments}),
            )
            .await?;

        // MCP results carry a content list; concatenate the text items.
        let text = result
            .get("content")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        Ok(text)
    }
}
