//! Method router: dispatches incoming JSON-RPC requests to handlers.

use serde_json::{json, Value};

use crate::{infra::InfraClient, AnvylError};

use super::{
    error_codes, RpcId, RpcRequest, RpcResponse, ToolRegistry, PROTOCOL_VERSION,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// URI of the host inventory resource.
const HOSTS_RESOURCE_URI: &str = "anvyl://hosts";

/// URI of the container inventory resource.
const CONTAINERS_RESOURCE_URI: &str = "anvyl://containers";

/// Name of the static overview prompt.
const OVERVIEW_PROMPT: &str = "infrastructure_overview";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Dispatches MCP methods onto the tool registry and resource handlers.
///
/// Messages on one connection are processed in arrival order; concurrent
/// connections are independent, which the router supports by being cheap to
/// clone.
#[derive(Debug, Clone)]
pub struct McpRouter {
    registry: ToolRegistry,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl McpRouter {
    /// Creates a router over an infrastructure API client.
    pub fn new(client: InfraClient) -> Self {
        Self {
            registry: ToolRegistry::new(client),
        }
    }

    /// Dispatches one request; returns `None` for notifications.
    pub async fn dispatch(&self, request: RpcRequest) -> Option<RpcResponse> {
        if request.is_notification() {
            match request.method.as_str() {
                "notifications/initialized" => {}
                other => tracing::debug!(method = other, "ignoring unknown notification"),
            }
            return None;
        }

        let id = request.id.clone();
        let params = request.params.unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => RpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params).await,
            "resources/list" => self.handle_resources_list(id),
            "resources/read" => self.handle_resources_read(id, params).await,
            "prompts/list" => self.handle_prompts_list(id),
            "prompts/get" => self.handle_prompts_get(id, params),
            other => RpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("method not found: {}", other),
            ),
        };

        Some(response)
    }

    fn handle_initialize(&self, id: Option<RpcId>) -> RpcResponse {
        RpcResponse::success(
            id,
            json!({
                "protocol_version": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": true,
                    "resources": true,
                    "prompts": true,
                },
                "server_info": {
                    "name": "anvyl-mcp",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<RpcId>) -> RpcResponse {
        let tools: Vec<Value> = self
            .registry
            .tools()
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                    "required": tool.required,
                })
            })
            .collect();

        RpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<RpcId>, params: Value) -> RpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return RpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                "missing tool name".to_string(),
            );
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        match self.registry.call(name, arguments).await {
            Result::Ok(text) => RpcResponse::success(
                id,
                json!({
                    "content": [{"type": "text", "text": text}],
                    "isError": false,
                }),
            ),
            Err(error) => error_response(id, &error),
        }
    }

    fn handle_resources_list(&self, id: Option<RpcId>) -> RpcResponse {
        RpcResponse::success(
            id,
            json!({
                "resources": [
                    {
                        "uri": HOSTS_RESOURCE_URI,
                        "name": "Host inventory",
                        "description": "All hosts registered with this node",
                        "mime_type": "text/plain",
                    },
                    {
                        "uri": CONTAINERS_RESOURCE_URI,
                        "name": "Container inventory",
                        "description": "All containers managed by this node",
                        "mime_type": "text/plain",
                    },
                ],
            }),
        )
    }

    async fn handle_resources_read(&self, id: Option<RpcId>, params: Value) -> RpcResponse {
        let Some(uri) = params.get("uri").and_then(Value::as_str) else {
            return RpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                "missing resource uri".to_string(),
            );
        };

        let text = match uri {
            HOSTS_RESOURCE_URI => self.registry.call("list_hosts", json!({})).await,
            CONTAINERS_RESOURCE_URI => {
                self.registry
                    .call("list_containers", json!({"all": true}))
                    .await
            }
            other => {
                return RpcResponse::error(
                    id,
                    error_codes::NOT_FOUND,
                    format!("unknown resource: {}", other),
                );
            }
        };

        match text {
            Result::Ok(text) => RpcResponse::success(
                id,
                json!({ "contents": [{"uri": uri, "text": text}] }),
            ),
            Err(error) => error_response(id, &error),
        }
    }

    fn handle_prompts_list(&self, id: Option<RpcId>) -> RpcResponse {
        RpcResponse::success(
            id,
            json!({
                "prompts": [{
                    "name": OVERVIEW_PROMPT,
                    "description": "Summarize the current state of this node's infrastructure",
                }],
            }),
        )
    }

    fn handle_prompts_get(&self, id: Option<RpcId>, params: Value) -> RpcResponse {
        match params.get("name").and_then(Value::as_str) {
            Some(OVERVIEW_PROMPT) => RpcResponse::success(
                id,
                json!({
                    "description": "Summarize the current state of this node's infrastructure",
                    "messages": [{
                        "role": "user",
                        "content": {
                            "type": "text",
                            "text": "Use the available tools to list the hosts and containers \
                                     on this node, then summarize their state, flagging \
                                     anything stopped or unhealthy.",
                        },
                    }],
                }),
            ),
            Some(other) => RpcResponse::error(
                id,
                error_codes::NOT_FOUND,
                format!("unknown prompt: {}", other),
            ),
            None => RpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                "missing prompt name".to_string(),
            ),
        }
    }

}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Maps an error kind onto the MCP error code table.
fn error_response(id: Option<RpcId>, error: &AnvylError) -> RpcResponse {
    let code = match error {
        AnvylError::Validation(_) => error_codes::INVALID_PARAMS,
        AnvylError::NotFound(_) => error_codes::NOT_FOUND,
        AnvylError::Conflict(_) | AnvylError::Invariant(_) => error_codes::CONFLICT,
        AnvylError::EngineUnavailable(_) => error_codes::ENGINE_UNAVAILABLE,
        _ => error_codes::INTERNAL_ERROR,
    };

    // Keep the reason short; no stack traces cross this boundary.
    let reason = match code {
        error_codes::INTERNAL_ERROR => "internal error".to_string(),
        _ => error.to_string(),
    };

    RpcResponse::error_with_data(id, code, error.kind().to_string(), json!(reason))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> McpRouter {
        McpRouter::new(InfraClient::new("http://localhost:4200"))
    }

    fn request(id: i64, method: &str, params: Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(RpcId::Num(id)),
            method: method.to_string(),
            params: Some(params),
        }
    }

    #[tokio::test]
    async fn test_initialize_advertises_capabilities() {
        let response = router()
            .dispatch(request(1, "initialize", json!({"protocol_version": "2024-11-05"})))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocol_version"], PROTOCOL_VERSION);
        assert_eq!(result["capabilities"]["tools"], true);
        assert_eq!(result["capabilities"]["resources"], true);
        assert_eq!(result["capabilities"]["prompts"], true);
    }

    #[tokio::test]
    async fn test_ping_returns_empty_result() {
        let response = router()
            .dispatch(request(2, "ping", json!({})))
            .await
            .unwrap();
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_tools_list_contains_catalog() {
        let response = router()
            .dispatch(request(3, "tools/list", json!({})))
            .await
            .unwrap();

        let tools = response.result.unwrap()["tools"].clone();
        let names: Vec<String> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert!(names.contains(&"list_hosts".to_string()));
        assert!(names.contains(&"get_system_status".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_method_is_rejected() {
        let response = router()
            .dispatch(request(4, "sessions/create", json!({})))
            .await
            .unwrap();
        assert_eq!(
            response.error.unwrap().code,
            error_codes::METHOD_NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let notification = RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(router().dispatch(notification).await.is_none());
    }

    #[tokio::test]
    async fn test_tools_call_without_name_is_invalid_params() {
        let response = router()
            .dispatch(request(5, "tools/call", json!({"arguments": {}})))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_prompts_round_trip() {
        let list = router()
            .dispatch(request(6, "prompts/list", json!({})))
            .await
            .unwrap();
        let name = list.result.unwrap()["prompts"][0]["name"]
            .as_str()
            .unwrap()
            .to_string();

        let get = router()
            .dispatch(request(7, "prompts/get", json!({"name": name})))
            .await
            .unwrap();
        assert!(get.result.unwrap()["messages"][0]["content"]["text"]
            .as_str()
            .unwrap()
            .contains("tools"));
    }

    #[test]
    fn test_error_code_mapping() {
        let cases = [
            (AnvylError::validation("x"), error_codes::INVALID_PARAMS),
            (AnvylError::not_found("x"), error_codes::NOT_FOUND),
            (AnvylError::conflict("x"), error_codes::CONFLICT),
            (
                AnvylError::EngineUnavailable("x".into()),
                error_codes::ENGINE_UNAVAILABLE,
            ),
            (AnvylError::Internal("x".into()), error_codes::INTERNAL_ERROR),
        ];

        for (error, expected) in cases {
            let response = error_response(Some(RpcId::Num(1)), &error);
            assert_eq!(response.error.unwrap().code, expected);
        }
    }
}
