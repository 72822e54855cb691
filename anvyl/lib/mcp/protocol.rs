//! JSON-RPC 2.0 message types for the MCP transport.
//!
//! One JSON object per message: newline-delimited over stdio, one object per
//! request body over HTTP POST.

use serde::{Deserialize, Serialize};
use serde_json::Value;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error codes, standard and anvyl-specific.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;

    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i32 = -32600;

    /// The method does not exist.
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;

    /// The referenced host or container does not exist.
    pub const NOT_FOUND: i32 = -32001;

    /// A uniqueness or structural constraint was violated.
    pub const CONFLICT: i32 = -32002;

    /// The Docker engine is unreachable.
    pub const ENGINE_UNAVAILABLE: i32 = -32003;
}

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// JSON-RPC request or notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,

    /// Request id; absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RpcId>,

    /// Method name, e.g. `tools/call`.
    pub method: String,

    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC message identifier (number or string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    /// Numeric id.
    Num(i64),

    /// String id.
    Str(String),
}

/// JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,

    /// The id of the request being answered.
    pub id: Option<RpcId>,

    /// Result payload, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error payload, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i32,

    /// One-line description. Never a stack trace.
    pub message: String,

    /// Short machine-readable reason, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RpcRequest {
    /// True when this is a notification (no id, no reply expected).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

impl RpcResponse {
    /// Constructs a success response.
    pub fn success(id: Option<RpcId>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Constructs an error response.
    pub fn error(id: Option<RpcId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Constructs an error response carrying a short reason in `data`.
    pub fn error_with_data(
        id: Option<RpcId>,
        code: i32,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: Some(data),
            }),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip_numeric_id() {
        let json = r#"{"jsonrpc":"2.0","id":42,"method":"tools/list","params":{}}"#;
        let request: RpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.id, Some(RpcId::Num(42)));
        assert_eq!(request.method, "tools/list");
        assert!(!request.is_notification());

        let serialized = serde_json::to_string(&request).unwrap();
        let request2: RpcRequest = serde_json::from_str(&serialized).unwrap();
        assert_eq!(request2.id, Some(RpcId::Num(42)));
    }

    #[test]
    fn test_request_string_id_and_missing_params() {
        let json = r#"{"jsonrpc":"2.0","id":"req-1","method":"ping"}"#;
        let request: RpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.id, Some(RpcId::Str("req-1".to_string())));
        assert!(request.params.is_none());

        let serialized = serde_json::to_string(&request).unwrap();
        assert!(!serialized.contains("\"params\""));
    }

    #[test]
    fn test_notification_has_no_id() {
        let json = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        let request: RpcRequest = serde_json::from_str(json).unwrap();
        assert!(request.is_notification());

        let serialized = serde_json::to_string(&request).unwrap();
        assert!(!serialized.contains("\"id\""));
    }

    #[test]
    fn test_success_response_omits_error() {
        let response = RpcResponse::success(
            Some(RpcId::Num(1)),
            serde_json::json!({"status": "ok"}),
        );
        let serialized = serde_json::to_string(&response).unwrap();
        assert!(serialized.contains("\"result\""));
        assert!(!serialized.contains("\"error\""));
    }

    #[test]
    fn test_error_response_with_data() {
        let response = RpcResponse::error_with_data(
            Some(RpcId::Num(5)),
            error_codes::NOT_FOUND,
            "not found",
            serde_json::json!("host 'x'"),
        );
        let error = response.error.as_ref().unwrap();
        assert_eq!(error.code, -32001);
        assert_eq!(error.data, Some(serde_json::json!("host 'x'")));
        assert!(response.result.is_none());
    }
}
