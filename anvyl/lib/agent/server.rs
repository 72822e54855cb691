use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::RwLock;

use crate::{
    config::{AnvylConfig, DEFAULT_MAX_ITERATIONS},
    infra::ErrorResponse,
    AnvylError, AnvylResult,
};

use super::{
    AddKnownHostRequest, AgentInfoResponse, AgentRunner, McpClient, OpenAiChatClient,
    QueryRequest, QueryResponse,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Shared state for the agent service.
///
/// Every `/query` request progresses independently; the only shared pieces
/// are the runner (with its cached tool catalog) and the in-memory known-host
/// map.
#[derive(Clone)]
pub struct AgentState {
    runner: Arc<AgentRunner<OpenAiChatClient, McpClient>>,
    provider: OpenAiChatClient,
    provider_url: String,
    mcp_url: String,

    /// Known remote hosts (id -> ip), recorded for future use only.
    known_hosts: Arc<RwLock<HashMap<String, String>>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl AgentState {
    /// Builds the agent state from configuration.
    pub fn new(config: &AnvylConfig) -> Self {
        let provider = OpenAiChatClient::new(config.get_model_provider_url().clone());
        let transport = McpClient::new(config.get_mcp_url().clone());
        let runner = AgentRunner::new(
            provider.clone(),
            transport,
            config.get_model().clone(),
            DEFAULT_MAX_ITERATIONS,
        );

        Self {
            runner: Arc::new(runner),
            provider,
            provider_url: config.get_model_provider_url().clone(),
            mcp_url: config.get_mcp_url().clone(),
            known_hosts: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates the agent API router.
pub fn create_router(state: AgentState) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/hosts", get(list_known_hosts_handler))
        .route("/hosts", post(add_known_host_handler))
        .with_state(state)
}

/// Runs the agent service until SIGTERM/SIGINT.
pub async fn serve(config: AnvylConfig) -> AnvylResult<()> {
    let state = AgentState::new(&config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.agent_bind_addr()).await?;
    tracing::info!(addr = %config.agent_bind_addr(), "agent service listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(crate::infra::shutdown_signal())
        .await?;

    tracing::info!("agent service stopped");
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for `POST /query`.
async fn query_handler(
    State(state): State<AgentState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    if request.query.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "query must not be empty");
    }

    match state
        .runner
        .query(&request.query, request.host_id.as_deref())
        .await
    {
        Result::Ok(response) => Json::<QueryResponse>(response).into_response(),
        Err(error) => agent_error_response(error),
    }
}

/// Handler for `GET /health`.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "anvyl-agent"}))
}

/// Handler for `GET /info`.
async fn info_handler(State(state): State<AgentState>) -> Response {
    let tools = match state.runner.catalog().await {
        Result::Ok(tools) => tools.iter().map(|tool| tool.name.clone()).collect(),
        // The MCP server may not be up yet; report the surface without tools.
        Err(_) => Vec::new(),
    };

    // Prefer the model the provider actually has loaded.
    let model = state
        .provider
        .first_available_model()
        .await
        .unwrap_or_else(|| state.runner.model().to_string());

    Json(AgentInfoResponse {
        model,
        provider_url: state.provider_url.clone(),
        mcp_url: state.mcp_url.clone(),
        tools,
    })
    .into_response()
}

/// Handler for `GET /hosts`.
async fn list_known_hosts_handler(State(state): State<AgentState>) -> Json<serde_json::Value> {
    let hosts = state.known_hosts.read().await;
    Json(serde_json::json!({ "hosts": *hosts }))
}

/// Handler for `POST /hosts`: records a remote host reference in memory.
async fn add_known_host_handler(
    State(state): State<AgentState>,
    Json(request): Json<AddKnownHostRequest>,
) -> Response {
    if request.host_id.trim().is_empty() || request.host_ip.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "host_id and host_ip are required");
    }

    let mut hosts = state.known_hosts.write().await;
    hosts.insert(request.host_id.clone(), request.host_ip);

    Json(serde_json::json!({ "added": request.host_id })).into_response()
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Maps a query failure onto the agent's status codes: provider timeouts are
/// 504, other provider failures 502, everything else as usual.
fn agent_error_response(error: AnvylError) -> Response {
    let status = match &error {
        AnvylError::ProviderUnavailable(reason) if reason.contains("timed out") => {
            StatusCode::GATEWAY_TIMEOUT
        }
        AnvylError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
        AnvylError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %error, "query failed");
        return error_response(status, "internal error");
    }

    let kind = error.kind().to_string();
    let body = ErrorResponse {
        code: status.as_u16(),
        message: error.to_string(),
        kind,
    };
    (status, Json(body)).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorResponse {
        code: status.as_u16(),
        message: message.to_string(),
        kind: "Validation".to_string(),
    };
    (status, Json(body)).into_response()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_config() -> AnvylConfig {
        AnvylConfig::from_env()
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let request = match body {
            Some(body) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(AgentState::new(&test_config()));
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_known_hosts_round_trip() {
        let app = create_router(AgentState::new(&test_config()));

        let (status, body) = send(
            &app,
            "POST",
            "/hosts",
            Some(serde_json::json!({"host_id": "lab-1", "host_ip": "10.0.0.7"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["added"], "lab-1");

        let (status, body) = send(&app, "GET", "/hosts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hosts"]["lab-1"], "10.0.0.7");
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let app = create_router(AgentState::new(&test_config()));
        let (status, body) = send(
            &app,
            "POST",
            "/query",
            Some(serde_json::json!({"query": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "Validation");
    }

    #[test]
    fn test_provider_failures_map_to_gateway_statuses() {
        let timeout = agent_error_response(AnvylError::ProviderUnavailable(
            "provider request timed out".to_string(),
        ));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let malformed = agent_error_response(AnvylError::ProviderUnavailable(
            "provider returned malformed JSON: oops".to_string(),
        ));
        assert_eq!(malformed.status(), StatusCode::BAD_GATEWAY);
    }
}
