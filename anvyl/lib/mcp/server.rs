use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::{config::AnvylConfig, infra::InfraClient, AnvylResult};

use super::{error_codes, McpRouter, RpcRequest, RpcResponse};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates the MCP HTTP router: the JSON-RPC endpoint plus a health probe
/// for the supervisor.
pub fn create_router(router: McpRouter) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/health", get(health_handler))
        .with_state(router)
}

/// Runs the MCP server over HTTP until SIGTERM/SIGINT.
pub async fn serve(config: AnvylConfig) -> AnvylResult<()> {
    let router = McpRouter::new(InfraClient::new(config.get_infra_url().clone()));
    let app = create_router(router);

    let listener = tokio::net::TcpListener::bind(config.mcp_bind_addr()).await?;
    tracing::info!(addr = %config.mcp_bind_addr(), "mcp server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(crate::infra::shutdown_signal())
        .await?;

    tracing::info!("mcp server stopped");
    Ok(())
}

/// Runs the MCP server over stdio: one JSON object per line in, one per
/// line out. Used by MCP clients that spawn their servers as children.
pub async fn serve_stdio(config: AnvylConfig) -> AnvylResult<()> {
    let router = McpRouter::new(InfraClient::new(config.get_infra_url().clone()));

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Result::Ok(request) => router.dispatch(request).await,
            Err(error) => Some(RpcResponse::error(
                None,
                error_codes::PARSE_ERROR,
                format!("parse error: {}", error),
            )),
        };

        if let Some(response) = response {
            let mut payload = serde_json::to_vec(&response)?;
            payload.push(b'\n');
            stdout.write_all(&payload).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for `POST /mcp`: one JSON-RPC message per request body.
async fn mcp_handler(State(router): State<McpRouter>, body: String) -> Response {
    let request: RpcRequest = match serde_json::from_str(&body) {
        Result::Ok(request) => request,
        Err(error) => {
            let response = RpcResponse::error(
                None,
                error_codes::PARSE_ERROR,
                format!("parse error: {}", error),
            );
            return Json(response).into_response();
        }
    };

    match router.dispatch(request).await {
        Some(response) => Json(response).into_response(),
        // Notifications get an empty reply.
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Handler for `GET /health`.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "anvyl-mcp"}))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
