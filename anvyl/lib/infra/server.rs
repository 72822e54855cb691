use std::{sync::Arc, time::Duration};

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    config::AnvylConfig,
    docker::{ContainerEngine, DockerEngine},
    store, AnvylResult,
};

use super::{handlers, AppState, Reconciler};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates the infrastructure API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        .route("/system/status", get(handlers::system_status_handler))
        .route("/hosts", get(handlers::list_hosts_handler))
        .route("/hosts", post(handlers::create_host_handler))
        .route("/hosts/{id}", get(handlers::get_host_handler))
        .route("/hosts/{id}", put(handlers::update_host_handler))
        .route("/hosts/{id}", delete(handlers::delete_host_handler))
        .route("/hosts/{id}/metrics", get(handlers::host_metrics_handler))
        .route(
            "/hosts/{id}/heartbeat",
            post(handlers::host_heartbeat_handler),
        )
        .route("/hosts/{id}/exec", post(handlers::host_exec_handler))
        .route("/containers", get(handlers::list_containers_handler))
        .route("/containers", post(handlers::create_container_handler))
        .route("/containers/{id}", get(handlers::get_container_handler))
        .route(
            "/containers/{id}",
            delete(handlers::delete_container_handler),
        )
        .route(
            "/containers/{id}/stop",
            post(handlers::stop_container_handler),
        )
        .route(
            "/containers/{id}/logs",
            get(handlers::container_logs_handler),
        )
        .route(
            "/containers/{id}/exec",
            post(handlers::exec_container_handler),
        )
        .route(
            "/containers/{id}/stats",
            get(handlers::container_stats_handler),
        )
        .with_state(state)
}

/// Runs the infrastructure service until SIGTERM/SIGINT.
///
/// Opens the database (this service is its only writer), connects the
/// engine, registers the local host, spawns the reconciler, and serves the
/// API. Shutdown cancels the reconciler and closes the pool before exit.
pub async fn serve(config: AnvylConfig) -> AnvylResult<()> {
    let db = store::init_db(config.get_db_path()).await?;
    let engine: Arc<dyn ContainerEngine> =
        Arc::new(DockerEngine::connect(config.get_docker_host().as_deref())?);

    let state = AppState::new(db.clone(), engine).await?;

    let reconciler = Reconciler::new(
        state.clone(),
        Duration::from_secs(*config.get_reconcile_interval_secs()),
    )
    .spawn();

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.infra_bind_addr()).await?;

    tracing::info!(addr = %config.infra_bind_addr(), "infrastructure service listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reconciler.abort();
    db.close().await;

    tracing::info!("infrastructure service stopped");
    Ok(())
}

/// Resolves when the process receives SIGTERM or SIGINT.
pub(crate) async fn shutdown_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler");
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        _ = sigint.recv() => tracing::info!("received SIGINT"),
    }
}
