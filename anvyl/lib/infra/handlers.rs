//! HTTP request handlers for the infrastructure API.
//!
//! Handlers validate, take the relevant lock, and delegate to the store and
//! the engine adapter. Inconsistent store/engine state is never repaired
//! here; that is the reconciler's job.

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Path, Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};

use crate::{
    docker::{ContainerSpec, EngineStats, ExecOutput},
    store::{self, Container, ContainerStatus, ContainerUpdate, HostUpdate, NewContainer, NewHost},
    AnvylError, AnvylResult,
};

use super::{
    metrics, state::CONTAINER_ID_LABEL, state::MANAGED_LABEL, ApiError, AppState, BannerResponse,
    ContainerCounts, ContainerResponse, CreateContainerRequest, CreateHostRequest,
    ExecRequest, HealthComponents, HealthResponse, HostExecRequest, HostMetricsResponse,
    HostResponse, ListContainersQuery, LogsQuery, LogsResponse, RemoveQuery,
    StopContainerRequest, SystemStatusResponse, UpdateHostRequest,
};

//--------------------------------------------------------------------------------------------------
// Functions: Handlers (system)
//--------------------------------------------------------------------------------------------------

/// Handler for `GET /`.
pub async fn root_handler() -> Json<BannerResponse> {
    Json(BannerResponse {
        service: "anvyl-infra".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for `GET /health`.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = sqlx::query("SELECT 1").execute(state.db()).await.is_ok();
    let docker = state.engine().ping().await.is_ok();

    Json(HealthResponse {
        status: if db && docker { "ok" } else { "degraded" }.to_string(),
        components: HealthComponents { db, docker },
    })
}

/// Handler for `GET /system/status`.
pub async fn system_status_handler(
    State(state): State<AppState>,
) -> Result<Json<SystemStatusResponse>, ApiError> {
    let hosts = store::list_hosts(state.db()).await?;
    let containers = store::list_containers(state.db(), None, true).await?;

    let live: Vec<&Container> = containers.iter().filter(|c| c.is_active()).collect();
    let running = live
        .iter()
        .filter(|c| c.status == ContainerStatus::Running)
        .count() as u64;
    let total = live.len() as u64;

    let engine = if state.engine().ping().await.is_ok() {
        "ok"
    } else {
        "down"
    };

    Ok(Json(SystemStatusResponse {
        hosts: hosts.len() as u64,
        containers: ContainerCounts {
            running,
            stopped: total - running,
            total,
        },
        engine: engine.to_string(),
    }))
}

//--------------------------------------------------------------------------------------------------
// Functions: Handlers (hosts)
//--------------------------------------------------------------------------------------------------

/// Handler for `GET /hosts`.
pub async fn list_hosts_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<HostResponse>>, ApiError> {
    let hosts = store::list_hosts(state.db()).await?;
    Ok(Json(hosts.into_iter().map(Into::into).collect()))
}

/// Handler for `GET /hosts/{id}`.
pub async fn get_host_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HostResponse>, ApiError> {
    let host = store::get_host(state.db(), &id).await?;
    Ok(Json(host.into()))
}

/// Handler for `POST /hosts`.
///
/// Records a reference to a remote host. No provisioning happens; the row
/// exists so that tooling can target it later.
pub async fn create_host_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateHostRequest>,
) -> Result<Json<HostResponse>, ApiError> {
    if request.name.trim().is_empty() || request.ip.trim().is_empty() {
        return Err(AnvylError::validation("host name and ip are required").into());
    }

    let _guard = state.host_lock().lock().await;

    let host = store::add_host(
        state.db(),
        NewHost {
            name: request.name,
            ip: request.ip,
            os: request.os,
            tags: request.tags,
            is_local: false,
        },
    )
    .await?;

    Ok(Json(host.into()))
}

/// Handler for `PUT /hosts/{id}`.
pub async fn update_host_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateHostRequest>,
) -> Result<Json<HostResponse>, ApiError> {
    let _guard = state.host_lock().lock().await;

    let update = HostUpdate {
        name: request.name,
        status: request.status,
        tags: request.tags,
        resources: request.resources.map(|v| v.to_string()),
        metadata: request.metadata.map(|v| v.to_string()),
    };

    let host = store::update_host(state.db(), &id, update).await?;
    Ok(Json(host.into()))
}

/// Handler for `DELETE /hosts/{id}`. Forbidden for the local host.
pub async fn delete_host_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let _guard = state.host_lock().lock().await;

    store::remove_host(state.db(), &id).await?;
    Ok(Json(serde_json::json!({ "removed": id })))
}

/// Handler for `POST /hosts/{id}/heartbeat`.
pub async fn host_heartbeat_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HostResponse>, ApiError> {
    let host = store::heartbeat(state.db(), &id).await?;
    Ok(Json(host.into()))
}

/// Handler for `GET /hosts/{id}/metrics`.
///
/// The local host is sampled live; for any other host the cached resources
/// snapshot is returned.
pub async fn host_metrics_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let host = store::get_host(state.db(), &id).await?;

    if host.is_local {
        let sample: HostMetricsResponse = metrics::sample_local_metrics().await?;
        return Ok(Json(serde_json::to_value(sample).map_err(AnvylError::from)?));
    }

    let blob = host
        .resources
        .as_deref()
        .ok_or_else(|| AnvylError::NotFound(format!("no metrics recorded for host '{}'", id)))?;

    let value = serde_json::from_str(blob).map_err(AnvylError::from)?;
    Ok(Json(value))
}

/// Handler for `POST /hosts/{id}/exec`.
///
/// Runs a command on the host itself, outside any container. Like container
/// creation, this only accepts the local host.
pub async fn host_exec_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<HostExecRequest>,
) -> Result<Json<ExecOutput>, ApiError> {
    if request.command.is_empty() {
        return Err(AnvylError::validation("command must not be empty").into());
    }

    let host = store::get_host(state.db(), &id).await?;
    if !host.is_local {
        return Err(AnvylError::validation(
            "commands can only be executed on the local host",
        )
        .into());
    }

    let output = run_host_command(&request).await?;
    Ok(Json(output))
}

//--------------------------------------------------------------------------------------------------
// Functions: Handlers (containers)
//--------------------------------------------------------------------------------------------------

/// Handler for `GET /containers`.
pub async fn list_containers_handler(
    State(state): State<AppState>,
    Query(query): Query<ListContainersQuery>,
) -> Result<Json<Vec<ContainerResponse>>, ApiError> {
    let containers =
        store::list_containers(state.db(), query.host_id.as_deref(), query.all).await?;
    Ok(Json(containers.into_iter().map(Into::into).collect()))
}

/// Handler for `GET /containers/{id}` (internal id or engine id).
pub async fn get_container_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContainerResponse>, ApiError> {
    let container = store::get_container(state.db(), &id).await?;
    Ok(Json(container.into()))
}

/// Handler for `POST /containers`.
pub async fn create_container_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateContainerRequest>,
) -> Result<Json<ContainerResponse>, ApiError> {
    let container = handle_create_container(&state, request).await?;
    Ok(Json(container.into()))
}

/// Handler for `POST /containers/{id}/stop`.
pub async fn stop_container_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StopContainerRequest>,
) -> Result<Json<ContainerResponse>, ApiError> {
    let timeout = request
        .timeout
        .unwrap_or(crate::config::DEFAULT_STOP_TIMEOUT_SECS);

    let container = store::get_container(state.db(), &id).await?;
    let lock = state.container_lock(&container.id).await;
    let _guard = lock.lock().await;

    if let Some(docker_id) = container.docker_id.as_deref() {
        state.engine().stop(docker_id, timeout).await?;
    }

    let updated = store::update_container(
        state.db(),
        &container.id,
        ContainerUpdate {
            status: Some(ContainerStatus::Stopped),
            finished_at: Some(Utc::now()),
            ..Default::default()
        },
    )
    .await?;

    Ok(Json(updated.into()))
}

/// Handler for `DELETE /containers/{id}`.
pub async fn delete_container_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RemoveQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let container = store::get_container(state.db(), &id).await?;
    let lock = state.container_lock(&container.id).await;

    {
        let _guard = lock.lock().await;

        if let Some(docker_id) = container.docker_id.as_deref() {
            match state.engine().remove(docker_id, query.force).await {
                // Already gone from the engine; the row is all that is left.
                Err(AnvylError::NotFound(_)) => {}
                Err(AnvylError::Conflict(_)) if !query.force => {
                    // Running and force not requested: stop first, then remove.
                    state
                        .engine()
                        .stop(docker_id, crate::config::DEFAULT_STOP_TIMEOUT_SECS)
                        .await?;
                    state.engine().remove(docker_id, false).await?;
                }
                other => other?,
            }
        }

        store::remove_container(state.db(), &container.id).await?;
    }

    state.forget_container_lock(&container.id).await;

    Ok(Json(serde_json::json!({ "removed": container.id })))
}

/// Handler for `GET /containers/{id}/logs`.
///
/// With `follow=true` the response is a `text/event-stream` where each line
/// arrives as a `log` event; otherwise a JSON array of lines.
pub async fn container_logs_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    let container = store::get_container(state.db(), &id).await?;
    let docker_id = container.docker_id.ok_or_else(|| {
        AnvylError::Conflict("container has not been created in the engine yet".to_string())
    })?;

    let stream = state
        .engine()
        .logs(&docker_id, query.tail, query.follow)
        .await?;

    if query.follow {
        let events = stream.map(|line| {
            let event = match line {
                Result::Ok(line) => Event::default().event("log").data(line),
                Err(error) => Event::default().event("error").data(error.to_string()),
            };
            Result::<Event, Infallible>::Ok(event)
        });

        return Ok(Sse::new(events)
            .keep_alive(KeepAlive::default())
            .into_response());
    }

    let logs: Vec<String> = stream.try_collect().await?;
    Ok(Json(LogsResponse { logs }).into_response())
}

/// Handler for `POST /containers/{id}/exec`.
pub async fn exec_container_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ExecRequest>,
) -> Result<Json<ExecOutput>, ApiError> {
    if request.command.is_empty() {
        return Err(AnvylError::validation("command must not be empty").into());
    }

    let container = store::get_container(state.db(), &id).await?;
    let docker_id = container.docker_id.ok_or_else(|| {
        AnvylError::Conflict("container has not been created in the engine yet".to_string())
    })?;

    let output = state
        .engine()
        .exec(&docker_id, &request.command, request.tty)
        .await?;

    Ok(Json(output))
}

/// Handler for `GET /containers/{id}/stats`.
pub async fn container_stats_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EngineStats>, ApiError> {
    let container = store::get_container(state.db(), &id).await?;
    let docker_id = container.docker_id.ok_or_else(|| {
        AnvylError::Conflict("container has not been created in the engine yet".to_string())
    })?;

    let stats = state.engine().stats(&docker_id).await?;
    Ok(Json(stats))
}

//--------------------------------------------------------------------------------------------------
// Functions: Implementation
//--------------------------------------------------------------------------------------------------

/// Implementation of the host-exec operation.
///
/// No timeout means waiting indefinitely; expiry reports the conventional
/// exit code 124, and the child is killed rather than left running.
async fn run_host_command(request: &HostExecRequest) -> AnvylResult<ExecOutput> {
    let (program, args) = request
        .command
        .split_first()
        .ok_or_else(|| AnvylError::validation("command must not be empty"))?;

    let mut command = tokio::process::Command::new(program);
    command.args(args).kill_on_drop(true);

    if let Some(dir) = request
        .working_directory
        .as_deref()
        .filter(|dir| !dir.is_empty())
    {
        command.current_dir(dir);
    }

    for entry in &request.env {
        if let Some((key, value)) = entry.split_once('=') {
            command.env(key, value);
        }
    }

    let result = match request.timeout.filter(|secs| *secs > 0) {
        Some(secs) => {
            match tokio::time::timeout(Duration::from_secs(secs), command.output()).await {
                Result::Ok(output) => output,
                Err(_) => {
                    return Ok(ExecOutput {
                        exit_code: 124,
                        stdout: String::new(),
                        stderr: "command timed out".to_string(),
                    });
                }
            }
        }
        None => command.output().await,
    };

    let output = result.map_err(|error| match error.kind() {
        std::io::ErrorKind::NotFound => {
            AnvylError::Validation(format!("command not found: {}", program))
        }
        _ => AnvylError::Io(error),
    })?;

    Ok(ExecOutput {
        exit_code: i64::from(output.status.code().unwrap_or(-1)),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Implementation of the create-container operation.
///
/// The row is persisted before the engine call so a crash between the two
/// cannot produce an engine container the reconciler cannot attribute; the
/// managed labels on the engine side are the reverse mapping.
async fn handle_create_container(
    state: &AppState,
    request: CreateContainerRequest,
) -> AnvylResult<Container> {
    if request.name.trim().is_empty() {
        return Err(AnvylError::validation("container name is required"));
    }
    if request.image.trim().is_empty() {
        return Err(AnvylError::validation("container image is required"));
    }
    if let Some(host_id) = request.host_id.as_deref() {
        if host_id != state.local_host_id() {
            return Err(AnvylError::validation(
                "containers can only be created on the local host",
            ));
        }
    }

    let row = store::add_container(
        state.db(),
        NewContainer {
            name: request.name.clone(),
            image: request.image.clone(),
            host_id: state.local_host_id().to_string(),
            labels: serde_json::to_string(&request.labels)?,
            ports: serde_json::to_string(&request.ports)?,
            volumes: serde_json::to_string(&request.volumes)?,
            environment: serde_json::to_string(&request.environment)?,
            command: request
                .command
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        },
    )
    .await?;

    let lock = state.container_lock(&row.id).await;
    let _guard = lock.lock().await;

    let mut labels = request.labels;
    labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
    labels.insert(CONTAINER_ID_LABEL.to_string(), row.id.clone());

    let spec = ContainerSpec::builder()
        .name(request.name)
        .image(request.image)
        .ports(request.ports)
        .volumes(request.volumes)
        .environment(request.environment)
        .labels(labels)
        .command(request.command)
        .build();

    let started = async {
        let docker_id = state.engine().create_container(&spec).await?;
        state.engine().start(&docker_id).await?;
        crate::Ok(docker_id)
    }
    .await;

    let docker_id = match started {
        Result::Ok(docker_id) => docker_id,
        Err(error) => {
            // Never leave an orphan row behind; surface the adapter's kind.
            if let Err(cleanup) = store::remove_container(state.db(), &row.id).await {
                tracing::warn!(
                    container_id = %row.id,
                    error = %cleanup,
                    "failed to clean up container row after engine failure"
                );
            }
            return Err(error);
        }
    };

    store::update_container(
        state.db(),
        &row.id,
        ContainerUpdate {
            docker_id: Some(docker_id),
            status: Some(ContainerStatus::Running),
            started_at: Some(Utc::now()),
            ..Default::default()
        },
    )
    .await
}
