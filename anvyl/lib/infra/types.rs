use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    store::{Container, Host},
    AnvylError,
};

//--------------------------------------------------------------------------------------------------
// Types: Requests
//--------------------------------------------------------------------------------------------------

/// Request body for registering a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHostRequest {
    /// Human-readable name.
    pub name: String,

    /// IPv4/IPv6 literal or hostname.
    pub ip: String,

    /// Free-form operating system string.
    #[serde(default)]
    pub os: Option<String>,

    /// Tags to attach.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request body for a partial host update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateHostRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,

    /// New lifecycle state (`active`, `inactive`, `unknown`).
    #[serde(default)]
    pub status: Option<crate::store::HostStatus>,

    /// New tags, replacing the existing set.
    #[serde(default)]
    pub tags: Option<Vec<String>>,

    /// New resources snapshot.
    #[serde(default)]
    pub resources: Option<Value>,

    /// New metadata blob.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Request body for creating and starting a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContainerRequest {
    /// Container name, unique on the host.
    pub name: String,

    /// Image reference.
    pub image: String,

    /// Target host; defaults to the local host. Non-local hosts are rejected.
    #[serde(default)]
    pub host_id: Option<String>,

    /// Port mappings in `host:container` form.
    #[serde(default)]
    pub ports: Vec<String>,

    /// Volume mappings in `host:container[:options]` form.
    #[serde(default)]
    pub volumes: Vec<String>,

    /// Environment entries in `KEY=value` form.
    #[serde(default)]
    pub environment: Vec<String>,

    /// Labels to attach.
    #[serde(default)]
    pub labels: std::collections::HashMap<String, String>,

    /// Command override.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

/// Request body for stopping a container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopContainerRequest {
    /// Seconds to wait for graceful shutdown before SIGKILL.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Request body for running a command inside a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecRequest {
    /// The argv to run.
    pub command: Vec<String>,

    /// Allocate a TTY, merging stdout and stderr.
    #[serde(default)]
    pub tty: bool,
}

/// Request body for running a command on a host itself, outside any
/// container. Only the local host accepts commands (single-node scope).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostExecRequest {
    /// The argv to run.
    pub command: Vec<String>,

    /// Working directory; defaults to the service's own.
    #[serde(default)]
    pub working_directory: Option<String>,

    /// Environment entries in `KEY=value` form, added to the child's env.
    #[serde(default)]
    pub env: Vec<String>,

    /// Seconds before the run is abandoned; omit or 0 to wait indefinitely.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Query parameters for container listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListContainersQuery {
    /// Narrow to one host.
    #[serde(default)]
    pub host_id: Option<String>,

    /// Include stopped containers.
    #[serde(default)]
    pub all: bool,
}

/// Query parameters for container log reads.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsQuery {
    /// Number of lines from the end.
    #[serde(default = "default_tail")]
    pub tail: u32,

    /// Stream appended lines as server-sent events.
    #[serde(default)]
    pub follow: bool,
}

/// Query parameters for container removal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveQuery {
    /// Force-remove a running container.
    #[serde(default)]
    pub force: bool,
}

//--------------------------------------------------------------------------------------------------
// Types: Responses
//--------------------------------------------------------------------------------------------------

/// A host row as rendered on the wire, blobs decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostResponse {
    /// Stable identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// IPv4/IPv6 literal or hostname.
    pub ip: String,

    /// Free-form operating system string.
    pub os: Option<String>,

    /// Lifecycle state.
    pub status: crate::store::HostStatus,

    /// Latest resources snapshot, when one has been recorded.
    pub resources: Option<Value>,

    /// Tags attached to the host.
    pub tags: Vec<String>,

    /// Arbitrary metadata.
    pub metadata: Option<Value>,

    /// Whether this is the local host.
    pub is_local: bool,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,

    /// Last heartbeat time.
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// A container row as rendered on the wire, blobs decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerResponse {
    /// Stable internal identifier.
    pub id: String,

    /// Engine container ID, once known.
    pub docker_id: Option<String>,

    /// Container name.
    pub name: String,

    /// Image reference.
    pub image: String,

    /// Owning host.
    pub host_id: String,

    /// Lifecycle state.
    pub status: crate::store::ContainerStatus,

    /// Labels attached to the container.
    pub labels: Value,

    /// Port mappings.
    pub ports: Vec<String>,

    /// Volume mappings.
    pub volumes: Vec<String>,

    /// Environment entries.
    pub environment: Vec<String>,

    /// Command override, when one was given.
    pub command: Option<Vec<String>>,

    /// Exit code, once known.
    pub exit_code: Option<i64>,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,

    /// Start time reported by the engine.
    pub started_at: Option<DateTime<Utc>>,

    /// Finish time reported by the engine.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` when every component answers.
    pub status: String,

    /// Per-subsystem booleans.
    pub components: HealthComponents,
}

/// Per-subsystem health booleans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthComponents {
    /// Whether the database answers.
    pub db: bool,

    /// Whether the Docker engine answers.
    pub docker: bool,
}

/// Response body for `GET /system/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatusResponse {
    /// Number of registered hosts.
    pub hosts: u64,

    /// Container counts.
    pub containers: ContainerCounts,

    /// `"ok"` or `"down"`.
    pub engine: String,
}

/// Container counts for the system status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerCounts {
    /// Containers the engine reports running.
    pub running: u64,

    /// Live containers that are not running.
    pub stopped: u64,

    /// All live containers.
    pub total: u64,
}

/// Response body for `GET /hosts/{id}/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostMetricsResponse {
    /// CPU usage in percent.
    pub cpu_percent: f64,

    /// Memory in use, bytes.
    pub memory_used: u64,

    /// Total memory, bytes.
    pub memory_total: u64,

    /// Disk space in use, bytes.
    pub disk_used: u64,

    /// Total disk space, bytes.
    pub disk_total: u64,

    /// 1/5/15 minute load averages.
    pub load: [f64; 3],
}

/// Response body for non-follow log reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    /// Log lines, oldest first.
    pub logs: Vec<String>,
}

/// Service banner returned from the root route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerResponse {
    /// Service name.
    pub service: String,

    /// Crate version.
    pub version: String,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status code, repeated in the body.
    pub code: u16,

    /// One-line description.
    pub message: String,

    /// Error kind tag (`Validation`, `NotFound`, ...).
    pub kind: String,
}

//--------------------------------------------------------------------------------------------------
// Types: Error Edge
//--------------------------------------------------------------------------------------------------

/// Adapter from [`AnvylError`] to an HTTP response.
///
/// Handlers return `Result<_, ApiError>`; the status mapping lives here and
/// nowhere else.
#[derive(Debug)]
pub struct ApiError(pub AnvylError);

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ApiError {
    /// The HTTP status for the wrapped error kind.
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            AnvylError::Validation(_) => StatusCode::BAD_REQUEST,
            AnvylError::NotFound(_) => StatusCode::NOT_FOUND,
            AnvylError::Conflict(_) | AnvylError::Invariant(_) => StatusCode::CONFLICT,
            AnvylError::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AnvylError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<AnvylError> for ApiError {
    fn from(error: AnvylError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        // Internal details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            message,
            kind: self.0.kind().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<Host> for HostResponse {
    fn from(host: Host) -> Self {
        let tags = host.tags_list();
        let resources = host
            .resources
            .as_deref()
            .and_then(|blob| serde_json::from_str(blob).ok());
        let metadata = host
            .metadata
            .as_deref()
            .and_then(|blob| serde_json::from_str(blob).ok());

        Self {
            id: host.id,
            name: host.name,
            ip: host.ip,
            os: host.os,
            status: host.status,
            resources,
            tags,
            metadata,
            is_local: host.is_local,
            created_at: host.created_at,
            updated_at: host.updated_at,
            last_heartbeat: host.last_heartbeat,
        }
    }
}

impl From<Container> for ContainerResponse {
    fn from(container: Container) -> Self {
        let labels = serde_json::from_str(&container.labels)
            .unwrap_or_else(|_| Value::Object(Default::default()));
        let ports = container.ports_list();
        let volumes = serde_json::from_str(&container.volumes).unwrap_or_default();
        let environment = serde_json::from_str(&container.environment).unwrap_or_default();
        let command = container
            .command
            .as_deref()
            .and_then(|blob| serde_json::from_str(blob).ok());

        Self {
            id: container.id,
            docker_id: container.docker_id,
            name: container.name,
            image: container.image,
            host_id: container.host_id,
            status: container.status,
            labels,
            ports,
            volumes,
            environment,
            command,
            exit_code: container.exit_code,
            created_at: container.created_at,
            updated_at: container.updated_at,
            started_at: container.started_at,
            finished_at: container.finished_at,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn default_tail() -> u32 {
    crate::config::DEFAULT_LOG_TAIL
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(AnvylError::validation("x")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(AnvylError::not_found("x")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(AnvylError::Invariant("x".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(AnvylError::EngineUnavailable("x".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError(AnvylError::Internal("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_body_hides_details() {
        let response = ApiError(AnvylError::Internal("secret path /x".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
