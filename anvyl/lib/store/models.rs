use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Types: Hosts
//--------------------------------------------------------------------------------------------------

/// Lifecycle state of a registered host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum HostStatus {
    /// The host is reachable and reporting.
    Active,

    /// The host is registered but not reporting.
    Inactive,

    /// No recent information about the host.
    Unknown,
}

/// A machine recognized by anvyl. Exactly one row has `is_local = true`.
///
/// `tags`, `resources` and `metadata` are stored as JSON text blobs, the way
/// the inventory has always persisted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Host {
    /// Stable identifier, generated once at registration.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// IPv4/IPv6 literal or hostname.
    pub ip: String,

    /// Free-form operating system string.
    pub os: Option<String>,

    /// Lifecycle state.
    pub status: HostStatus,

    /// JSON blob with the latest CPU/memory/disk snapshot.
    pub resources: Option<String>,

    /// JSON array of tags.
    pub tags: String,

    /// JSON blob of arbitrary metadata.
    pub metadata: Option<String>,

    /// Whether this row describes the machine running the services.
    pub is_local: bool,

    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,

    /// Last mutation time (UTC).
    pub updated_at: DateTime<Utc>,

    /// Last heartbeat time (UTC), if any was ever received.
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// Fields for registering a new host.
#[derive(Debug, Clone)]
pub struct NewHost {
    /// Human-readable name.
    pub name: String,

    /// IPv4/IPv6 literal or hostname.
    pub ip: String,

    /// Free-form operating system string.
    pub os: Option<String>,

    /// Tags to attach to the host.
    pub tags: Vec<String>,

    /// Whether this is the local host row.
    pub is_local: bool,
}

/// Partial update of a host row; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct HostUpdate {
    /// New name.
    pub name: Option<String>,

    /// New lifecycle state.
    pub status: Option<HostStatus>,

    /// New tags, replacing the existing set.
    pub tags: Option<Vec<String>>,

    /// New resources blob.
    pub resources: Option<String>,

    /// New metadata blob.
    pub metadata: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Types: Containers
//--------------------------------------------------------------------------------------------------

/// Lifecycle state of a managed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// Row persisted, engine container not yet started.
    Created,

    /// The engine reports the container running.
    Running,

    /// The engine reports the container exited.
    Exited,

    /// Stopped through the API.
    Stopped,

    /// Gone from the engine; the row is about to be dropped.
    Removed,

    /// No recent information from the engine.
    Unknown,
}

/// A Docker container managed by anvyl.
///
/// `id` is anvyl's own stable identifier; `docker_id` is the engine's 64-char
/// container ID, null until the engine has acknowledged creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Container {
    /// Stable internal identifier.
    pub id: String,

    /// Engine container ID, once known.
    pub docker_id: Option<String>,

    /// Container name, unique per host.
    pub name: String,

    /// Image reference.
    pub image: String,

    /// Owning host.
    pub host_id: String,

    /// Lifecycle state.
    pub status: ContainerStatus,

    /// JSON object of labels.
    pub labels: String,

    /// JSON array of port mappings (`"8080:80"`).
    pub ports: String,

    /// JSON array of volume mappings (`"/host:/container"`).
    pub volumes: String,

    /// JSON array of environment entries (`"KEY=value"`).
    pub environment: String,

    /// JSON array forming the command, when one was given.
    pub command: Option<String>,

    /// Exit code, once the engine reports one.
    pub exit_code: Option<i64>,

    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,

    /// Last mutation time (UTC).
    pub updated_at: DateTime<Utc>,

    /// Start time reported by the engine.
    pub started_at: Option<DateTime<Utc>>,

    /// Finish time reported by the engine.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Fields for registering a new container row.
#[derive(Debug, Clone)]
pub struct NewContainer {
    /// Container name, unique per host.
    pub name: String,

    /// Image reference.
    pub image: String,

    /// Owning host.
    pub host_id: String,

    /// Labels as a JSON object blob.
    pub labels: String,

    /// Port mappings as a JSON array blob.
    pub ports: String,

    /// Volume mappings as a JSON array blob.
    pub volumes: String,

    /// Environment entries as a JSON array blob.
    pub environment: String,

    /// Command as a JSON array blob, when given.
    pub command: Option<String>,
}

/// Partial update of a container row; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ContainerUpdate {
    /// Engine container ID.
    pub docker_id: Option<String>,

    /// New lifecycle state.
    pub status: Option<ContainerStatus>,

    /// Exit code from the engine.
    pub exit_code: Option<i64>,

    /// Start time from the engine.
    pub started_at: Option<DateTime<Utc>>,

    /// Finish time from the engine.
    pub finished_at: Option<DateTime<Utc>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Host {
    /// Parses the tags blob into a list; invalid JSON yields an empty list.
    pub fn tags_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }
}

impl Container {
    /// Parses the ports blob into a list; invalid JSON yields an empty list.
    pub fn ports_list(&self) -> Vec<String> {
        serde_json::from_str(&self.ports).unwrap_or_default()
    }

    /// Whether the row counts as live for uniqueness and listings.
    pub fn is_active(&self) -> bool {
        !matches!(self.status, ContainerStatus::Removed)
    }
}

impl HostStatus {
    /// The lowercase wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Active => "active",
            HostStatus::Inactive => "inactive",
            HostStatus::Unknown => "unknown",
        }
    }
}

impl ContainerStatus {
    /// The lowercase wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Exited => "exited",
            ContainerStatus::Stopped => "stopped",
            ContainerStatus::Removed => "removed",
            ContainerStatus::Unknown => "unknown",
        }
    }

    /// Maps an engine state string (`running`, `exited`, ...) onto a status.
    pub fn from_engine_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "created" => ContainerStatus::Created,
            "running" => ContainerStatus::Running,
            "exited" | "dead" => ContainerStatus::Exited,
            "paused" | "restarting" => ContainerStatus::Running,
            "removing" => ContainerStatus::Removed,
            _ => ContainerStatus::Unknown,
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
    fn test_engine_state_mapping() {
        assert_eq!(
            ContainerStatus::from_engine_state("running"),
            ContainerStatus::Running
        );
        assert_eq!(
            ContainerStatus::from_engine_state("Exited"),
            ContainerStatus::Exited
        );
        assert_eq!(
            ContainerStatus::from_engine_state("weird"),
            ContainerStatus::Unknown
        );
    }

    #[test]
    fn test_status_round_trips_through_serde() {
        let json = serde_json::to_string(&ContainerStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        let status: ContainerStatus = serde_json::from_str("\"exited\"").unwrap();
        assert_eq!(status, ContainerStatus::Exited);
    }
}
