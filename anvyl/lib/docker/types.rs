use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{AnvylError, AnvylResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// One entry from the engine's container listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineContainerSummary {
    /// The engine's 64-char container ID.
    pub docker_id: String,

    /// Container name without the leading slash.
    pub name: String,

    /// Image reference.
    pub image: String,

    /// Engine state string (`running`, `exited`, ...).
    pub state: String,

    /// Labels attached to the container.
    pub labels: HashMap<String, String>,
}

/// The engine's full record for one container.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineContainerDetail {
    /// The engine's 64-char container ID.
    pub docker_id: String,

    /// Container name without the leading slash.
    pub name: String,

    /// Engine state string.
    pub state: String,

    /// Whether the engine reports the container running.
    pub running: bool,

    /// Exit code, when the container has exited.
    pub exit_code: Option<i64>,

    /// Start time reported by the engine.
    pub started_at: Option<DateTime<Utc>>,

    /// Finish time reported by the engine.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Everything the engine needs to create and start one container.
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ContainerSpec {
    /// Container name.
    #[builder(setter(into))]
    pub name: String,

    /// Image reference.
    #[builder(setter(into))]
    pub image: String,

    /// Port mappings in `host:container` form.
    #[builder(default)]
    pub ports: Vec<String>,

    /// Volume mappings in `host:container[:options]` form.
    #[builder(default)]
    pub volumes: Vec<String>,

    /// Environment entries in `KEY=value` form.
    #[builder(default)]
    pub environment: Vec<String>,

    /// Labels to attach.
    #[builder(default)]
    pub labels: HashMap<String, String>,

    /// Command override, when given.
    #[builder(default)]
    pub command: Option<Vec<String>>,
}

/// The outcome of an exec run inside a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecOutput {
    /// Process exit code.
    pub exit_code: i64,

    /// Captured stdout. In TTY mode the streams are merged here.
    pub stdout: String,

    /// Captured stderr. Empty in TTY mode.
    pub stderr: String,
}

/// A point-in-time CPU/memory sample for one container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// CPU usage in percent of one core times core count.
    pub cpu_percent: f64,

    /// Memory in use, bytes.
    pub memory_usage: u64,

    /// Memory limit, bytes.
    pub memory_limit: u64,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Splits a `host:container` port mapping.
///
/// The container side is normalized to the engine's `port/proto` form; a bare
/// `container` port (no colon) exposes without publishing.
pub fn parse_port_mapping(mapping: &str) -> AnvylResult<(Option<String>, String)> {
    let normalize = |port: &str| -> String {
        if port.contains('/') {
            port.to_string()
        } else {
            format!("{}/tcp", port)
        }
    };

    match mapping.split_once(':') {
        Some((host, container)) if !host.is_empty() && !container.is_empty() => {
            host.parse::<u16>().map_err(|_| {
                AnvylError::Validation(format!("invalid host port in mapping '{}'", mapping))
            })?;
            Result::Ok((Some(host.to_string()), normalize(container)))
        }
        Some(_) => Err(AnvylError::Validation(format!(
            "invalid port mapping '{}'",
            mapping
        ))),
        None => {
            mapping.split('/').next().unwrap_or_default().parse::<u16>().map_err(|_| {
                AnvylError::Validation(format!("invalid port mapping '{}'", mapping))
            })?;
            Result::Ok((None, normalize(mapping)))
        }
    }
}

/// Parses an engine RFC 3339 timestamp, treating the zero value as absent.
pub fn parse_engine_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    let parsed = DateTime::parse_from_rfc3339(value).ok()?;
    let utc = parsed.with_timezone(&Utc);

    // The engine reports "0001-01-01T00:00:00Z" for never-set times.
    if utc.timestamp() <= 0 {
        return None;
    }

    Some(utc)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_published_port() {
        let (host, container) = parse_port_mapping("8080:80").unwrap();
        assert_eq!(host.as_deref(), Some("8080"));
        assert_eq!(container, "80/tcp");
    }

    #[test]
    fn test_parse_exposed_port_without_host() {
        let (host, container) = parse_port_mapping("9000/udp").unwrap();
        assert!(host.is_none());
        assert_eq!(container, "9000/udp");
    }

    #[test]
    fn test_parse_bad_mappings() {
        assert!(parse_port_mapping("abc:80").is_err());
        assert!(parse_port_mapping(":80").is_err());
        assert!(parse_port_mapping("nonsense").is_err());
    }

    #[test]
    fn test_engine_zero_time_is_absent() {
        assert!(parse_engine_time(Some("0001-01-01T00:00:00Z")).is_none());
        assert!(parse_engine_time(None).is_none());
        assert!(parse_engine_time(Some("2024-06-01T10:00:00.123456789Z")).is_some());
    }

    #[test]
    fn test_container_spec_builder_defaults() {
        let spec = ContainerSpec::builder()
            .name("web")
            .image("nginx:alpine")
            .build();
        assert!(spec.ports.is_empty());
        assert!(spec.command.is_none());
    }
}
