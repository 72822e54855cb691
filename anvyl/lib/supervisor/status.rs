use serde::{Deserialize, Serialize};

use crate::{config::AnvylConfig, utils, AnvylResult};

use super::{pidfile, ServiceKind};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The supervisor's view of one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Service name.
    pub service: String,

    /// Whether the liveness discipline holds: PID file present, process
    /// alive, command line matching.
    pub running: bool,

    /// The service PID, when running.
    pub pid: Option<u32>,

    /// Seconds since the process started, when running.
    pub uptime_seconds: Option<u64>,

    /// The port the service listens on, when running.
    pub port: Option<u16>,
}

/// Status of the whole stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackStatus {
    /// Per-service status in start order.
    pub services: Vec<ServiceStatus>,

    /// True when every service is running.
    pub healthy: bool,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Reports the status of one service, lazily deleting stale PID files.
pub async fn status(config: &AnvylConfig, service: ServiceKind) -> AnvylResult<ServiceStatus> {
    let pid_path = utils::pid_file(config.get_state_dir(), service);

    let Some(pid) = pidfile::validated_pid(&pid_path, &service.cmdline_tokens()).await? else {
        return Ok(ServiceStatus {
            service: service.name().to_string(),
            running: false,
            pid: None,
            uptime_seconds: None,
            port: None,
        });
    };

    Ok(ServiceStatus {
        service: service.name().to_string(),
        running: true,
        pid: Some(pid),
        uptime_seconds: utils::process_uptime_seconds(pid),
        port: Some(service.port(config)),
    })
}

/// Reports per-service status plus aggregate health.
pub async fn status_all(config: &AnvylConfig) -> AnvylResult<StackStatus> {
    let mut services = Vec::new();
    for service in ServiceKind::all() {
        services.push(status(config, service).await?);
    }

    let healthy = services.iter().all(|status| status.running);
    Ok(StackStatus { services, healthy })
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
