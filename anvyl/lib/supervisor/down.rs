use std::time::Duration;

use tokio::time::Instant;

use crate::{
    config::{AnvylConfig, DEFAULT_STOP_TIMEOUT_SECS},
    utils, AnvylResult,
};

use super::{pidfile, ServiceKind};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Poll cadence while waiting for a terminated process to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Stops one service: SIGTERM, a grace period, then SIGKILL.
///
/// Idempotent; returns whether a process was actually stopped. The PID file
/// is removed in every case.
pub async fn stop(config: &AnvylConfig, service: ServiceKind) -> AnvylResult<bool> {
    let pid_path = utils::pid_file(config.get_state_dir(), service);

    let Some(pid) = pidfile::validated_pid(&pid_path, &service.cmdline_tokens()).await? else {
        return Ok(false);
    };

    tracing::info!(service = %service, pid, "stopping service");
    utils::terminate_process(pid);

    let deadline = Instant::now() + Duration::from_secs(DEFAULT_STOP_TIMEOUT_SECS);
    while utils::is_process_alive(pid) {
        if Instant::now() >= deadline {
            tracing::warn!(service = %service, pid, "grace period elapsed, sending SIGKILL");
            utils::kill_process(pid);
            break;
        }
        tokio::time::sleep(EXIT_POLL_INTERVAL).await;
    }

    pidfile::remove_pid_file(&pid_path).await?;
    tracing::info!(service = %service, pid, "service stopped");

    Ok(true)
}

/// Stops all services in reverse dependency order: agent, mcp, infra.
pub async fn stop_all(config: &AnvylConfig) -> AnvylResult<Vec<(ServiceKind, bool)>> {
    let mut stopped = Vec::new();

    for service in ServiceKind::all().into_iter().rev() {
        let result = stop(config, service).await?;
        stopped.push((service, result));
    }

    Ok(stopped)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
