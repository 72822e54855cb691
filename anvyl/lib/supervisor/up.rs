use std::{process::Stdio, time::Duration};

use tokio::{fs, process::Command, time::Instant};

use crate::{
    config::{AnvylConfig, DEFAULT_HEALTH_DEADLINE_SECS},
    utils, AnvylError, AnvylResult,
};

use super::{pidfile, ServiceKind};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Log lines attached to a spawn failure report.
const FAILURE_LOG_LINES: usize = 20;

/// Poll cadence while waiting for a service to become healthy.
const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(300);

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Starts one service as a detached child and returns its PID.
///
/// A no-op returning the existing PID when the service is already running.
/// The child is detached into its own session, its stdin bound to /dev/null
/// and its merged stdout+stderr appended to the service log file; the
/// supervisor keeps no handle to any of them after the spawn.
pub async fn start(config: &AnvylConfig, service: ServiceKind) -> AnvylResult<u32> {
    let pid_path = utils::pid_file(config.get_state_dir(), service);

    if let Some(pid) = pidfile::validated_pid(&pid_path, &service.cmdline_tokens()).await? {
        tracing::info!(service = %service, pid, "service already running");
        return Ok(pid);
    }

    let log_path = utils::log_file(config.get_state_dir(), service);
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let log_file_err = log_file.try_clone()?;

    let mut command = Command::new(config.get_daemon_exe());
    command
        .arg(service.name())
        .stdin(Stdio::null())
        .stdout(Stdio::from(log_file))
        .stderr(Stdio::from(log_file_err));

    // Detach into a fresh session so the child survives this process and
    // never joins our terminal group.
    unsafe {
        command.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    let child = command.spawn().map_err(|error| AnvylError::SpawnError {
        service: service.name().to_string(),
        message: error.to_string(),
    })?;

    let pid = child.id().ok_or_else(|| AnvylError::SpawnError {
        service: service.name().to_string(),
        message: "child exited before a PID could be read".to_string(),
    })?;

    pidfile::write_pid_file(&pid_path, pid).await?;
    tracing::info!(service = %service, pid, "service started");

    Ok(pid)
}

/// Starts all services in dependency order: infra, then mcp, then agent,
/// each gated on the previous one answering its health endpoint.
///
/// On any failure the services started by this invocation are stopped again
/// before the error surfaces.
pub async fn start_all(config: &AnvylConfig) -> AnvylResult<Vec<(ServiceKind, u32)>> {
    let mut started = Vec::new();

    for service in ServiceKind::all() {
        let result = async {
            let pid = start(config, service).await?;
            wait_healthy(config, service).await?;
            crate::Ok(pid)
        }
        .await;

        match result {
            Result::Ok(pid) => started.push((service, pid)),
            Err(error) => {
                tracing::error!(service = %service, error = %error, "start_all failed, rolling back");

                // The failing service and everything started before it in
                // this invocation get stopped, in reverse order.
                let mut rollback = vec![service];
                rollback.extend(started.iter().rev().map(|(started_service, _)| *started_service));

                for rollback_service in rollback {
                    if let Err(stop_error) = super::stop(config, rollback_service).await {
                        tracing::warn!(
                            service = %rollback_service,
                            error = %stop_error,
                            "rollback stop failed"
                        );
                    }
                }
                return Err(error);
            }
        }
    }

    Ok(started)
}

/// Polls a service's health endpoint until it answers 200 or the deadline
/// passes. A child that dies while we wait fails fast with its log tail.
async fn wait_healthy(config: &AnvylConfig, service: ServiceKind) -> AnvylResult<()> {
    let url = service.health_url(config);
    let deadline = Instant::now() + Duration::from_secs(DEFAULT_HEALTH_DEADLINE_SECS);
    let client = reqwest::Client::new();
    let pid_path = utils::pid_file(config.get_state_dir(), service);

    loop {
        if let Result::Ok(response) = client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            if response.status().is_success() {
                return Ok(());
            }
        }

        if pidfile::validated_pid(&pid_path, &service.cmdline_tokens())
            .await?
            .is_none()
        {
            return Err(spawn_failure(config, service, "process died during startup").await);
        }

        if Instant::now() >= deadline {
            return Err(
                spawn_failure(config, service, "health check did not pass in time").await,
            );
        }

        tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
    }
}

/// Builds a `SpawnError` carrying the tail of the service log.
async fn spawn_failure(config: &AnvylConfig, service: ServiceKind, reason: &str) -> AnvylError {
    let tail = super::tail_lines(config, service, FAILURE_LOG_LINES)
        .await
        .unwrap_or_default();

    let message = if tail.is_empty() {
        reason.to_string()
    } else {
        format!("{}; last log lines:\n{}", reason, tail.join("\n"))
    };

    AnvylError::SpawnError {
        service: service.name().to_string(),
        message,
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> AnvylConfig {
        AnvylConfig::builder()
            .state_dir(dir)
            .daemon_exe("/nonexistent/anvyld")
            .build()
    }

    #[tokio::test]
    async fn test_spawn_failure_surfaces_as_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let err = start(&config, ServiceKind::Infra).await.unwrap_err();
        assert!(matches!(err, AnvylError::SpawnError { .. }));

        // No PID file is left behind for a failed spawn.
        let pid_path = utils::pid_file(config.get_state_dir(), ServiceKind::Infra);
        assert!(!pid_path.exists());
    }
}
