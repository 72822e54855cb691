use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
        RemoveContainerOptions, StartContainerOptions, StatsOptions, StopContainerOptions,
    },
    exec::{CreateExecOptions, StartExecResults},
    models::{HostConfig, PortBinding},
    Docker, API_DEFAULT_VERSION,
};
use futures::StreamExt;

use crate::{config::DEFAULT_ENGINE_TIMEOUT_SECS, AnvylError, AnvylResult};

use super::{
    parse_engine_time, parse_port_mapping, ContainerEngine, ContainerSpec, EngineContainerDetail,
    EngineContainerSummary, EngineStats, ExecOutput, LogStream,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The production [`ContainerEngine`] backed by the local Docker daemon.
pub struct DockerEngine {
    client: Docker,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DockerEngine {
    /// Connects to the engine socket.
    ///
    /// `docker_host` overrides the platform default; `unix://` and `http://`
    /// schemes are understood.
    pub fn connect(docker_host: Option<&str>) -> AnvylResult<Self> {
        let client = match docker_host {
            Some(host) if host.starts_with("http://") || host.starts_with("tcp://") => {
                Docker::connect_with_http(host, DEFAULT_ENGINE_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            Some(host) => {
                let path = host.strip_prefix("unix://").unwrap_or(host);
                Docker::connect_with_socket(path, DEFAULT_ENGINE_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| AnvylError::EngineUnavailable(e.to_string()))?;

        Ok(Self { client })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn ping(&self) -> AnvylResult<()> {
        self.client.ping().await.map_err(classify_engine_error)?;
        Ok(())
    }

    async fn list_containers(&self, all: bool) -> AnvylResult<Vec<EngineContainerSummary>> {
        let summaries = self
            .client
            .list_containers(Some(ListContainersOptions::<String> {
                all,
                ..Default::default()
            }))
            .await
            .map_err(classify_engine_error)?;

        let containers = summaries
            .into_iter()
            .map(|summary| EngineContainerSummary {
                docker_id: summary.id.unwrap_or_default(),
                name: summary
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|name| name.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                image: summary.image.unwrap_or_default(),
                state: summary.state.unwrap_or_default(),
                labels: summary.labels.unwrap_or_default(),
            })
            .collect();

        Ok(containers)
    }

    async fn inspect(&self, docker_id: &str) -> AnvylResult<EngineContainerDetail> {
        let response = self
            .client
            .inspect_container(docker_id, None)
            .await
            .map_err(classify_engine_error)?;

        let state = response.state.unwrap_or_default();

        Ok(EngineContainerDetail {
            docker_id: response.id.unwrap_or_default(),
            name: response
                .name
                .map(|name| name.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            state: state
                .status
                .map(|status| status.to_string())
                .unwrap_or_default(),
            running: state.running.unwrap_or(false),
            exit_code: state.exit_code,
            started_at: parse_engine_time(state.started_at.as_deref()),
            finished_at: parse_engine_time(state.finished_at.as_deref()),
        })
    }

    async fn create_container(&self, spec: &ContainerSpec) -> AnvylResult<String> {
        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();

        for mapping in &spec.ports {
            let (host_port, container_port) = parse_port_mapping(mapping)?;
            exposed_ports.insert(container_port.clone(), HashMap::new());
            if let Some(host_port) = host_port {
                port_bindings.insert(
                    container_port,
                    Some(vec![PortBinding {
                        host_ip: None,
                        host_port: Some(host_port),
                    }]),
                );
            }
        }

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(spec.environment.clone()),
            cmd: spec.command.clone(),
            labels: Some(spec.labels.clone()),
            exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
            host_config: Some(HostConfig {
                binds: (!spec.volumes.is_empty()).then(|| spec.volumes.clone()),
                port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(
                Some(CreateContainerOptions {
                    name: spec.name.clone(),
                    platform: None,
                }),
                config,
            )
            .await
            .map_err(|error| match error {
                // A 404 on create means the image is not available locally.
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => AnvylError::Validation(format!(
                    "image '{}' is not available locally; pull it first",
                    spec.image
                )),
                other => classify_engine_error(other),
            })?;

        Ok(response.id)
    }

    async fn start(&self, docker_id: &str) -> AnvylResult<()> {
        self.client
            .start_container(docker_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(classify_engine_error)?;

        Ok(())
    }

    async fn stop(&self, docker_id: &str, timeout_secs: u64) -> AnvylResult<()> {
        self.client
            .stop_container(
                docker_id,
                Some(StopContainerOptions {
                    t: timeout_secs as i64,
                }),
            )
            .await
            .map_err(classify_engine_error)?;

        Ok(())
    }

    async fn remove(&self, docker_id: &str, force: bool) -> AnvylResult<()> {
        self.client
            .remove_container(
                docker_id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await
            .map_err(classify_engine_error)?;

        Ok(())
    }

    async fn logs(&self, docker_id: &str, tail: u32, follow: bool) -> AnvylResult<LogStream> {
        let stream = self.client.logs(
            docker_id,
            Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                follow,
                tail: tail.to_string(),
                ..Default::default()
            }),
        );

        let lines = stream.map(|chunk| match chunk {
            Result::Ok(output) => {
                let bytes = output.into_bytes();
                Ok(String::from_utf8_lossy(&bytes)
                    .trim_end_matches('\n')
                    .to_string())
            }
            Err(error) => Err(classify_engine_error(error)),
        });

        Ok(Box::pin(lines))
    }

    async fn exec(&self, docker_id: &str, argv: &[String], tty: bool) -> AnvylResult<ExecOutput> {
        let exec = self
            .client
            .create_exec(
                docker_id,
                CreateExecOptions::<String> {
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    tty: Some(tty),
                    cmd: Some(argv.to_vec()),
                    ..Default::default()
                },
            )
            .await
            .map_err(classify_engine_error)?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        match self
            .client
            .start_exec(&exec.id, None)
            .await
            .map_err(classify_engine_error)?
        {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(chunk) = output.next().await {
                    match chunk.map_err(classify_engine_error)? {
                        LogOutput::StdErr { message } if !tty => {
                            stderr.push_str(&String::from_utf8_lossy(&message));
                        }
                        other => {
                            stdout.push_str(&String::from_utf8_lossy(&other.into_bytes()));
                        }
                    }
                }
            }
            StartExecResults::Detached => {}
        }

        let inspect = self
            .client
            .inspect_exec(&exec.id)
            .await
            .map_err(classify_engine_error)?;

        Ok(ExecOutput {
            exit_code: inspect.exit_code.unwrap_or(0),
            stdout,
            stderr,
        })
    }

    async fn stats(&self, docker_id: &str) -> AnvylResult<EngineStats> {
        let mut stream = self.client.stats(
            docker_id,
            Some(StatsOptions {
                stream: false,
                one_shot: false,
            }),
        );

        let stats = stream
            .next()
            .await
            .ok_or_else(|| AnvylError::NotFound(format!("container '{}'", docker_id)))?
            .map_err(classify_engine_error)?;

        let cpu_delta = stats.cpu_stats.cpu_usage.total_usage as f64
            - stats.precpu_stats.cpu_usage.total_usage as f64;
        let system_delta = stats.cpu_stats.system_cpu_usage.unwrap_or(0) as f64
            - stats.precpu_stats.system_cpu_usage.unwrap_or(0) as f64;
        let online_cpus = stats.cpu_stats.online_cpus.unwrap_or(1) as f64;

        let cpu_percent = if system_delta > 0.0 && cpu_delta >= 0.0 {
            (cpu_delta / system_delta) * online_cpus * 100.0
        } else {
            0.0
        };

        Ok(EngineStats {
            cpu_percent,
            memory_usage: stats.memory_stats.usage.unwrap_or(0),
            memory_limit: stats.memory_stats.limit.unwrap_or(0),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Classifies an engine-library error into the crate's error kinds.
fn classify_engine_error(error: bollard::errors::Error) -> AnvylError {
    match error {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => match status_code {
            404 => AnvylError::NotFound(message),
            409 => AnvylError::Conflict(message),
            400 | 422 => AnvylError::Validation(message),
            _ => AnvylError::EngineUnavailable(message),
        },
        other => AnvylError::EngineUnavailable(other.to_string()),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(status_code: u16, message: &str) -> bollard::errors::Error {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_engine_error_classification() {
        assert!(matches!(
            classify_engine_error(server_error(404, "no such container")),
            AnvylError::NotFound(_)
        ));
        assert!(matches!(
            classify_engine_error(server_error(409, "name in use")),
            AnvylError::Conflict(_)
        ));
        assert!(matches!(
            classify_engine_error(server_error(400, "bad spec")),
            AnvylError::Validation(_)
        ));
        assert!(matches!(
            classify_engine_error(server_error(500, "engine on fire")),
            AnvylError::EngineUnavailable(_)
        ));
    }
}
