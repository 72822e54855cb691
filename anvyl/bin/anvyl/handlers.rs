//! Subcommand handlers for the `anvyl` CLI.
//!
//! Handlers print line-oriented text and bubble errors up to `main`, which
//! turns them into the documented exit codes.

use std::process::ExitCode;
use std::time::Duration;

use anvyl::{
    agent::{QueryRequest, QueryResponse},
    cli::{AgentSubcommand, ContainerSubcommand, HostSubcommand, ServiceSubcommand},
    config::AnvylConfig,
    infra::{CreateContainerRequest, CreateHostRequest, HostExecRequest, InfraClient},
    supervisor::{self, ServiceKind},
    AnvylError, AnvylResult,
};
use futures::StreamExt;

//--------------------------------------------------------------------------------------------------
// Functions: Stack Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for `anvyl up`.
pub async fn up_subcommand(config: &AnvylConfig) -> AnvylResult<()> {
    let started = supervisor::start_all(config).await?;
    for (service, pid) in started {
        println!("{} running (pid {})", service, pid);
    }
    Ok(())
}

/// Handler for `anvyl down`.
pub async fn down_subcommand(config: &AnvylConfig) -> AnvylResult<()> {
    for (service, stopped) in supervisor::stop_all(config).await? {
        if stopped {
            println!("{} stopped", service);
        } else {
            println!("{} was not running", service);
        }
    }
    Ok(())
}

/// Handler for `anvyl restart`.
pub async fn restart_subcommand(config: &AnvylConfig) -> AnvylResult<()> {
    supervisor::stop_all(config).await?;
    up_subcommand(config).await
}

/// Handler for `anvyl status`.
pub async fn status_subcommand(config: &AnvylConfig) -> AnvylResult<()> {
    let stack = supervisor::status_all(config).await?;

    for status in &stack.services {
        if status.running {
            println!(
                "{:<6} running  pid={:<8} uptime={}s  port={}",
                status.service,
                status.pid.unwrap_or_default(),
                status.uptime_seconds.unwrap_or_default(),
                status.port.unwrap_or_default(),
            );
        } else {
            println!("{:<6} stopped", status.service);
        }
    }

    println!(
        "stack: {}",
        if stack.healthy { "healthy" } else { "degraded" }
    );
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Service Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for `anvyl infra|mcp|agent <up|down|status|logs>`.
pub async fn service_subcommand(
    config: &AnvylConfig,
    service: ServiceKind,
    subcommand: ServiceSubcommand,
) -> AnvylResult<()> {
    match subcommand {
        ServiceSubcommand::Up => {
            let pid = supervisor::start(config, service).await?;
            println!("{} running (pid {})", service, pid);
        }
        ServiceSubcommand::Down => {
            if supervisor::stop(config, service).await? {
                println!("{} stopped", service);
            } else {
                println!("{} was not running", service);
            }
        }
        ServiceSubcommand::Status => {
            let status = supervisor::status(config, service).await?;
            if status.running {
                println!(
                    "{} running  pid={}  uptime={}s  port={}",
                    status.service,
                    status.pid.unwrap_or_default(),
                    status.uptime_seconds.unwrap_or_default(),
                    status.port.unwrap_or_default(),
                );
            } else {
                println!("{} stopped", status.service);
            }
        }
        ServiceSubcommand::Logs { tail, follow } => {
            print_log_stream(config, service, tail, follow).await?;
        }
    }
    Ok(())
}

/// Handler for `anvyl agent <...>`, which adds `query` on top of the shared
/// lifecycle verbs.
pub async fn agent_subcommand(
    config: &AnvylConfig,
    subcommand: AgentSubcommand,
) -> AnvylResult<()> {
    match subcommand {
        AgentSubcommand::Up => {
            service_subcommand(config, ServiceKind::Agent, ServiceSubcommand::Up).await
        }
        AgentSubcommand::Down => {
            service_subcommand(config, ServiceKind::Agent, ServiceSubcommand::Down).await
        }
        AgentSubcommand::Status => {
            service_subcommand(config, ServiceKind::Agent, ServiceSubcommand::Status).await
        }
        AgentSubcommand::Logs { tail, follow } => {
            service_subcommand(
                config,
                ServiceKind::Agent,
                ServiceSubcommand::Logs { tail, follow },
            )
            .await
        }
        AgentSubcommand::Query { text, host_id } => query_subcommand(config, text, host_id).await,
    }
}

async fn query_subcommand(
    config: &AnvylConfig,
    text: String,
    host_id: Option<String>,
) -> AnvylResult<()> {
    // The agent may spend a full provider deadline per iteration.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(600))
        .build()
        .unwrap_or_default();

    let url = format!("http://localhost:{}/query", config.get_agent_port());
    let response = client
        .post(&url)
        .json(&QueryRequest {
            query: text,
            host_id,
        })
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let message = response.text().await.unwrap_or_default();
        return Err(AnvylError::ProviderUnavailable(format!(
            "agent returned {}: {}",
            status, message
        )));
    }

    let reply: QueryResponse = response.json().await?;

    for call in &reply.tool_calls {
        println!("[tool] {} {}", call.name, call.arguments);
    }
    println!("{}", reply.reply);
    println!("(model: {})", reply.model);

    Ok(())
}

async fn print_log_stream(
    config: &AnvylConfig,
    service: ServiceKind,
    tail: Option<usize>,
    follow: bool,
) -> AnvylResult<()> {
    let mut stream = supervisor::view_logs(config, service, tail, follow).await?;
    while let Some(chunk) = stream.next().await {
        print!("{}", chunk?);
    }
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Inventory Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for `anvyl host <...>`.
pub async fn host_subcommand(config: &AnvylConfig, subcommand: HostSubcommand) -> AnvylResult<()> {
    let client = infra_client(config);

    match subcommand {
        HostSubcommand::List => {
            for host in client.list_hosts().await? {
                println!(
                    "{}  {:<16} {:<15} {}{}",
                    host.id,
                    host.name,
                    host.ip,
                    host.status.as_str(),
                    if host.is_local { " (local)" } else { "" },
                );
            }
        }
        HostSubcommand::Add { name, ip, os, tags } => {
            let host = client
                .add_host(&CreateHostRequest { name, ip, os, tags })
                .await?;
            println!("host {} registered (id {})", host.name, host.id);
        }
        HostSubcommand::Metrics { id } => {
            let metrics = client.host_metrics(&id).await?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        HostSubcommand::Exec {
            id,
            workdir,
            envs,
            timeout,
            command,
        } => {
            let output = client
                .host_exec(
                    &id,
                    &HostExecRequest {
                        command,
                        working_directory: workdir,
                        env: envs,
                        timeout,
                    },
                )
                .await?;
            if !output.stdout.is_empty() {
                print!("{}", output.stdout);
            }
            if !output.stderr.is_empty() {
                eprint!("{}", output.stderr);
            }
            if output.exit_code != 0 {
                println!("(exit code {})", output.exit_code);
            }
        }
    }

    Ok(())
}

/// Handler for `anvyl container <...>`.
pub async fn container_subcommand(
    config: &AnvylConfig,
    subcommand: ContainerSubcommand,
) -> AnvylResult<()> {
    let client = infra_client(config);

    match subcommand {
        ContainerSubcommand::List { host_id, all } => {
            for container in client.list_containers(host_id.as_deref(), all).await? {
                println!(
                    "{}  {:<20} {:<24} {}",
                    container.id,
                    container.name,
                    container.image,
                    container.status.as_str(),
                );
            }
        }
        ContainerSubcommand::Create {
            name,
            image,
            ports,
            volumes,
            envs,
            command,
        } => {
            let container = client
                .create_container(&CreateContainerRequest {
                    name,
                    image,
                    host_id: None,
                    ports,
                    volumes,
                    environment: envs,
                    labels: Default::default(),
                    command: (!command.is_empty()).then_some(command),
                })
                .await?;
            println!(
                "container {} running (id {}, docker id {})",
                container.name,
                container.id,
                container.docker_id.unwrap_or_default(),
            );
        }
        ContainerSubcommand::Stop { id, timeout } => {
            let container = client.stop_container(&id, timeout).await?;
            println!("container {} stopped", container.id);
        }
        ContainerSubcommand::Remove { id, force } => {
            client.remove_container(&id, force).await?;
            println!("container {} removed", id);
        }
        ContainerSubcommand::Logs { id, tail } => {
            let logs = client
                .container_logs(&id, tail.unwrap_or(anvyl::config::DEFAULT_LOG_TAIL))
                .await?;
            for line in logs.logs {
                println!("{}", line);
            }
        }
        ContainerSubcommand::Exec { id, tty, command } => {
            let output = client.exec(&id, command, tty).await?;
            if !output.stdout.is_empty() {
                print!("{}", output.stdout);
            }
            if !output.stderr.is_empty() {
                eprint!("{}", output.stderr);
            }
            if output.exit_code != 0 {
                println!("(exit code {})", output.exit_code);
            }
        }
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn infra_client(config: &AnvylConfig) -> InfraClient {
    InfraClient::new(config.get_infra_url().clone())
}

/// Prints a one-line error summary with a remediation hint and picks the
/// exit code: 1 generic, 3 service not running, 4 backend unavailable.
pub fn report_error(error: &AnvylError) -> ExitCode {
    let hint = match error {
        AnvylError::EngineUnavailable(_) => " (check that Docker is running)",
        AnvylError::ProviderUnavailable(_) => " (check the model provider endpoint)",
        AnvylError::Http(_) => " (is the service running? try `anvyl up`)",
        AnvylError::SpawnError { .. } => " (see the service log for details)",
        _ => "",
    };

    eprintln!("{}: {}{}", error.kind(), error, hint);

    match error {
        AnvylError::Http(_) => ExitCode::from(3),
        AnvylError::EngineUnavailable(_) | AnvylError::ProviderUnavailable(_) => ExitCode::from(4),
        AnvylError::Validation(_) => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}
