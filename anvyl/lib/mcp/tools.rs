//! The infrastructure tool catalog.
//!
//! Every tool maps 1:1 onto an infrastructure API operation: the handler
//! issues the HTTP call and renders the result as text for the model. The
//! catalog is a static registry keyed by tool name; schemas are declared
//! alongside the handlers.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    infra::{CreateContainerRequest, CreateHostRequest, HostExecRequest, InfraClient},
    AnvylError, AnvylResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A schema-described operation an external model may invoke.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDef {
    /// Tool name.
    pub name: String,

    /// One-line description shown to the model.
    pub description: String,

    /// JSON schema of the arguments object.
    pub input_schema: Value,

    /// Names of the required arguments.
    pub required: Vec<String>,
}

/// The static tool registry, dispatching by name onto the infrastructure API.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    client: InfraClient,
    tools: Vec<ToolDef>,
}

//--------------------------------------------------------------------------------------------------
// Types: Tool Parameters
//--------------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AddHostParams {
    name: String,
    ip: String,
    #[serde(default)]
    os: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HostMetricsParams {
    host_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListContainersParams {
    #[serde(default)]
    host_id: Option<String>,
    #[serde(default)]
    all: bool,
}

#[derive(Debug, Deserialize)]
struct CreateContainerParams {
    name: String,
    image: String,
    #[serde(default)]
    host_id: Option<String>,
    #[serde(default)]
    ports: Vec<String>,
    #[serde(default)]
    volumes: Vec<String>,
    #[serde(default)]
    environment: Vec<String>,
    #[serde(default)]
    labels: std::collections::HashMap<String, String>,
    #[serde(default)]
    command: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RemoveContainerParams {
    container_id: String,
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct ContainerLogsParams {
    container_id: String,
    #[serde(default = "default_tail")]
    tail: u32,
}

#[derive(Debug, Deserialize)]
struct ExecCommandParams {
    container_id: String,
    command: Vec<String>,
    #[serde(default)]
    tty: bool,
}

#[derive(Debug, Deserialize)]
struct HostExecParams {
    host_id: String,
    command: Vec<String>,
    #[serde(default)]
    working_directory: Option<String>,
    #[serde(default)]
    env: Vec<String>,
    #[serde(default)]
    timeout: Option<u64>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ToolRegistry {
    /// Builds the registry over an infrastructure API client.
    pub fn new(client: InfraClient) -> Self {
        Self {
            client,
            tools: catalog(),
        }
    }

    /// The advertised tool catalog.
    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    /// Dispatches a tool call to its handler and returns the rendered text.
    pub async fn call(&self, name: &str, arguments: Value) -> AnvylResult<String> {
        match name {
            "list_hosts" => self.list_hosts().await,
            "add_host" => self.add_host(parse(arguments)?).await,
            "get_host_metrics" => self.get_host_metrics(parse(arguments)?).await,
            "list_containers" => self.list_containers(parse_or_default(arguments)?).await,
            "create_container" => self.create_container(parse(arguments)?).await,
            "remove_container" => self.remove_container(parse(arguments)?).await,
            "get_container_logs" => self.get_container_logs(parse(arguments)?).await,
            "exec_container_command" => self.exec_container_command(parse(arguments)?).await,
            "exec_host_command" => self.exec_host_command(parse(arguments)?).await,
            "get_system_status" => self.get_system_status().await,
            other => Err(AnvylError::NotFound(format!("tool '{}'", other))),
        }
    }

    async fn list_hosts(&self) -> AnvylResult<String> {
        let hosts = self.client.list_hosts().await?;
        if hosts.is_empty() {
            return Ok("No hosts registered.".to_string());
        }

        let mut out = String::from("Registered hosts:\n");
        for host in hosts {
            out.push_str(&format!(
                "- {} (id: {}, ip: {}, status: {}{})\n",
                host.name,
                host.id,
                host.ip,
                host.status.as_str(),
                if host.is_local { ", local" } else { "" },
            ));
            if !host.tags.is_empty() {
                out.push_str(&format!("  tags: {}\n", host.tags.join(", ")));
            }
        }
        Ok(out)
    }

    async fn add_host(&self, params: AddHostParams) -> AnvylResult<String> {
        let host = self
            .client
            .add_host(&CreateHostRequest {
                name: params.name,
                ip: params.ip,
                os: params.os,
                tags: params.tags,
            })
            .await?;

        Ok(format!("Host '{}' registered with id {}.", host.name, host.id))
    }

    async fn get_host_metrics(&self, params: HostMetricsParams) -> AnvylResult<String> {
        let metrics = self.client.host_metrics(&params.host_id).await?;
        Ok(format!(
            "Metrics for host {}:\n{}",
            params.host_id,
            serde_json::to_string_pretty(&metrics)?
        ))
    }

    async fn list_containers(&self, params: ListContainersParams) -> AnvylResult<String> {
        let containers = self
            .client
            .list_containers(params.host_id.as_deref(), params.all)
            .await?;
        if containers.is_empty() {
            return Ok("No containers found.".to_string());
        }

        let mut out = String::from("Containers:\n");
        for container in containers {
            out.push_str(&format!(
                "- {} (id: {}, image: {}, status: {})\n",
                container.name,
                container.id,
                container.image,
                container.status.as_str(),
            ));
            if !container.ports.is_empty() {
                out.push_str(&format!("  ports: {}\n", container.ports.join(", ")));
            }
        }
        Ok(out)
    }

    async fn create_container(&self, params: CreateContainerParams) -> AnvylResult<String> {
        let container = self
            .client
            .create_container(&CreateContainerRequest {
                name: params.name,
                image: params.image,
                host_id: params.host_id,
                ports: params.ports,
                volumes: params.volumes,
                environment: params.environment,
                labels: params.labels,
                command: params.command,
            })
            .await?;

        Ok(format!(
            "Container '{}' created and started with id {}.",
            container.name, container.id
        ))
    }

    async fn remove_container(&self, params: RemoveContainerParams) -> AnvylResult<String> {
        self.client
            .remove_container(&params.container_id, params.force)
            .await?;
        Ok(format!("Container {} removed.", params.container_id))
    }

    async fn get_container_logs(&self, params: ContainerLogsParams) -> AnvylResult<String> {
        let logs = self
            .client
            .container_logs(&params.container_id, params.tail)
            .await?;
        if logs.logs.is_empty() {
            return Ok(format!(
                "No logs available for container {}.",
                params.container_id
            ));
        }

        Ok(format!(
            "Logs for container {}:\n{}",
            params.container_id,
            logs.logs.join("\n")
        ))
    }

    async fn exec_container_command(&self, params: ExecCommandParams) -> AnvylResult<String> {
        let output = self
            .client
            .exec(&params.container_id, params.command, params.tty)
            .await?;

        let mut out = format!("Exit code: {}\n", output.exit_code);
        if !output.stdout.is_empty() {
            out.push_str(&format!("stdout:\n{}\n", output.stdout));
        }
        if !output.stderr.is_empty() {
            out.push_str(&format!("stderr:\n{}\n", output.stderr));
        }
        Ok(out)
    }

    async fn exec_host_command(&self, params: HostExecParams) -> AnvylResult<String> {
        let output = self
            .client
            .host_exec(
                &params.host_id,
                &HostExecRequest {
                    command: params.command,
                    working_directory: params.working_directory,
                    env: params.env,
                    timeout: params.timeout,
                },
            )
            .await?;

        let mut out = format!("Exit code: {}\n", output.exit_code);
        if !output.stdout.is_empty() {
            out.push_str(&format!("stdout:\n{}\n", output.stdout));
        }
        if !output.stderr.is_empty() {
            out.push_str(&format!("stderr:\n{}\n", output.stderr));
        }
        Ok(out)
    }

    async fn get_system_status(&self) -> AnvylResult<String> {
        let status = self.client.system_status().await?;
        Ok(format!(
            "System status:\n- hosts: {}\n- containers: {} running, {} stopped, {} total\n- engine: {}",
            status.hosts,
            status.containers.running,
            status.containers.stopped,
            status.containers.total,
            status.engine,
        ))
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Catalog
//--------------------------------------------------------------------------------------------------

/// The static tool catalog advertised by `tools/list`.
fn catalog() -> Vec<ToolDef> {
    vec![
        tool(
            "list_hosts",
            "List all registered hosts in the infrastructure.",
            json!({"type": "object", "properties": {}}),
            &[],
        ),
        tool(
            "add_host",
            "Register a new host in the infrastructure.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Human-readable host name"},
                    "ip": {"type": "string", "description": "Host IP address"},
                    "os": {"type": "string", "description": "Operating system"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                },
                "required": ["name", "ip"],
            }),
            &["name", "ip"],
        ),
        tool(
            "get_host_metrics",
            "Get CPU, memory and disk metrics for a host.",
            json!({
                "type": "object",
                "properties": {
                    "host_id": {"type": "string", "description": "Host id"},
                },
                "required": ["host_id"],
            }),
            &["host_id"],
        ),
        tool(
            "list_containers",
            "List Docker containers managed by anvyl.",
            json!({
                "type": "object",
                "properties": {
                    "host_id": {"type": "string", "description": "Narrow to one host"},
                    "all": {"type": "boolean", "description": "Include stopped containers"},
                },
            }),
            &[],
        ),
        tool(
            "create_container",
            "Create and start a new Docker container on the local host.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Container name"},
                    "image": {"type": "string", "description": "Image reference"},
                    "host_id": {"type": "string", "description": "Target host (local only)"},
                    "ports": {"type": "array", "items": {"type": "string"}, "description": "host:container port mappings"},
                    "volumes": {"type": "array", "items": {"type": "string"}},
                    "environment": {"type": "array", "items": {"type": "string"}},
                    "labels": {"type": "object", "additionalProperties": {"type": "string"}},
                    "command": {"type": "array", "items": {"type": "string"}},
                },
                "required": ["name", "image"],
            }),
            &["name", "image"],
        ),
        tool(
            "remove_container",
            "Stop and remove a Docker container.",
            json!({
                "type": "object",
                "properties": {
                    "container_id": {"type": "string", "description": "Container id"},
                    "force": {"type": "boolean", "description": "Force-remove a running container"},
                },
                "required": ["container_id"],
            }),
            &["container_id"],
        ),
        tool(
            "get_container_logs",
            "Get recent logs from a Docker container.",
            json!({
                "type": "object",
                "properties": {
                    "container_id": {"type": "string", "description": "Container id"},
                    "tail": {"type": "integer", "description": "Lines from the end", "default": 100},
                },
                "required": ["container_id"],
            }),
            &["container_id"],
        ),
        tool(
            "exec_container_command",
            "Execute a command inside a Docker container.",
            json!({
                "type": "object",
                "properties": {
                    "container_id": {"type": "string", "description": "Container id"},
                    "command": {"type": "array", "items": {"type": "string"}, "description": "argv to run"},
                    "tty": {"type": "boolean", "description": "Allocate a TTY"},
                },
                "required": ["container_id", "command"],
            }),
            &["container_id", "command"],
        ),
        tool(
            "exec_host_command",
            "Execute a command on the local host itself, outside any container.",
            json!({
                "type": "object",
                "properties": {
                    "host_id": {"type": "string", "description": "Host id (local host only)"},
                    "command": {"type": "array", "items": {"type": "string"}, "description": "argv to run"},
                    "working_directory": {"type": "string", "description": "Working directory"},
                    "env": {"type": "array", "items": {"type": "string"}, "description": "KEY=value entries"},
                    "timeout": {"type": "integer", "description": "Seconds before the run is abandoned"},
                },
                "required": ["host_id", "command"],
            }),
            &["host_id", "command"],
        ),
        tool(
            "get_system_status",
            "Get overall system status: host and container counts, engine health.",
            json!({"type": "object", "properties": {}}),
            &[],
        ),
    ]
}

fn tool(name: &str, description: &str, input_schema: Value, required: &[&str]) -> ToolDef {
    ToolDef {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
        required: required.iter().map(|s| s.to_string()).collect(),
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn parse<T: serde::de::DeserializeOwned>(arguments: Value) -> AnvylResult<T> {
    serde_json::from_value(arguments)
        .map_err(|e| AnvylError::Validation(format!("invalid tool arguments: {}", e)))
}

fn parse_or_default<T: serde::de::DeserializeOwned + Default>(arguments: Value) -> AnvylResult<T> {
    if arguments.is_null() {
        return Ok(T::default());
    }
    parse(arguments)
}

fn default_tail() -> u32 {
    crate::config::DEFAULT_LOG_TAIL
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
