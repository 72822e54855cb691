use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::DEFAULT_MCP_TIMEOUT_SECS,
    docker::{EngineStats, ExecOutput},
    AnvylError, AnvylResult,
};

use super::{
    ContainerResponse, CreateContainerRequest, CreateHostRequest, ErrorResponse, HealthResponse,
    HostExecRequest, HostResponse, LogsResponse, StopContainerRequest, SystemStatusResponse,
    UpdateHostRequest,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// HTTP client for the infrastructure API.
///
/// Used by the MCP server's tool handlers, the CLI's host/container verbs,
/// and the supervisor's health checks. Transport failures surface as
/// [`AnvylError::Http`]; API failures are mapped back from the response
/// status to the kind the service raised.
#[derive(Debug, Clone)]
pub struct InfraClient {
    base_url: String,
    http: reqwest::Client,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl InfraClient {
    /// Creates a client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_MCP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Checks the service health endpoint.
    pub async fn health(&self) -> AnvylResult<HealthResponse> {
        let response = self.http.get(self.url("/health")).send().await?;
        decode(response).await
    }

    /// Lists hosts.
    pub async fn list_hosts(&self) -> AnvylResult<Vec<HostResponse>> {
        let response = self.http.get(self.url("/hosts")).send().await?;
        decode(response).await
    }

    /// Fetches one host.
    pub async fn get_host(&self, id: &str) -> AnvylResult<HostResponse> {
        let response = self
            .http
            .get(self.url(&format!("/hosts/{}", id)))
            .send()
            .await?;
        decode(response).await
    }

    /// Registers a host reference.
    pub async fn add_host(&self, request: &CreateHostRequest) -> AnvylResult<HostResponse> {
        let response = self
            .http
            .post(self.url("/hosts"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    /// Applies a partial host update.
    pub async fn update_host(
        &self,
        id: &str,
        request: &UpdateHostRequest,
    ) -> AnvylResult<HostResponse> {
        let response = self
            .http
            .put(self.url(&format!("/hosts/{}", id)))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    /// Removes a host.
    pub async fn remove_host(&self, id: &str) -> AnvylResult<Value> {
        let response = self
            .http
            .delete(self.url(&format!("/hosts/{}", id)))
            .send()
            .await?;
        decode(response).await
    }

    /// Runs a command on a host (local host only).
    pub async fn host_exec(
        &self,
        id: &str,
        request: &HostExecRequest,
    ) -> AnvylResult<ExecOutput> {
        let response = self
            .http
            .post(self.url(&format!("/hosts/{}/exec", id)))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    /// Fetches metrics for a host.
    pub async fn host_metrics(&self, id: &str) -> AnvylResult<Value> {
        let response = self
            .http
            .get(self.url(&format!("/hosts/{}/metrics", id)))
            .send()
            .await?;
        decode(response).await
    }

    /// Lists containers.
    pub async fn list_containers(
        &self,
        host_id: Option<&str>,
        all: bool,
    ) -> AnvylResult<Vec<ContainerResponse>> {
        let mut request = self.http.get(self.url("/containers"));
        if let Some(host_id) = host_id {
            request = request.query(&[("host_id", host_id)]);
        }
        if all {
            request = request.query(&[("all", "true")]);
        }

        let response = request.send().await?;
        decode(response).await
    }

    /// Fetches one container by internal or engine id.
    pub async fn get_container(&self, id: &str) -> AnvylResult<ContainerResponse> {
        let response = self
            .http
            .get(self.url(&format!("/containers/{}", id)))
            .send()
            .await?;
        decode(response).await
    }

    /// Creates and starts a container on the local host.
    pub async fn create_container(
        &self,
        request: &CreateContainerRequest,
    ) -> AnvylResult<ContainerResponse> {
        let response = self
            .http
            .post(self.url("/containers"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    /// Stops a container.
    pub async fn stop_container(
        &self,
        id: &str,
        timeout: Option<u64>,
    ) -> AnvylResult<ContainerResponse> {
        let response = self
            .http
            .post(self.url(&format!("/containers/{}/stop", id)))
            .json(&StopContainerRequest { timeout })
            .send()
            .await?;
        decode(response).await
    }

    /// Stops and removes a container.
    pub async fn remove_container(&self, id: &str, force: bool) -> AnvylResult<Value> {
        let mut request = self.http.delete(self.url(&format!("/containers/{}", id)));
        if force {
            request = request.query(&[("force", "true")]);
        }

        let response = request.send().await?;
        decode(response).await
    }

    /// Fetches the last `tail` log lines of a container.
    pub async fn container_logs(&self, id: &str, tail: u32) -> AnvylResult<LogsResponse> {
        let response = self
            .http
            .get(self.url(&format!("/containers/{}/logs", id)))
            .query(&[("tail", tail.to_string())])
            .send()
            .await?;
        decode(response).await
    }

    /// Runs a command inside a container.
    pub async fn exec(&self, id: &str, command: Vec<String>, tty: bool) -> AnvylResult<ExecOutput> {
        let response = self
            .http
            .post(self.url(&format!("/containers/{}/exec", id)))
            .json(&super::ExecRequest { command, tty })
            .send()
            .await?;
        decode(response).await
    }

    /// Fetches live stats for a container.
    pub async fn container_stats(&self, id: &str) -> AnvylResult<EngineStats> {
        let response = self
            .http
            .get(self.url(&format!("/containers/{}/stats", id)))
            .send()
            .await?;
        decode(response).await
    }

    /// Fetches the system status summary.
    pub async fn system_status(&self) -> AnvylResult<SystemStatusResponse> {
        let response = self.http.get(self.url("/system/status")).send().await?;
        decode(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Decodes a response, mapping error statuses back to error kinds.
async fn decode<T: DeserializeOwned>(response: Response) -> AnvylResult<T> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = match response.json::<ErrorResponse>().await {
        Result::Ok(body) => body.message,
        Err(_) => format!("request failed with status {}", status),
    };

    Err(match status {
        StatusCode::BAD_REQUEST => AnvylError::Validation(message),
        StatusCode::NOT_FOUND => AnvylError::NotFound(message),
        StatusCode::CONFLICT => AnvylError::Conflict(message),
        StatusCode::SERVICE_UNAVAILABLE => AnvylError::EngineUnavailable(message),
        StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            AnvylError::ProviderUnavailable(message)
        }
        _ => AnvylError::Internal(message),
    })
}
