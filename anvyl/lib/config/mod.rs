//! Environment-driven configuration.
//!
//! All knobs are read once at service start from `ANVYL_*` environment
//! variables; invalid numeric values fall back to their defaults with a
//! warning rather than refusing to boot.

mod defaults;

use std::path::PathBuf;

use getset::Getters;
use typed_builder::TypedBuilder;

use crate::utils::{
    self, ANVYL_AGENT_PORT_ENV_VAR, ANVYL_DAEMON_EXE_ENV_VAR, ANVYL_DB_PATH_ENV_VAR,
    ANVYL_DOCKER_HOST_ENV_VAR, ANVYL_INFRA_PORT_ENV_VAR, ANVYL_INFRA_URL_ENV_VAR,
    ANVYL_LOG_LEVEL_ENV_VAR, ANVYL_MCP_PORT_ENV_VAR, ANVYL_MCP_URL_ENV_VAR, ANVYL_MODEL_ENV_VAR,
    ANVYL_MODEL_PROVIDER_URL_ENV_VAR, ANVYL_RECONCILE_INTERVAL_ENV_VAR,
};

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use defaults::*;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Runtime configuration shared by the supervisor and the three services.
///
/// Services read it from the environment via [`AnvylConfig::from_env`]; the
/// builder exists for embedding and tests.
#[derive(Debug, Clone, Getters, TypedBuilder)]
#[getset(get = "pub with_prefix")]
pub struct AnvylConfig {
    /// Root directory for PID files, logs and the database.
    #[builder(default = crate::utils::state_dir(), setter(into))]
    state_dir: PathBuf,

    /// Path to the SQLite database file.
    #[builder(default = crate::utils::db_path(&crate::utils::state_dir()), setter(into))]
    db_path: PathBuf,

    /// Infrastructure API port.
    #[builder(default = DEFAULT_INFRA_PORT)]
    infra_port: u16,

    /// MCP server port.
    #[builder(default = DEFAULT_MCP_PORT)]
    mcp_port: u16,

    /// Agent service port.
    #[builder(default = DEFAULT_AGENT_PORT)]
    agent_port: u16,

    /// Infrastructure API base URL, used by the MCP and agent services.
    #[builder(default = DEFAULT_INFRA_URL.to_string(), setter(into))]
    infra_url: String,

    /// MCP server URL, used by the agent service.
    #[builder(default = DEFAULT_MCP_URL.to_string(), setter(into))]
    mcp_url: String,

    /// Model provider base URL (OpenAI-compatible).
    #[builder(default = DEFAULT_MODEL_PROVIDER_URL.to_string(), setter(into))]
    model_provider_url: String,

    /// Model name requested from the provider.
    #[builder(default = DEFAULT_MODEL.to_string(), setter(into))]
    model: String,

    /// Reconcile interval in seconds.
    #[builder(default = DEFAULT_RECONCILE_INTERVAL_SECS)]
    reconcile_interval_secs: u64,

    /// Log level filter string (`debug|info|warn|error`).
    #[builder(default = DEFAULT_LOG_LEVEL.to_string(), setter(into))]
    log_level: String,

    /// Path to the `anvyld` executable the supervisor spawns.
    #[builder(default = DEFAULT_DAEMON_EXE_PATH.clone(), setter(into))]
    daemon_exe: PathBuf,

    /// Docker engine socket override, when set.
    #[builder(default)]
    docker_host: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl AnvylConfig {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Self {
        let state_dir = utils::state_dir();
        let db_path = std::env::var_os(ANVYL_DB_PATH_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| utils::db_path(&state_dir));

        Self {
            db_path,
            infra_port: env_port(ANVYL_INFRA_PORT_ENV_VAR, DEFAULT_INFRA_PORT),
            mcp_port: env_port(ANVYL_MCP_PORT_ENV_VAR, DEFAULT_MCP_PORT),
            agent_port: env_port(ANVYL_AGENT_PORT_ENV_VAR, DEFAULT_AGENT_PORT),
            infra_url: env_string(ANVYL_INFRA_URL_ENV_VAR, DEFAULT_INFRA_URL),
            mcp_url: env_string(ANVYL_MCP_URL_ENV_VAR, DEFAULT_MCP_URL),
            model_provider_url: env_string(
                ANVYL_MODEL_PROVIDER_URL_ENV_VAR,
                DEFAULT_MODEL_PROVIDER_URL,
            ),
            model: env_string(ANVYL_MODEL_ENV_VAR, DEFAULT_MODEL),
            reconcile_interval_secs: env_u64(
                ANVYL_RECONCILE_INTERVAL_ENV_VAR,
                DEFAULT_RECONCILE_INTERVAL_SECS,
            ),
            log_level: env_string(ANVYL_LOG_LEVEL_ENV_VAR, DEFAULT_LOG_LEVEL),
            daemon_exe: std::env::var_os(ANVYL_DAEMON_EXE_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| DEFAULT_DAEMON_EXE_PATH.clone()),
            docker_host: std::env::var(ANVYL_DOCKER_HOST_ENV_VAR).ok(),
            state_dir,
        }
    }

    /// The address the infrastructure service binds to.
    pub fn infra_bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.infra_port)
    }

    /// The address the MCP server binds to.
    pub fn mcp_bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.mcp_port)
    }

    /// The address the agent service binds to.
    pub fn agent_bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.agent_port)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn env_string(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_port(var: &str, default: u16) -> u16 {
    match std::env::var(var) {
        Result::Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("invalid value for {}: {:?}, using {}", var, value, default);
            default
        }),
        Err(_) => default,
    }
}

fn env_u64(var: &str, default: u64) -> u64 {
    match std::env::var(var) {
        Result::Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("invalid value for {}: {:?}, using {}", var, value, default);
            default
        }),
        Err(_) => default,
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
