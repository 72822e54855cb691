use std::{path::PathBuf, sync::LazyLock};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The default infrastructure API port.
pub const DEFAULT_INFRA_PORT: u16 = 4200;

/// The default MCP server port.
pub const DEFAULT_MCP_PORT: u16 = 4201;

/// The default agent service port.
pub const DEFAULT_AGENT_PORT: u16 = 4202;

/// The default infrastructure API base URL, used by the MCP and agent services.
pub const DEFAULT_INFRA_URL: &str = "http://localhost:4200";

/// The default MCP server URL, used by the agent service.
pub const DEFAULT_MCP_URL: &str = "http://localhost:4201/mcp";

/// The default model provider base URL (an OpenAI-compatible endpoint).
pub const DEFAULT_MODEL_PROVIDER_URL: &str = "http://localhost:11434/v1";

/// The default model name requested from the provider.
pub const DEFAULT_MODEL: &str = "llama-3.2-3b-instruct";

/// The default reconcile interval in seconds.
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 15;

/// The default log level filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The maximum number of model-provider round trips per agent query.
pub const DEFAULT_MAX_ITERATIONS: u32 = 8;

/// The deadline for a single model-provider request.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

/// The deadline for a single Docker engine call.
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 30;

/// The deadline for a single MCP call.
pub const DEFAULT_MCP_TIMEOUT_SECS: u64 = 30;

/// The default stop timeout before SIGKILL, in seconds.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;

/// The deadline for a service health check during `start_all`.
pub const DEFAULT_HEALTH_DEADLINE_SECS: u64 = 30;

/// The default number of log lines returned by container log queries.
pub const DEFAULT_LOG_TAIL: u32 = 100;

/// The default path to the `anvyld` binary, next to the current executable.
pub static DEFAULT_DAEMON_EXE_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("anvyld")))
        .unwrap_or_else(|| PathBuf::from("anvyld"))
});
