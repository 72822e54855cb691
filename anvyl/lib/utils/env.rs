//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Environment variable for the anvyl state directory.
pub const ANVYL_STATE_DIR_ENV_VAR: &str = "ANVYL_STATE_DIR";

/// Environment variable for the database file path.
pub const ANVYL_DB_PATH_ENV_VAR: &str = "ANVYL_DB_PATH";

/// Environment variable for the infrastructure API port.
pub const ANVYL_INFRA_PORT_ENV_VAR: &str = "ANVYL_INFRA_PORT";

/// Environment variable for the MCP server port.
pub const ANVYL_MCP_PORT_ENV_VAR: &str = "ANVYL_MCP_PORT";

/// Environment variable for the agent service port.
pub const ANVYL_AGENT_PORT_ENV_VAR: &str = "ANVYL_AGENT_PORT";

/// Environment variable for the infrastructure API base URL.
pub const ANVYL_INFRA_URL_ENV_VAR: &str = "ANVYL_INFRA_URL";

/// Environment variable for the MCP server URL.
pub const ANVYL_MCP_URL_ENV_VAR: &str = "ANVYL_MCP_URL";

/// Environment variable for the model provider base URL.
pub const ANVYL_MODEL_PROVIDER_URL_ENV_VAR: &str = "ANVYL_MODEL_PROVIDER_URL";

/// Environment variable for the default model name.
pub const ANVYL_MODEL_ENV_VAR: &str = "ANVYL_MODEL";

/// Environment variable for the reconcile interval in seconds.
pub const ANVYL_RECONCILE_INTERVAL_ENV_VAR: &str = "ANVYL_RECONCILE_INTERVAL";

/// Environment variable for the log level filter.
pub const ANVYL_LOG_LEVEL_ENV_VAR: &str = "ANVYL_LOG_LEVEL";

/// Environment variable overriding the path to the `anvyld` executable.
pub const ANVYL_DAEMON_EXE_ENV_VAR: &str = "ANVYL_DAEMON_EXE";

/// Environment variable overriding the Docker engine socket.
pub const ANVYL_DOCKER_HOST_ENV_VAR: &str = "ANVYL_DOCKER_HOST";
