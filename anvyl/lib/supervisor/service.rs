use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AnvylConfig;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// File name of the service daemon binary.
pub const DAEMON_BIN: &str = "anvyld";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// One of the three long-lived services managed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// The infrastructure service and HTTP API.
    Infra,

    /// The MCP protocol server.
    Mcp,

    /// The AI agent service.
    Agent,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServiceKind {
    /// All services in start order. The infra service comes first because
    /// the other two call into it.
    pub fn all() -> [ServiceKind; 3] {
        [ServiceKind::Infra, ServiceKind::Mcp, ServiceKind::Agent]
    }

    /// The short name used for PID files, log files and daemon arguments.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Infra => "infra",
            ServiceKind::Mcp => "mcp",
            ServiceKind::Agent => "agent",
        }
    }

    /// The port the service listens on.
    pub fn port(&self, config: &AnvylConfig) -> u16 {
        match self {
            ServiceKind::Infra => *config.get_infra_port(),
            ServiceKind::Mcp => *config.get_mcp_port(),
            ServiceKind::Agent => *config.get_agent_port(),
        }
    }

    /// The health endpoint the supervisor probes during `start_all`.
    pub fn health_url(&self, config: &AnvylConfig) -> String {
        format!("http://localhost:{}/health", self.port(config))
    }

    /// Tokens that must all appear in a process's command line for a PID to
    /// be attributed to this service. Guards against recycled PIDs.
    pub fn cmdline_tokens(&self) -> [&'static str; 2] {
        [DAEMON_BIN, self.name()]
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ServiceKind {
    type Err = crate::AnvylError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "infra" => Result::Ok(ServiceKind::Infra),
            "mcp" => Result::Ok(ServiceKind::Mcp),
            "agent" => Result::Ok(ServiceKind::Agent),
            other => Err(crate::AnvylError::Validation(format!(
                "unknown service '{}', expected infra, mcp or agent",
                other
            ))),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_order_is_infra_first() {
        assert_eq!(
            ServiceKind::all(),
            [ServiceKind::Infra, ServiceKind::Mcp, ServiceKind::Agent]
        );
    }

    #[test]
    fn test_parse_round_trip() {
        for service in ServiceKind::all() {
            let parsed: ServiceKind = service.name().parse().unwrap();
            assert_eq!(parsed, service);
        }
        assert!("web".parse::<ServiceKind>().is_err());
    }
}
