//! Service lifecycle via PID files and signals.
//!
//! The supervisor is process-external by design: it keeps no state between
//! CLI invocations beyond the PID and log files under the state directory,
//! and so self-recovers from crashes of the front end. A service counts as
//! running only when its PID file exists, the PID is alive, and the process
//! command line still matches the expected daemon invocation.

mod down;
mod logs;
mod pidfile;
mod service;
mod status;
mod up;

use crate::{config::AnvylConfig, AnvylResult};

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use down::*;
pub use logs::*;
pub use pidfile::*;
pub use service::*;
pub use status::*;
pub use up::*;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Restarts one service: stop, then start.
pub async fn restart(config: &AnvylConfig, service: ServiceKind) -> AnvylResult<u32> {
    stop(config, service).await?;
    start(config, service).await
}
