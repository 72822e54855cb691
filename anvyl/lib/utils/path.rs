use std::path::PathBuf;

use crate::supervisor::ServiceKind;

use super::ANVYL_STATE_DIR_ENV_VAR;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The sub directory of `$HOME` where anvyl state is stored by default.
pub const ANVYL_HOME_DIR: &str = ".anvyl";

/// The sub directory where service PID files are stored.
pub const PID_SUBDIR: &str = "pids";

/// The sub directory where service log files are stored.
pub const LOG_SUBDIR: &str = "logs";

/// The filename of the SQLite database, owned by the infrastructure service.
pub const DB_FILENAME: &str = "db.sqlite";

/// The suffix for PID files.
pub const PID_SUFFIX: &str = "pid";

/// The suffix for log files.
pub const LOG_SUFFIX: &str = "log";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the anvyl state directory, honoring `ANVYL_STATE_DIR`.
pub fn state_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(ANVYL_STATE_DIR_ENV_VAR) {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(ANVYL_HOME_DIR)
    }
}

/// Returns the PID file path for a service under the given state directory.
pub fn pid_file(state_dir: &std::path::Path, service: ServiceKind) -> PathBuf {
    state_dir
        .join(PID_SUBDIR)
        .join(format!("{}.{}", service.name(), PID_SUFFIX))
}

/// Returns the log file path for a service under the given state directory.
pub fn log_file(state_dir: &std::path::Path, service: ServiceKind) -> PathBuf {
    state_dir
        .join(LOG_SUBDIR)
        .join(format!("{}.{}", service.name(), LOG_SUFFIX))
}

/// Returns the default database path under the given state directory.
pub fn db_path(state_dir: &std::path::Path) -> PathBuf {
    state_dir.join(DB_FILENAME)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
