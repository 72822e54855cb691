use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Checks whether a process with the given PID exists.
///
/// Sends signal 0, which performs permission and existence checks without
/// delivering anything.
pub fn is_process_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Sends SIGTERM to the given PID. Returns false if the process is gone.
pub fn terminate_process(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
}

/// Sends SIGKILL to the given PID. Returns false if the process is gone.
pub fn kill_process(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).is_ok()
}

/// Checks whether the command line of the given PID contains every token.
///
/// Used by the supervisor to avoid misidentifying a recycled PID that now
/// belongs to an unrelated program. Returns false if the process is gone.
pub fn cmdline_matches(pid: u32, tokens: &[&str]) -> bool {
    let mut system = System::new();
    let sys_pid = sysinfo::Pid::from_u32(pid);
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sys_pid]),
        true,
        ProcessRefreshKind::nothing().with_cmd(sysinfo::UpdateKind::Always),
    );

    let Some(process) = system.process(sys_pid) else {
        return false;
    };

    let cmdline = process
        .cmd()
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");

    tokens.iter().all(|token| cmdline.contains(token))
}

/// Returns the uptime of the given PID in seconds, if the process exists.
pub fn process_uptime_seconds(pid: u32) -> Option<u64> {
    let mut system = System::new();
    let sys_pid = sysinfo::Pid::from_u32(pid);
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sys_pid]),
        true,
        ProcessRefreshKind::nothing(),
    );

    let process = system.process(sys_pid)?;
    let started = process.start_time();
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs();

    Some(now.saturating_sub(started))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_process_is_alive() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn test_dead_child_is_not_alive() {
        let mut child = std::process::Command::new("true")
            .spawn()
            .expect("spawn true");
        let pid = child.id();
        child.wait().expect("wait");
        // After reaping, the PID no longer names our child. It may have been
        // recycled by the OS, so only assert the cmdline no longer matches.
        assert!(!cmdline_matches(pid, &["true"]) || !is_process_alive(pid));
    }

    #[test]
    fn test_cmdline_matches_own_process() {
        // The test binary's argv[0] always contains the crate name.
        assert!(cmdline_matches(std::process::id(), &["anvyl"]));
        assert!(!cmdline_matches(std::process::id(), &["definitely-not-a-real-program"]));
    }
}
