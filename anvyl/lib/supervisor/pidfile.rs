use std::path::Path;

use tokio::fs;

use crate::{AnvylResult, utils};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Writes a PID file: the decimal PID followed by a newline.
pub async fn write_pid_file(path: &Path, pid: u32) -> AnvylResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, format!("{}\n", pid)).await?;
    Ok(())
}

/// Reads a PID file. Returns `None` when the file is missing; a file with
/// unparseable content is treated as stale and deleted.
pub async fn read_pid_file(path: &Path) -> AnvylResult<Option<u32>> {
    if !fs::try_exists(path).await? {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).await?;
    match contents.trim().parse::<u32>() {
        Result::Ok(pid) => Ok(Some(pid)),
        Err(_) => {
            tracing::warn!(path = %path.display(), "removing unparseable PID file");
            fs::remove_file(path).await?;
            Ok(None)
        }
    }
}

/// Deletes a PID file if it exists.
pub async fn remove_pid_file(path: &Path) -> AnvylResult<()> {
    if fs::try_exists(path).await? {
        fs::remove_file(path).await?;
    }
    Ok(())
}

/// Reads the PID file and validates the liveness discipline: the file must
/// exist, the PID must be alive, and the process command line must still
/// match the expected tokens. A mismatch means "not running" and the stale
/// file is removed.
pub async fn validated_pid(path: &Path, tokens: &[&str]) -> AnvylResult<Option<u32>> {
    let Some(pid) = read_pid_file(path).await? else {
        return Ok(None);
    };

    if utils::is_process_alive(pid) && utils::cmdline_matches(pid, tokens) {
        return Ok(Some(pid));
    }

    tracing::debug!(pid, path = %path.display(), "removing stale PID file");
    remove_pid_file(path).await?;
    Ok(None)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pid_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pids").join("infra.pid");

        write_pid_file(&path, 4242).await.unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "4242\n");

        assert_eq!(read_pid_file(&path).await.unwrap(), Some(4242));

        remove_pid_file(&path).await.unwrap();
        assert_eq!(read_pid_file(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_pid_file_is_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infra.pid");
        tokio::fs::write(&path, "not-a-pid\n").await.unwrap();

        assert_eq!(read_pid_file(&path).await.unwrap(), None);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_dead_pid_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infra.pid");
        // A PID far above any default pid_max.
        write_pid_file(&path, 99_999_999).await.unwrap();

        let pid = validated_pid(&path, &["anvyld", "infra"]).await.unwrap();
        assert_eq!(pid, None);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_recycled_pid_with_wrong_cmdline_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infra.pid");
        // Our own PID is alive but is not an anvyld process.
        write_pid_file(&path, std::process::id()).await.unwrap();

        let pid = validated_pid(&path, &["anvyld", "infra"]).await.unwrap();
        assert_eq!(pid, None);
        assert!(!path.exists());
    }
}
