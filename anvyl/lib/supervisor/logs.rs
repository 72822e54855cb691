use std::{pin::Pin, time::Duration};

use futures::Stream;
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncSeekExt},
    time,
};

use crate::{config::AnvylConfig, utils, AnvylResult};

use super::ServiceKind;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

type BoxedStream = Pin<Box<dyn Stream<Item = AnvylResult<String>> + Send>>;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Streams a service's log file.
///
/// Yields the tail (or whole file) once; with `follow` it then keeps
/// polling the file for appended bytes, the way `tail -f` does.
pub async fn view_logs(
    config: &AnvylConfig,
    service: ServiceKind,
    tail: Option<usize>,
    follow: bool,
) -> AnvylResult<BoxedStream> {
    let log_path = utils::log_file(config.get_state_dir(), service);

    if !fs::try_exists(&log_path).await? {
        let msg = format!("no logs found for service '{}'", service);
        return Ok(Box::pin(futures::stream::once(futures::future::ready(Ok(
            msg,
        )))));
    }

    let content = fs::read_to_string(&log_path).await?;
    let content = match tail {
        Some(n) => {
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(n);
            lines[start..].join("\n")
        }
        None => content,
    };

    let initial_content = if content.ends_with('\n') || content.is_empty() {
        content
    } else {
        content + "\n"
    };

    if !follow {
        return Ok(Box::pin(futures::stream::once(futures::future::ready(Ok(
            initial_content,
        )))));
    }

    let stream = async_stream::stream! {
        yield Ok(initial_content);

        let mut last_size = match fs::metadata(&log_path).await {
            Result::Ok(metadata) => metadata.len(),
            Err(error) => {
                yield Err(error.into());
                return;
            }
        };
        let mut interval = time::interval(Duration::from_millis(200));

        loop {
            interval.tick().await;

            // The file going away ends the stream.
            match fs::try_exists(&log_path).await {
                Result::Ok(true) => {}
                _ => break,
            }

            let current_size = match fs::metadata(&log_path).await {
                Result::Ok(metadata) => metadata.len(),
                Err(_) => break,
            };

            if current_size > last_size {
                match read_from(&log_path, last_size).await {
                    Result::Ok(new_content) => {
                        last_size = current_size;
                        yield Ok(new_content);
                    }
                    Err(error) => {
                        yield Err(error);
                        break;
                    }
                }
            }
        }
    };

    Ok(Box::pin(stream))
}

/// Reads a file from a byte offset to its current end.
async fn read_from(path: &std::path::Path, offset: u64) -> AnvylResult<String> {
    let mut file = fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(offset)).await?;
    let mut content = String::new();
    file.read_to_string(&mut content).await?;
    Ok(content)
}

/// Returns the last `n` lines of a service's log file.
pub async fn tail_lines(
    config: &AnvylConfig,
    service: ServiceKind,
    n: usize,
) -> AnvylResult<Vec<String>> {
    let log_path = utils::log_file(config.get_state_dir(), service);

    if !fs::try_exists(&log_path).await? {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&log_path).await?;
    let lines: Vec<String> = content.lines().map(String::from).collect();
    let start = lines.len().saturating_sub(n);

    Ok(lines[start..].to_vec())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn test_config(dir: &std::path::Path) -> AnvylConfig {
        AnvylConfig::builder().state_dir(dir).build()
    }

    async fn write_log(config: &AnvylConfig, service: ServiceKind, content: &str) {
        let path = utils::log_file(config.get_state_dir(), service);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_log_yields_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let mut stream = view_logs(&config, ServiceKind::Infra, None, false)
            .await
            .unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert!(first.contains("no logs found"));
    }

    #[tokio::test]
    async fn test_tail_limits_lines() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_log(&config, ServiceKind::Mcp, "one\ntwo\nthree\n").await;

        let tail = tail_lines(&config, ServiceKind::Mcp, 2).await.unwrap();
        assert_eq!(tail, vec!["two".to_string(), "three".to_string()]);

        let mut stream = view_logs(&config, ServiceKind::Mcp, Some(1), false)
            .await
            .unwrap();
        let content = stream.next().await.unwrap().unwrap();
        assert_eq!(content, "three\n");
    }

    #[tokio::test]
    async fn test_follow_picks_up_appended_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_log(&config, ServiceKind::Agent, "start\n").await;

        let mut stream = view_logs(&config, ServiceKind::Agent, None, true)
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "start\n");

        let path = utils::log_file(config.get_state_dir(), ServiceKind::Agent);
        let mut existing = fs::read_to_string(&path).await.unwrap();
        existing.push_str("appended\n");
        fs::write(&path, existing).await.unwrap();

        let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("follow stream produced nothing")
            .unwrap()
            .unwrap();
        assert_eq!(next, "appended\n");
    }
}
