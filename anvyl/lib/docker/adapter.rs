use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::AnvylResult;

use super::{ContainerSpec, EngineContainerDetail, EngineContainerSummary, EngineStats, ExecOutput};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A lazy sequence of log lines, finite unless following.
pub type LogStream = Pin<Box<dyn Stream<Item = AnvylResult<String>> + Send>>;

/// A narrow, typed surface over the Docker engine.
///
/// Every method maps to a single engine call and fails with one of the
/// crate's error kinds; engine-library error types never cross this boundary.
/// The engine listing combined with [`inspect`](ContainerEngine::inspect) is
/// the authoritative source of container state; the store is a cache.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Checks that the engine socket answers.
    async fn ping(&self) -> AnvylResult<()>;

    /// Lists engine containers; `all` includes stopped ones.
    async fn list_containers(&self, all: bool) -> AnvylResult<Vec<EngineContainerSummary>>;

    /// Fetches the engine's full record for one container.
    async fn inspect(&self, docker_id: &str) -> AnvylResult<EngineContainerDetail>;

    /// Creates a container and returns the engine's ID for it.
    async fn create_container(&self, spec: &ContainerSpec) -> AnvylResult<String>;

    /// Starts a created container.
    async fn start(&self, docker_id: &str) -> AnvylResult<()>;

    /// Stops a container: SIGTERM, then SIGKILL after the timeout.
    async fn stop(&self, docker_id: &str, timeout_secs: u64) -> AnvylResult<()>;

    /// Removes a container from the engine.
    async fn remove(&self, docker_id: &str, force: bool) -> AnvylResult<()>;

    /// Streams log lines; finite when `follow` is false.
    async fn logs(&self, docker_id: &str, tail: u32, follow: bool) -> AnvylResult<LogStream>;

    /// Runs a command inside the container and captures its output.
    ///
    /// TTY mode merges stdout and stderr into one stream.
    async fn exec(&self, docker_id: &str, argv: &[String], tty: bool) -> AnvylResult<ExecOutput>;

    /// Takes a point-in-time CPU/memory sample.
    async fn stats(&self, docker_id: &str) -> AnvylResult<EngineStats>;
}
