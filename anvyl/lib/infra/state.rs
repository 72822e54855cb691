use std::{collections::HashMap, sync::Arc};

use sqlx::{Pool, Sqlite};
use tokio::sync::Mutex;

use crate::{
    docker::ContainerEngine,
    store,
    utils::{local_hostname, primary_local_ip},
    AnvylResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Label marking a container as managed by anvyl.
pub const MANAGED_LABEL: &str = "anvyl.managed";

/// Label carrying the internal container id into the engine.
///
/// After engine creation this label is the ground-truth back-reference from
/// the engine to the store, should the store ever be lost.
pub const CONTAINER_ID_LABEL: &str = "anvyl.container_id";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Shared state for the infrastructure service.
///
/// Constructed once at service start: one persistence handle, one engine
/// handle, one local host id. Cloning is cheap; everything lives behind one
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Pool<Sqlite>,
    engine: Arc<dyn ContainerEngine>,
    local_host_id: String,
    container_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    host_lock: Mutex<()>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl AppState {
    /// Builds the service state, registering the local host on first start.
    pub async fn new(db: Pool<Sqlite>, engine: Arc<dyn ContainerEngine>) -> AnvylResult<Self> {
        let hostname = local_hostname();
        let ip = primary_local_ip().to_string();
        let local_host =
            store::ensure_local_host(&db, &hostname, &ip, std::env::consts::OS).await?;

        tracing::info!(
            host_id = %local_host.id,
            name = %local_host.name,
            "local host registered"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db,
                engine,
                local_host_id: local_host.id,
                container_locks: Mutex::new(HashMap::new()),
                host_lock: Mutex::new(()),
            }),
        })
    }

    /// The persistence handle.
    pub fn db(&self) -> &Pool<Sqlite> {
        &self.inner.db
    }

    /// The engine handle.
    pub fn engine(&self) -> &Arc<dyn ContainerEngine> {
        &self.inner.engine
    }

    /// The id of the local host row.
    pub fn local_host_id(&self) -> &str {
        &self.inner.local_host_id
    }

    /// The process-wide mutex serializing host inventory mutations.
    pub fn host_lock(&self) -> &Mutex<()> {
        &self.inner.host_lock
    }

    /// The write mutex for one container, keyed by internal id.
    ///
    /// Mutating endpoints and the reconciler both acquire this before
    /// touching a container row, which serializes create/stop/remove against
    /// reconciliation without any lock held across requests.
    pub async fn container_lock(&self, container_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.inner.container_locks.lock().await;
        locks
            .entry(container_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the lock entry for a removed container.
    pub async fn forget_container_lock(&self, container_id: &str) {
        let mut locks = self.inner.container_locks.lock().await;
        locks.remove(container_id);
    }
}
