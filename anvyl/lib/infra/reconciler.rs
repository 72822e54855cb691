//! Background reconciliation of the store against the engine.
//!
//! The engine is the authoritative source of container state; the store is a
//! cache. Every tick the reconciler pulls the full engine listing, folds the
//! managed containers back into the store, expires rows whose engine
//! container has been gone for two consecutive ticks, and refreshes the
//! local host's resources snapshot.

use std::{collections::HashMap, time::Duration};

use tokio::task::JoinHandle;

use crate::{
    store::{self, ContainerStatus, ContainerUpdate, HostUpdate, NewContainer},
    AnvylError, AnvylResult,
};

use super::{
    metrics,
    state::{CONTAINER_ID_LABEL, MANAGED_LABEL},
    AppState,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Ticks a container may be absent from the engine before its row is dropped.
const MISSING_TICKS_BEFORE_REMOVAL: u8 = 2;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The reconciler task state.
pub struct Reconciler {
    state: AppState,
    interval: Duration,

    /// Consecutive ticks each container id has been missing from the engine.
    missing: HashMap<String, u8>,

    /// Consecutive failed ticks, for log-level promotion.
    consecutive_failures: u32,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Reconciler {
    /// Creates a reconciler over the given service state.
    pub fn new(state: AppState, interval: Duration) -> Self {
        Self {
            state,
            interval,
            missing: HashMap::new(),
            consecutive_failures: 0,
        }
    }

    /// Spawns the reconciler loop. Ticks never queue: if one overruns the
    /// interval, the missed ticks are skipped.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                match self.tick().await {
                    Result::Ok(()) => {
                        self.consecutive_failures = 0;
                    }
                    Err(AnvylError::EngineUnavailable(reason)) => {
                        self.consecutive_failures += 1;
                        // Transient engine outages are expected; promote to
                        // warn only once they persist.
                        if self.consecutive_failures >= 2 {
                            tracing::warn!(reason = %reason, "engine unavailable, skipping reconcile");
                        } else {
                            tracing::info!(reason = %reason, "engine unavailable, skipping reconcile");
                        }
                    }
                    Err(error) => {
                        tracing::error!(error = %error, "reconcile tick failed");
                    }
                }
            }
        })
    }

    /// One reconciliation pass.
    pub async fn tick(&mut self) -> AnvylResult<()> {
        let engine_containers = self.state.engine().list_containers(true).await?;

        let mut seen_docker_ids = Vec::new();

        for summary in &engine_containers {
            seen_docker_ids.push(summary.docker_id.clone());

            if summary.labels.get(MANAGED_LABEL).map(String::as_str) != Some("true") {
                continue;
            }

            self.absorb_managed_container(summary).await?;
        }

        self.expire_missing_rows(&seen_docker_ids).await?;
        self.refresh_local_resources().await?;

        Ok(())
    }

    /// Folds one managed engine container back into the store.
    async fn absorb_managed_container(
        &mut self,
        summary: &crate::docker::EngineContainerSummary,
    ) -> AnvylResult<()> {
        let detail = match self.state.engine().inspect(&summary.docker_id).await {
            Result::Ok(detail) => detail,
            // Raced an external removal between list and inspect.
            Err(AnvylError::NotFound(_)) => return Ok(()),
            Err(error) => return Err(error),
        };

        let status = if detail.running {
            ContainerStatus::Running
        } else {
            ContainerStatus::from_engine_state(&detail.state)
        };

        let row = match summary.labels.get(CONTAINER_ID_LABEL) {
            Some(container_id) => store::get_container(self.state.db(), container_id).await,
            None => store::get_container_by_docker_id(self.state.db(), &summary.docker_id)
                .await?
                .ok_or_else(|| AnvylError::NotFound(summary.docker_id.clone())),
        };

        match row {
            Result::Ok(row) => {
                self.missing.remove(&row.id);

                let lock = self.state.container_lock(&row.id).await;
                let _guard = lock.lock().await;

                store::update_container(
                    self.state.db(),
                    &row.id,
                    ContainerUpdate {
                        docker_id: Some(summary.docker_id.clone()),
                        status: Some(status),
                        exit_code: detail.exit_code,
                        started_at: detail.started_at,
                        finished_at: detail.finished_at,
                    },
                )
                .await?;
            }
            Err(AnvylError::NotFound(_)) => {
                // A managed container with no row: the store lost it. Recover
                // the row from the engine record.
                tracing::info!(
                    docker_id = %summary.docker_id,
                    name = %summary.name,
                    "recovering store row for managed container"
                );

                let recovered = store::add_container(
                    self.state.db(),
                    NewContainer {
                        name: summary.name.clone(),
                        image: summary.image.clone(),
                        host_id: self.state.local_host_id().to_string(),
                        labels: serde_json::to_string(&summary.labels)?,
                        ports: "[]".to_string(),
                        volumes: "[]".to_string(),
                        environment: "[]".to_string(),
                        command: None,
                    },
                )
                .await?;

                store::update_container(
                    self.state.db(),
                    &recovered.id,
                    ContainerUpdate {
                        docker_id: Some(summary.docker_id.clone()),
                        status: Some(status),
                        exit_code: detail.exit_code,
                        started_at: detail.started_at,
                        finished_at: detail.finished_at,
                    },
                )
                .await?;
            }
            Err(error) => return Err(error),
        }

        Ok(())
    }

    /// Drops rows whose engine container has been absent for two ticks.
    async fn expire_missing_rows(&mut self, seen_docker_ids: &[String]) -> AnvylResult<()> {
        let rows = store::list_containers(self.state.db(), None, true).await?;

        for row in rows {
            let Some(docker_id) = row.docker_id.as_deref() else {
                // Creation still in flight; the create handler owns this row.
                continue;
            };

            if seen_docker_ids.iter().any(|seen| seen == docker_id) {
                continue;
            }

            let misses = self.missing.entry(row.id.clone()).or_insert(0);
            *misses += 1;

            if *misses < MISSING_TICKS_BEFORE_REMOVAL {
                continue;
            }

            let lock = self.state.container_lock(&row.id).await;
            {
                let _guard = lock.lock().await;

                store::update_container(
                    self.state.db(),
                    &row.id,
                    ContainerUpdate {
                        status: Some(ContainerStatus::Removed),
                        ..Default::default()
                    },
                )
                .await?;
                store::remove_container(self.state.db(), &row.id).await?;
            }

            self.state.forget_container_lock(&row.id).await;
            self.missing.remove(&row.id);

            tracing::info!(container_id = %row.id, "dropped row for vanished container");
        }

        Ok(())
    }

    /// Refreshes the local host's resources snapshot.
    async fn refresh_local_resources(&self) -> AnvylResult<()> {
        let sample = metrics::sample_local_metrics().await?;
        let blob = serde_json::to_string(&sample)?;

        store::update_host(
            self.state.db(),
            self.state.local_host_id(),
            HostUpdate {
                resources: Some(blob),
                ..Default::default()
            },
        )
        .await?;

        Ok(())
    }
}
