//! # Background Scheduler
//!
//! Periodic metrics sampling and snapshot saving for a running server.
//!
//! Each job runs on its own `tokio::time::interval`. The first tick fires one
//! full period after start, not immediately. A failed run is logged and the
//! job keeps going; nothing is retried before the next tick.

use crate::api::AppState;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Handles of the spawned jobs.
#[derive(Debug, Default)]
pub struct Scheduler {
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Number of running jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop every job.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

/// Start the jobs whose period is set.
///
/// The snapshot job is only started when `state` has a store.
pub fn spawn(
    state: AppState,
    metrics_every: Option<Duration>,
    snapshot_every: Option<Duration>,
) -> Scheduler {
    let mut handles = Vec::new();

    if let Some(period) = metrics_every {
        tracing::info!(?period, "metrics sampling enabled");
        handles.push(tokio::spawn(metrics_job(state.clone(), period)));
    }

    match (snapshot_every, state.store.is_some()) {
        (Some(period), true) => {
            tracing::info!(?period, "periodic snapshots enabled");
            handles.push(tokio::spawn(snapshot_job(state, period)));
        }
        (Some(_), false) => {
            tracing::warn!("snapshot interval set but no snapshot path configured; ignoring");
        }
        (None, _) => {}
    }

    Scheduler { handles }
}

async fn metrics_job(state: AppState, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match state.record_metrics().await {
            Ok(sample) => tracing::debug!(
                nodes = sample.total_nodes,
                edges = sample.total_edges,
                avg = sample.avg_connections,
                "metrics recorded"
            ),
            Err(e) => tracing::warn!(error = %e, "metrics recording failed"),
        }
    }
}

async fn snapshot_job(state: AppState, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match state.save_snapshot().await {
            Ok((nodes, edges)) => tracing::debug!(nodes, edges, "periodic snapshot saved"),
            Err(e) => tracing::warn!(error = %e, "periodic snapshot failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxigraph_core::{MemorySnapshotStore, Session, SessionConfig, SnapshotStore};
    use serde_json::json;
    use std::sync::Arc;

    fn state() -> AppState {
        let session = Session::with_config(SessionConfig {
            batch_size: 1,
            seed: Some(8),
            ..SessionConfig::default()
        })
        .expect("session");
        AppState::new(session)
    }

    #[tokio::test]
    async fn no_periods_no_jobs() {
        let jobs = spawn(state(), None, None);
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn snapshot_job_needs_a_store() {
        let jobs = spawn(state(), None, Some(Duration::from_secs(60)));
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn metrics_job_records_samples() {
        let state = state();
        let jobs = spawn(state.clone(), Some(Duration::from_millis(10)), None);
        assert_eq!(jobs.len(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        jobs.shutdown();

        assert!(state.session.read().await.metrics_history().count() > 0);
    }

    #[tokio::test]
    async fn snapshot_job_saves_graph() {
        let store = Arc::new(MemorySnapshotStore::new());
        let state = state().with_store(store.clone());
        state
            .session
            .write()
            .await
            .submit(json!({"event": "add_node"}))
            .expect("submit");

        let jobs = spawn(state, None, Some(Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        jobs.shutdown();

        assert_eq!(store.load().expect("load").nodes.len(), 1);
    }
}
