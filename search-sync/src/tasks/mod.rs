//! Task tracker: waits on asynchronous engine-side tasks.
//!
//! The engine accepts writes as queued tasks. The tracker polls task status
//! until terminal or until the response timeout elapses, classifies the
//! outcome and aggregates indexed-document counts per index. Failures are
//! never retried here; retry policy belongs to the operator (for example by
//! re-running an import with skipped batches).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use search_sync_repository::{SearchEngineClient, Task, TaskStatus};

use crate::errors::SyncError;

/// Interval between two task status polls.
const TASK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Polls engine tasks to completion and aggregates their counts.
#[derive(Clone)]
pub struct TaskTracker {
    engine: Arc<dyn SearchEngineClient>,
    poll_interval: Duration,
}

impl TaskTracker {
    pub fn new(engine: Arc<dyn SearchEngineClient>) -> Self {
        Self {
            engine,
            poll_interval: TASK_POLL_INTERVAL,
        }
    }

    /// Wait for one task to reach a terminal state.
    ///
    /// A `failed` terminal state becomes [`SyncError::Task`] carrying the
    /// engine's error payload; exceeding `timeout` becomes
    /// [`SyncError::Timeout`]. Abandoning the wait does not cancel the
    /// engine-side task.
    pub async fn wait_for_task(&self, task_uid: u64, timeout: Duration) -> Result<Task, SyncError> {
        let deadline = Instant::now() + timeout;

        loop {
            let task = self.engine.get_task(task_uid).await?;

            if task.status == TaskStatus::Failed {
                return Err(SyncError::task(task_uid, task.error));
            }

            if task.status.is_terminal() {
                debug!(task_uid = task_uid, status = ?task.status, "Task finished");
                return Ok(task);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SyncError::timeout(task_uid, timeout.as_millis() as u64));
            }

            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Wait for every task of one submitted batch and aggregate the
    /// indexed-document counts per index name.
    ///
    /// The first failure aborts the wait and propagates; tasks already
    /// committed by the engine stay committed.
    pub async fn track_batch(
        &self,
        task_refs: &[(String, u64)],
        timeout: Duration,
    ) -> Result<BTreeMap<String, u64>, SyncError> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();

        for (index_uid, task_uid) in task_refs {
            let task = self.wait_for_task(*task_uid, timeout).await?;
            *counts.entry(index_uid.clone()).or_insert(0) += task.indexed_documents();
        }

        Ok(counts)
    }
}
