//! Swap coordinator: zero-downtime cutover from shadow to live indices.
//!
//! During a zero-downtime import every write lands on a shadow uid (the
//! shadow marker prepended to the effective prefix). Once all indices have
//! finished importing, the coordinator swaps shadow and live contents with a
//! single engine call (atomic per pair) and then deletes the shadow indices.
//! If the swap itself fails, the shadow indices are left in place for
//! out-of-band cleanup; live indices keep serving their previous contents.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use search_sync_repository::SearchEngineClient;
use search_sync_shared::ResolvedIndex;

use crate::errors::SyncError;
use crate::tasks::TaskTracker;

/// Marker prepended to the effective prefix while importing to shadow
/// indices.
pub const SHADOW_INDEX_PREFIX: &str = "_tmp_";

/// Performs the atomic shadow/live swap at the end of a zero-downtime
/// import.
pub struct SwapCoordinator {
    engine: Arc<dyn SearchEngineClient>,
    tracker: TaskTracker,
}

impl SwapCoordinator {
    pub fn new(engine: Arc<dyn SearchEngineClient>, tracker: TaskTracker) -> Self {
        Self { engine, tracker }
    }

    /// Build the deduplicated `(shadow, live)` pair list for one import run.
    ///
    /// Aggregator constituents share an index name, so several resolved
    /// entries can collapse into one pair; each index must appear only once
    /// in a swap call.
    pub fn build_plan(resolved: &[ResolvedIndex], prefix: &str) -> Vec<(String, String)> {
        let mut plan: Vec<(String, String)> = Vec::new();

        for entry in resolved {
            let live = format!("{}{}", prefix, entry.name);
            let shadow = format!("{}{}", SHADOW_INDEX_PREFIX, live);
            let pair = (shadow, live);

            if !plan.contains(&pair) {
                plan.push(pair);
            }
        }

        plan
    }

    /// Swap shadow and live indices, then delete the shadows.
    ///
    /// The swap task is waited on: a failed swap propagates before any
    /// shadow is deleted. Shadow deletions are enqueued without waiting;
    /// the engine's task queue serializes them after the swap.
    pub async fn swap(
        &self,
        resolved: &[ResolvedIndex],
        prefix: &str,
        timeout: Duration,
    ) -> Result<(), SyncError> {
        let plan = Self::build_plan(resolved, prefix);

        if plan.is_empty() {
            return Ok(());
        }

        info!(pair_count = plan.len(), "Swapping indices");
        let swap_task = self.engine.swap_indexes(&plan).await?;
        self.tracker.wait_for_task(swap_task.task_uid, timeout).await?;
        info!("Indices swapped");

        for (shadow, _live) in &plan {
            self.engine.delete_index(shadow).await?;
            info!(index = %shadow, "Deleted temporary index");
        }

        Ok(())
    }
}
