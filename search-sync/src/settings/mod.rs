//! Settings updater: pushes configured index settings to the engine.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use search_sync_repository::SearchEngineClient;

use crate::config::IndexRegistry;
use crate::errors::SyncError;
use crate::events::{EventListener, ImportEvent};
use crate::tasks::TaskTracker;

/// Pushes an index's configured settings (ranking rules, attributes, typo
/// tolerance, ...) to the engine and waits for the task.
pub struct SettingsUpdater {
    registry: Arc<IndexRegistry>,
    engine: Arc<dyn SearchEngineClient>,
    tracker: TaskTracker,
    listener: Arc<dyn EventListener>,
}

impl SettingsUpdater {
    pub fn new(
        registry: Arc<IndexRegistry>,
        engine: Arc<dyn SearchEngineClient>,
        tracker: TaskTracker,
        listener: Arc<dyn EventListener>,
    ) -> Self {
        Self {
            registry,
            engine,
            tracker,
            listener,
        }
    }

    /// Update the settings of one configured index.
    ///
    /// `index_uid` is the engine-side target; during a zero-downtime import
    /// it is the shadow uid, so settings land on the index that will be
    /// swapped live. Definitions without settings are skipped silently.
    pub async fn update(
        &self,
        index_name: &str,
        index_uid: &str,
        timeout: Duration,
    ) -> Result<(), SyncError> {
        let definition = self.registry.definition_by_name(index_name).ok_or_else(|| {
            SyncError::configuration(format!("Search index \"{}\" was not found", index_name))
        })?;

        let settings = match &definition.settings {
            Some(settings) if !settings.is_empty() => settings,
            _ => {
                debug!(index = %index_name, "No settings configured, skipping update");
                return Ok(());
            }
        };

        let task = self.engine.update_settings(index_uid, settings).await?;
        self.tracker.wait_for_task(task.task_uid, timeout).await?;

        self.listener.on_event(&ImportEvent::SettingsUpdated {
            index: index_uid.to_string(),
        });

        Ok(())
    }
}
