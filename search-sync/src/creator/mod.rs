//! Index creator: creates configured indices in the engine.

use std::sync::Arc;
use std::time::Duration;

use search_sync_repository::SearchEngineClient;

use crate::config::IndexRegistry;
use crate::errors::SyncError;
use crate::events::{EventListener, ImportEvent};
use crate::tasks::TaskTracker;

/// Creates engine-side indices from configured definitions.
pub struct IndexCreator {
    registry: Arc<IndexRegistry>,
    engine: Arc<dyn SearchEngineClient>,
    tracker: TaskTracker,
    listener: Arc<dyn EventListener>,
}

impl IndexCreator {
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

    /// Create the index for one configured definition and wait for the task.
    ///
    /// Unknown names fail with a configuration error before any engine call.
    pub async fn create(&self, index_name: &str, timeout: Duration) -> Result<(), SyncError> {
        let definition = self.registry.definition_by_name(index_name).ok_or_else(|| {
            SyncError::configuration(format!(
                "Search index for \"{}\" was not found",
                index_name
            ))
        })?;

        self.listener.on_event(&ImportEvent::IndexCreationStarted {
            entity: definition.target.entities().join(", "),
            index: definition.prefixed_name.clone(),
        });

        let task = self
            .engine
            .create_index(&definition.prefixed_name, Some(&definition.primary_key))
            .await?;
        self.tracker.wait_for_task(task.task_uid, timeout).await?;

        Ok(())
    }
}
