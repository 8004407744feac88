//! Progress events emitted by the import engine and index creator.
//!
//! Events decouple the orchestration core from presentation: the core emits,
//! the CLI installs a listener that renders progress lines. The core itself
//! never prints.

/// Notifications emitted while creating indices and importing records.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportEvent {
    /// An index is about to be created in the engine.
    IndexCreationStarted { entity: String, index: String },
    /// The import loop for one index is starting.
    BeforeIndexImport { entity: String, index: String },
    /// The first N batches were skipped for a resumed import.
    BatchesSkipped { batches: usize, records: usize },
    /// One batch finished indexing.
    BatchIndexed {
        entity: String,
        index: String,
        /// Documents the engine reported as indexed for this batch.
        indexed: u64,
        /// Source records in the page that produced the batch.
        batch_records: usize,
        /// Records processed for this entity since the import started.
        total_indexed: u64,
    },
    /// Index settings were pushed to the engine.
    SettingsUpdated { index: String },
}

/// Observer for [`ImportEvent`] notifications.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &ImportEvent);
}

/// Listener that ignores all events.
pub struct NullEventListener;

impl EventListener for NullEventListener {
    fn on_event(&self, _event: &ImportEvent) {}
}
