//! Import engine: batched, resumable reindexing of source records.
//!
//! Drives the page-by-page read/transform/submit loop for every resolved
//! index, sequentially: one index at a time, one page at a time, one batch
//! submission at a time. Page N's tasks must reach a terminal state before
//! page N+1 is read, so the source is never read further ahead than what the
//! engine has accepted.
//!
//! Progress is at-least-once: document ids are idempotent and batches
//! already committed by the engine stay committed when a later batch fails.
//! A failed run can be resumed with `skip_batches`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use search_sync_repository::SearchEngineClient;
use search_sync_shared::{DocumentId, ResolvedIndex, SearchableDocument};

use crate::config::{IndexRegistry, DEFAULT_RESPONSE_TIMEOUT_MS};
use crate::errors::SyncError;
use crate::events::{EventListener, ImportEvent};
use crate::mapper::DocumentMapper;
use crate::provider::DataProvider;
use crate::resolver::EntityResolver;
use crate::settings::SettingsUpdater;
use crate::swap::{SwapCoordinator, SHADOW_INDEX_PREFIX};
use crate::tasks::TaskTracker;

/// Options for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Requested index names; empty means all configured indices.
    pub indices: Vec<String>,
    /// Records per page; `None` or zero falls back to the configured value.
    pub batch_size: Option<usize>,
    /// Number of already-processed pages to skip.
    pub skip_batches: usize,
    /// Timeout for each engine task.
    pub response_timeout: Duration,
    /// Push configured index settings after each index completes.
    pub update_settings: bool,
    /// Import into shadow indices and swap them live afterwards.
    pub swap_indices: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            indices: Vec::new(),
            batch_size: None,
            skip_batches: 0,
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            update_settings: true,
            swap_indices: false,
        }
    }
}

/// Counts accumulated over one import run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Source records processed across all entities.
    pub total_records: u64,
    /// Documents the engine reported as indexed, per index uid.
    pub per_index: BTreeMap<String, u64>,
}

/// The import engine.
pub struct Importer {
    registry: Arc<IndexRegistry>,
    resolver: EntityResolver,
    providers: HashMap<String, Arc<dyn DataProvider>>,
    mapper: DocumentMapper,
    engine: Arc<dyn SearchEngineClient>,
    tracker: TaskTracker,
    settings_updater: SettingsUpdater,
    swap_coordinator: SwapCoordinator,
    listener: Arc<dyn EventListener>,
}

impl Importer {
    pub fn new(
        registry: Arc<IndexRegistry>,
        providers: HashMap<String, Arc<dyn DataProvider>>,
        engine: Arc<dyn SearchEngineClient>,
        listener: Arc<dyn EventListener>,
    ) -> Self {
        let tracker = TaskTracker::new(engine.clone());

        Self {
            resolver: EntityResolver::new(registry.clone()),
            mapper: DocumentMapper::new(registry.clone()),
            settings_updater: SettingsUpdater::new(
                registry.clone(),
                engine.clone(),
                tracker.clone(),
                listener.clone(),
            ),
            swap_coordinator: SwapCoordinator::new(engine.clone(), tracker.clone()),
            registry,
            providers,
            engine,
            tracker,
            listener,
        }
    }

    /// Run one import.
    ///
    /// Task failures and timeouts abort the run and propagate; batches the
    /// engine already committed stay committed.
    #[instrument(skip(self, options), fields(swap = options.swap_indices))]
    pub async fn import(&self, options: &ImportOptions) -> Result<ImportSummary, SyncError> {
        let resolved = self.resolver.resolve(&options.indices);

        if resolved.is_empty() {
            info!("No indices to import; specify indices on the command line or in configuration");
            return Ok(ImportSummary::default());
        }

        let batch_size = options
            .batch_size
            .filter(|size| *size > 0)
            .unwrap_or_else(|| self.registry.batch_size());

        // Writes land on shadow uids during a zero-downtime import. The
        // effective prefix is threaded through explicitly; configuration
        // stays untouched, so nothing needs restoring on early abort.
        let effective_prefix = if options.swap_indices {
            format!("{}{}", SHADOW_INDEX_PREFIX, self.registry.prefix())
        } else {
            self.registry.prefix().to_string()
        };

        // Fail on missing providers before touching the engine.
        for entry in &resolved {
            if !self.providers.contains_key(&entry.entity) {
                return Err(SyncError::configuration(format!(
                    "No data provider registered for entity \"{}\"",
                    entry.entity
                )));
            }
        }

        let mut summary = ImportSummary::default();
        let mut settings_updated: HashSet<String> = HashSet::new();

        for entry in &resolved {
            let provider = self.providers[&entry.entity].clone();

            self.import_index(
                entry,
                provider.as_ref(),
                batch_size,
                &effective_prefix,
                options,
                &mut summary,
            )
            .await?;

            // Aggregator constituents share an index; update its settings once.
            if options.update_settings && settings_updated.insert(entry.name.clone()) {
                let index_uid = format!("{}{}", effective_prefix, entry.name);
                self.settings_updater
                    .update(&entry.name, &index_uid, options.response_timeout)
                    .await?;
            }
        }

        if options.swap_indices {
            self.swap_coordinator
                .swap(&resolved, self.registry.prefix(), options.response_timeout)
                .await?;
        }

        Ok(summary)
    }

    /// Import all pages of one resolved index.
    async fn import_index(
        &self,
        entry: &ResolvedIndex,
        provider: &dyn DataProvider,
        batch_size: usize,
        effective_prefix: &str,
        options: &ImportOptions,
        summary: &mut ImportSummary,
    ) -> Result<(), SyncError> {
        self.listener.on_event(&ImportEvent::BeforeIndexImport {
            entity: entry.entity.clone(),
            index: entry.name.clone(),
        });

        let mut page = options.skip_batches;
        if page > 0 {
            self.listener.on_event(&ImportEvent::BatchesSkipped {
                batches: page,
                records: page * batch_size,
            });
        }

        let mut total_indexed: u64 = 0;

        loop {
            let records = provider.provide(batch_size, batch_size * page).await?;

            debug!(
                entity = %entry.entity,
                page = page,
                record_count = records.len(),
                "Fetched page"
            );

            let mapped =
                self.mapper
                    .map_batch(&entry.entity, &records, provider, effective_prefix)?;

            let mut task_refs: Vec<(String, u64)> = Vec::new();

            // Records failing their index predicate are removed in the same
            // pass that indexes the rest.
            for (index_uid, ids) in group_removals(mapped.removals) {
                let task = self.engine.delete_documents(&index_uid, &ids).await?;
                task_refs.push((index_uid, task.task_uid));
            }

            for (index_uid, (primary_key, payloads)) in group_documents(mapped.documents) {
                let task = self
                    .engine
                    .add_documents(&index_uid, Some(&primary_key), &payloads)
                    .await?;
                task_refs.push((index_uid, task.task_uid));
            }

            let counts = self
                .tracker
                .track_batch(&task_refs, options.response_timeout)
                .await?;

            total_indexed += records.len() as u64;
            summary.total_records += records.len() as u64;

            for (index_uid, indexed) in &counts {
                self.listener.on_event(&ImportEvent::BatchIndexed {
                    entity: entry.entity.clone(),
                    index: index_uid.clone(),
                    indexed: *indexed,
                    batch_records: records.len(),
                    total_indexed,
                });

                *summary.per_index.entry(index_uid.clone()).or_insert(0) += indexed;
            }

            provider.cleanup().await;

            page += 1;
            if records.len() < batch_size {
                break;
            }
        }

        Ok(())
    }
}

/// Group documents by target index uid, keeping submission order.
pub(crate) fn group_documents(
    documents: Vec<SearchableDocument>,
) -> BTreeMap<String, (String, Vec<serde_json::Map<String, serde_json::Value>>)> {
    let mut groups: BTreeMap<String, (String, Vec<serde_json::Map<String, serde_json::Value>>)> =
        BTreeMap::new();

    for document in documents {
        let entry = groups
            .entry(document.index_uid.clone())
            .or_insert_with(|| (document.primary_key.clone(), Vec::new()));
        entry.1.push(document.into_payload());
    }

    groups
}

/// Group removal ids by target index uid.
pub(crate) fn group_removals(
    removals: Vec<SearchableDocument>,
) -> BTreeMap<String, Vec<DocumentId>> {
    let mut groups: BTreeMap<String, Vec<DocumentId>> = BTreeMap::new();

    for document in removals {
        groups
            .entry(document.index_uid.clone())
            .or_default()
            .push(document.id);
    }

    groups
}
