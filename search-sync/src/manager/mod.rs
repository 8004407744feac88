//! Search manager: live change propagation and search with hydration.
//!
//! The API application code calls when records change outside a batch
//! import, plus search over configured entities with hit hydration back
//! into source records.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use search_sync_repository::{SearchEngineClient, SearchParams, SearchResponse, TaskRef};
use search_sync_shared::DocumentId;

use crate::config::IndexRegistry;
use crate::errors::SyncError;
use crate::importer::{group_documents, group_removals};
use crate::mapper::DocumentMapper;
use crate::provider::{DataProvider, Record};

/// High-level API over the configured indices.
pub struct SearchManager {
    registry: Arc<IndexRegistry>,
    providers: HashMap<String, Arc<dyn DataProvider>>,
    mapper: DocumentMapper,
    engine: Arc<dyn SearchEngineClient>,
}

impl SearchManager {
    pub fn new(
        registry: Arc<IndexRegistry>,
        providers: HashMap<String, Arc<dyn DataProvider>>,
        engine: Arc<dyn SearchEngineClient>,
    ) -> Self {
        Self {
            mapper: DocumentMapper::new(registry.clone()),
            registry,
            providers,
            engine,
        }
    }

    /// Whether an entity appears in the configuration.
    pub fn is_searchable(&self, entity: &str) -> bool {
        self.registry.is_searchable(entity)
    }

    /// The engine-side index uid for an entity.
    pub fn searchable_as(&self, entity: &str) -> Result<String, SyncError> {
        self.registry.searchable_as(entity)
    }

    fn provider(&self, entity: &str) -> Result<&Arc<dyn DataProvider>, SyncError> {
        self.providers
            .get(entity)
            .ok_or_else(|| SyncError::not_searchable(entity))
    }

    /// Index changed records of one entity.
    ///
    /// Records failing their index predicate are removed instead, in the
    /// same call. Documents fan out to the entity's own index and to every
    /// aggregator index covering it. Returns the enqueued task references;
    /// waiting on them is the caller's choice.
    pub async fn index_records(
        &self,
        entity: &str,
        records: &[Record],
    ) -> Result<Vec<TaskRef>, SyncError> {
        let provider = self.provider(entity)?.clone();
        let mapped = self
            .mapper
            .map_batch(entity, records, provider.as_ref(), self.registry.prefix())?;

        let mut tasks = Vec::new();

        for (index_uid, ids) in group_removals(mapped.removals) {
            tasks.push(self.engine.delete_documents(&index_uid, &ids).await?);
        }

        for (index_uid, (primary_key, payloads)) in group_documents(mapped.documents) {
            for chunk in payloads.chunks(self.registry.batch_size()) {
                tasks.push(
                    self.engine
                        .add_documents(&index_uid, Some(&primary_key), chunk)
                        .await?,
                );
            }
        }

        debug!(
            entity = %entity,
            record_count = records.len(),
            task_count = tasks.len(),
            "Submitted record changes"
        );

        Ok(tasks)
    }

    /// Remove records of one entity from every index covering it.
    pub async fn remove_records(
        &self,
        entity: &str,
        records: &[Record],
    ) -> Result<Vec<TaskRef>, SyncError> {
        let provider = self.provider(entity)?.clone();
        let mapped = self
            .mapper
            .map_batch(entity, records, provider.as_ref(), self.registry.prefix())?;

        // Removal applies to every mapped document, whichever side of the
        // index predicate it landed on.
        let mut all = mapped.documents;
        all.extend(mapped.removals);

        let mut tasks = Vec::new();
        for (index_uid, ids) in group_removals(all) {
            tasks.push(self.engine.delete_documents(&index_uid, &ids).await?);
        }

        Ok(tasks)
    }

    /// Delete all documents of an entity's index, keeping the index.
    pub async fn clear(&self, entity: &str) -> Result<TaskRef, SyncError> {
        let index_uid = self.searchable_as(entity)?;
        Ok(self.engine.clear_documents(&index_uid).await?)
    }

    /// Delete an entity's index entirely.
    pub async fn delete(&self, entity: &str) -> Result<TaskRef, SyncError> {
        let index_uid = self.searchable_as(entity)?;
        Ok(self.engine.delete_index(&index_uid).await?)
    }

    /// Delete an index by its engine-side uid.
    pub async fn delete_by_index_name(&self, index_uid: &str) -> Result<TaskRef, SyncError> {
        Ok(self.engine.delete_index(index_uid).await?)
    }

    /// Search an entity's index and return the raw engine response.
    pub async fn raw_search(
        &self,
        entity: &str,
        query: &str,
        params: &SearchParams,
    ) -> Result<SearchResponse, SyncError> {
        let index_uid = self.searchable_as(entity)?;
        Ok(self.engine.search(&index_uid, query, params).await?)
    }

    /// Search an entity's index and hydrate the hits into source records.
    ///
    /// Hits are loaded through the entity's data provider by primary key;
    /// the engine's result order is preserved. Hits whose record no longer
    /// exists in the source are dropped.
    pub async fn search(
        &self,
        entity: &str,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<Record>, SyncError> {
        let definition = self
            .registry
            .definition_for_entity(entity)
            .ok_or_else(|| SyncError::not_searchable(entity))?;

        let mut params = params.clone();
        if params.limit.is_none() {
            params.limit = Some(self.registry.nb_results());
        }

        let response = self.raw_search(entity, query, &params).await?;
        let provider = self.provider(entity)?.clone();

        let hit_ids: Vec<DocumentId> = response
            .hits
            .iter()
            .filter_map(|hit| hit.get(&definition.primary_key))
            .filter_map(DocumentId::from_json)
            .collect();

        let loaded = provider.load_by_identifiers(&hit_ids).await?;

        // Preserve the engine's ranking.
        let mut results = Vec::with_capacity(hit_ids.len());
        for hit_id in &hit_ids {
            let matched = loaded.iter().find(|record| {
                provider
                    .identifier_values(record)
                    .ok()
                    .and_then(|values| DocumentId::from_identifier_values(&values))
                    .map(|id| &id == hit_id)
                    .unwrap_or(false)
            });

            if let Some(record) = matched {
                results.push(record.clone());
            }
        }

        Ok(results)
    }

    /// Number of documents matching a query, from the engine's estimate.
    pub async fn count(
        &self,
        entity: &str,
        query: &str,
        params: &SearchParams,
    ) -> Result<u64, SyncError> {
        let mut params = params.clone();
        params.limit = Some(0);

        let response = self.raw_search(entity, query, &params).await?;
        Ok(response.estimated_total_hits.unwrap_or(0))
    }
}
