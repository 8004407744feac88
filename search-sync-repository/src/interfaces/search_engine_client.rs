//! Search engine client trait definition.
//!
//! This module defines the abstract interface to the search engine,
//! allowing for different backend implementations and for mocks in tests.
//! Every write returns a [`TaskRef`](crate::types::TaskRef): the engine
//! accepts writes asynchronously and processes them as queued tasks that
//! callers poll with [`get_task`](SearchEngineClient::get_task).

use async_trait::async_trait;
use serde_json::{Map, Value};

use search_sync_shared::{DocumentId, IndexSettings};

use crate::errors::EngineError;
use crate::types::{EngineStats, SearchParams, SearchResponse, Task, TaskRef};

/// Abstracts the search engine's RPC surface.
///
/// Implementations are injected into the import engine and the search
/// manager; tests substitute mock implementations.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Create an index with the given uid and optional primary key.
    async fn create_index(
        &self,
        uid: &str,
        primary_key: Option<&str>,
    ) -> Result<TaskRef, EngineError>;

    /// Add (or replace) a batch of documents in one index.
    ///
    /// Documents with an id already present in the index are replaced, so
    /// repeated submissions are idempotent.
    async fn add_documents(
        &self,
        uid: &str,
        primary_key: Option<&str>,
        documents: &[Map<String, Value>],
    ) -> Result<TaskRef, EngineError>;

    /// Delete a batch of documents from one index by id.
    async fn delete_documents(
        &self,
        uid: &str,
        ids: &[DocumentId],
    ) -> Result<TaskRef, EngineError>;

    /// Delete all documents of one index, keeping the index itself.
    async fn clear_documents(&self, uid: &str) -> Result<TaskRef, EngineError>;

    /// Delete an index entirely.
    async fn delete_index(&self, uid: &str) -> Result<TaskRef, EngineError>;

    /// Atomically swap index contents pairwise.
    ///
    /// The engine guarantees atomicity per pair; the full list is submitted
    /// in a single call.
    async fn swap_indexes(&self, pairs: &[(String, String)]) -> Result<TaskRef, EngineError>;

    /// Push index settings (ranking rules, attributes, typo tolerance, ...).
    async fn update_settings(
        &self,
        uid: &str,
        settings: &IndexSettings,
    ) -> Result<TaskRef, EngineError>;

    /// Fetch the current state of a task.
    async fn get_task(&self, task_uid: u64) -> Result<Task, EngineError>;

    /// Run a search query against one index.
    async fn search(
        &self,
        uid: &str,
        query: &str,
        params: &SearchParams,
    ) -> Result<SearchResponse, EngineError>;

    /// Fetch global and per-index engine statistics.
    async fn stats(&self) -> Result<EngineStats, EngineError>;
}
