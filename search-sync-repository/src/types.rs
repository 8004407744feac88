//! Wire types of the search engine's task-based API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Reference to a task the engine has accepted but not necessarily finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub task_uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
}

/// Lifecycle state of an engine-side task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// True once the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Canceled
        )
    }
}

/// Per-operation counters reported by a finished task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    #[serde(default)]
    pub received_documents: Option<u64>,
    #[serde(default)]
    pub indexed_documents: Option<u64>,
    #[serde(default)]
    pub deleted_documents: Option<u64>,
}

/// Structured error payload the engine attaches to failed tasks and to
/// non-success HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Full state of an engine-side task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub details: Option<TaskDetails>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

impl Task {
    /// Documents this task reports as indexed, zero for non-indexing tasks.
    pub fn indexed_documents(&self) -> u64 {
        self.details
            .as_ref()
            .and_then(|details| details.indexed_documents)
            .unwrap_or(0)
    }
}

/// Optional search parameters, flattened into the search request body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
}

/// Response of a search query. Hits are raw documents; hydration back into
/// source records happens in the search manager.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub hits: Vec<Map<String, Value>>,
    #[serde(default)]
    pub estimated_total_hits: Option<u64>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
    #[serde(default)]
    pub query: Option<String>,
}

/// Global engine statistics.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub database_size: u64,
    pub used_database_size: u64,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub indexes: HashMap<String, IndexStats>,
}

/// Per-index engine statistics.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub number_of_documents: u64,
    #[serde(default)]
    pub raw_document_db_size: u64,
    #[serde(default)]
    pub avg_document_size: u64,
    #[serde(default)]
    pub is_indexing: bool,
    #[serde(default)]
    pub number_of_embeddings: Option<u64>,
    #[serde(default)]
    pub number_of_embedded_documents: Option<u64>,
}
