//! Error types for the search sync system.

use thiserror::Error;

use search_sync_repository::{ApiError, EngineError};

/// Errors that can occur while synchronizing records into the search engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from a data provider.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A record has no resolvable primary key.
    #[error("Identifier error: {0}")]
    Identifier(String),

    /// An operation was requested for an entity that is not configured.
    #[error("Entity \"{0}\" is not searchable")]
    NotSearchable(String),

    /// The engine reported a task as failed.
    #[error("Task {task_uid} failed: {message}")]
    Task {
        task_uid: u64,
        message: String,
        code: String,
    },

    /// Task polling exceeded the response timeout.
    #[error("Timed out after {timeout_ms}ms waiting for task {task_uid}")]
    Timeout { task_uid: u64, timeout_ms: u64 },

    /// Failed to turn a record into a document.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the search engine transport.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SyncError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a provider error.
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create an identifier error.
    pub fn identifier(msg: impl Into<String>) -> Self {
        Self::Identifier(msg.into())
    }

    /// Create a not-searchable error.
    pub fn not_searchable(entity: impl Into<String>) -> Self {
        Self::NotSearchable(entity.into())
    }

    /// Create a task error from the engine's error payload.
    pub fn task(task_uid: u64, error: Option<ApiError>) -> Self {
        let (message, code) = match error {
            Some(payload) => (payload.message, payload.code),
            None => ("task failed without an error payload".to_string(), String::new()),
        };

        Self::Task {
            task_uid,
            message,
            code,
        }
    }

    /// Create a timeout error.
    pub fn timeout(task_uid: u64, timeout_ms: u64) -> Self {
        Self::Timeout {
            task_uid,
            timeout_ms,
        }
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
