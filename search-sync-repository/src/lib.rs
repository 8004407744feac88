//! # Search Sync Repository
//!
//! This crate provides the trait for talking to the search engine and a
//! concrete implementation for Meilisearch. It includes definitions for
//! errors, the engine client interface and the wire types of the engine's
//! task-based API.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod meilisearch;
pub mod types;

pub use config::EngineConfig;
pub use errors::EngineError;
pub use interfaces::SearchEngineClient;
pub use meilisearch::MeilisearchClient;
pub use types::{
    ApiError, EngineStats, IndexStats, SearchParams, SearchResponse, Task, TaskDetails, TaskRef,
    TaskStatus,
};
