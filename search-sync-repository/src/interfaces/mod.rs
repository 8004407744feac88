//! Trait definitions for search engine backends.

mod search_engine_client;

pub use search_engine_client::SearchEngineClient;
