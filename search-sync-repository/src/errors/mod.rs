//! Error types for search engine access.

mod engine_error;

pub use engine_error::EngineError;
