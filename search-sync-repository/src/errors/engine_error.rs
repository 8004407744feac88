//! Engine error type.
//!
//! Unified error for all search engine round-trips, covering transport
//! failures, non-success HTTP responses and malformed payloads.

use thiserror::Error;

/// Errors from search engine operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Failed to reach the engine or to build the transport.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The engine answered with a non-success status.
    #[error("Request failed with status {status}: {message}")]
    RequestError { status: u16, message: String },

    /// Failed to parse a response from the engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a request payload.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EngineError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a request error.
    pub fn request(status: u16, message: impl Into<String>) -> Self {
        Self::RequestError {
            status,
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}
