//! Configuration for the search engine client.

/// Connection configuration for the search engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the engine, e.g. `http://localhost:7700`.
    pub url: String,
    /// Optional API key, sent as a bearer token.
    pub api_key: Option<String>,
}

impl EngineConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: Some(api_key.into()),
        }
    }
}
