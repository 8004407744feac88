//! Dependency initialization and wiring for the search sync CLI.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use sqlx::sqlite::SqlitePool;
use tracing::info;

use search_sync_repository::{EngineConfig, MeilisearchClient, SearchEngineClient};

use crate::config::{IndexRegistry, SearchConfig};
use crate::creator::IndexCreator;
use crate::errors::SyncError;
use crate::events::EventListener;
use crate::importer::Importer;
use crate::manager::SearchManager;
use crate::provider::{DataProvider, SqliteEntityProvider};
use crate::settings::SettingsUpdater;
use crate::tasks::TaskTracker;

/// Default search engine URL.
const DEFAULT_ENGINE_URL: &str = "http://localhost:7700";

/// Default configuration file path.
const DEFAULT_CONFIG_PATH: &str = "search_sync.yaml";

/// Default source database URL.
const DEFAULT_DATABASE_URL: &str = "sqlite://search_sync.db";

/// Container for all initialized dependencies.
///
/// The provider map is built once at startup, one provider per concrete
/// entity, so a missing provider is a startup error rather than a mid-run
/// surprise.
pub struct Dependencies {
    pub registry: Arc<IndexRegistry>,
    pub engine: Arc<dyn SearchEngineClient>,
    pub providers: HashMap<String, Arc<dyn DataProvider>>,
}

impl Dependencies {
    /// Initialize all dependencies from the config file and environment.
    ///
    /// # Environment Variables
    ///
    /// - `SEARCH_SYNC_CONFIG`: config file path (default: search_sync.yaml)
    /// - `MEILISEARCH_URL`: engine URL (default: http://localhost:7700)
    /// - `MEILISEARCH_API_KEY`: engine API key (optional)
    /// - `DATABASE_URL`: source database (default: sqlite://search_sync.db)
    pub fn new(config_path: Option<&str>) -> Result<Self, SyncError> {
        let config_path = config_path
            .map(str::to_string)
            .or_else(|| env::var("SEARCH_SYNC_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let config = SearchConfig::from_yaml_file(&config_path)?;
        let registry = Arc::new(IndexRegistry::new(&config)?);

        let engine_url =
            env::var("MEILISEARCH_URL").unwrap_or_else(|_| DEFAULT_ENGINE_URL.to_string());
        let engine_config = match env::var("MEILISEARCH_API_KEY") {
            Ok(key) if !key.is_empty() => EngineConfig::with_api_key(engine_url.clone(), key),
            _ => EngineConfig::new(engine_url.clone()),
        };
        let engine: Arc<dyn SearchEngineClient> = Arc::new(MeilisearchClient::new(engine_config)?);

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let pool = SqlitePool::connect_lazy(&database_url).map_err(|e| {
            SyncError::configuration(format!(
                "Failed to open database {}: {}",
                database_url, e
            ))
        })?;

        let mut providers: HashMap<String, Arc<dyn DataProvider>> = HashMap::new();
        for entry in &config.indices {
            if entry.is_aggregator() {
                continue;
            }

            let entity = entry.entity_name().to_string();
            if providers.contains_key(&entity) {
                continue;
            }

            let provider = SqliteEntityProvider::new(
                pool.clone(),
                entry.table_name(),
                entry.identifier_fields.clone(),
            )?;
            providers.insert(entity, Arc::new(provider));
        }

        info!(
            config = %config_path,
            engine_url = %engine_url,
            index_count = registry.definitions().len(),
            "Dependencies initialized"
        );

        Ok(Self {
            registry,
            engine,
            providers,
        })
    }

    /// Build an import engine with the given event listener.
    pub fn importer(&self, listener: Arc<dyn EventListener>) -> Importer {
        Importer::new(
            self.registry.clone(),
            self.providers.clone(),
            self.engine.clone(),
            listener,
        )
    }

    /// Build an index creator with the given event listener.
    pub fn creator(&self, listener: Arc<dyn EventListener>) -> IndexCreator {
        IndexCreator::new(
            self.registry.clone(),
            self.engine.clone(),
            TaskTracker::new(self.engine.clone()),
            listener,
        )
    }

    /// Build a settings updater with the given event listener.
    pub fn settings_updater(&self, listener: Arc<dyn EventListener>) -> SettingsUpdater {
        SettingsUpdater::new(
            self.registry.clone(),
            self.engine.clone(),
            TaskTracker::new(self.engine.clone()),
            listener,
        )
    }

    /// Build the live search manager.
    pub fn manager(&self) -> SearchManager {
        SearchManager::new(
            self.registry.clone(),
            self.providers.clone(),
            self.engine.clone(),
        )
    }
}
