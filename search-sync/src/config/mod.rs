//! Configuration for the search sync system.
//!
//! The configuration file (YAML) declares the index prefix, batch sizing and
//! the index definitions. It is loaded once at startup and read-only
//! afterwards; the [`IndexRegistry`] is the resolved, validated view the rest
//! of the system works against.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use search_sync_shared::{IndexDefinition, IndexSettings, IndexTarget};

use crate::errors::SyncError;

pub mod dependencies;

pub use dependencies::Dependencies;

/// Default number of records per import batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default number of results returned by a search.
pub const DEFAULT_NB_RESULTS: usize = 20;

/// Default timeout (in ms) when waiting for an engine task.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 5000;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_nb_results() -> usize {
    DEFAULT_NB_RESULTS
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_identifier_fields() -> Vec<String> {
    vec!["id".to_string()]
}

fn default_serializer_groups() -> Vec<String> {
    vec!["searchable".to_string()]
}

/// Top-level configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Prefix applied to every index name, e.g. `"app_dev_"`.
    #[serde(default)]
    pub prefix: String,
    /// Default number of search results.
    #[serde(default = "default_nb_results")]
    pub nb_results: usize,
    /// Number of records per import batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// The configured indices.
    #[serde(default)]
    pub indices: Vec<IndexEntry>,
}

/// One configured index.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexEntry {
    /// Logical index name, unique within the prefix scope.
    pub name: String,
    /// The source entity this index maps to. Defaults to `name`.
    #[serde(default)]
    pub entity: Option<String>,
    /// Constituent entities of an aggregator index. Non-empty marks this
    /// entry as an aggregator; `entity` and `table` are ignored then.
    #[serde(default)]
    pub aggregate: Vec<String>,
    /// Source table for the store-backed provider. Defaults to the entity.
    #[serde(default)]
    pub table: Option<String>,
    /// Name of the primary key attribute in documents.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Identifier columns, in pagination order.
    #[serde(default = "default_identifier_fields")]
    pub identifier_fields: Vec<String>,
    /// Whether serializer groups scope the normalized fields.
    #[serde(default)]
    pub enable_serializer_groups: bool,
    /// Active serializer groups when enabled.
    #[serde(default = "default_serializer_groups")]
    pub serializer_groups: Vec<String>,
    /// Field membership per group name.
    #[serde(default)]
    pub groups: HashMap<String, Vec<String>>,
    /// Property path deciding whether a record is indexed or removed.
    #[serde(default)]
    pub index_if: Option<String>,
    /// Engine-side index settings.
    #[serde(default)]
    pub settings: Option<IndexSettings>,
}

impl IndexEntry {
    pub fn is_aggregator(&self) -> bool {
        !self.aggregate.is_empty()
    }

    pub fn entity_name(&self) -> &str {
        self.entity.as_deref().unwrap_or(&self.name)
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or_else(|| self.entity_name())
    }
}

impl SearchConfig {
    /// Load the configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SyncError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml_str(&contents)
    }

    /// Parse the configuration from a YAML string.
    pub fn from_yaml_str(contents: &str) -> Result<Self, SyncError> {
        serde_yaml::from_str(contents)
            .map_err(|e| SyncError::configuration(format!("Invalid config: {}", e)))
    }
}

/// Check that a name is safe to interpolate into SQL as an identifier.
fn validate_sql_identifier(kind: &str, name: &str) -> Result<(), SyncError> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(SyncError::configuration(format!(
            "Invalid {} \"{}\": only alphanumeric characters and underscores are allowed",
            kind, name
        )));
    }

    Ok(())
}

/// Validated, resolved view over the configuration.
///
/// Built once at startup. Holds the expanded [`IndexDefinition`]s and the
/// lookup tables the mapper and manager need: entity to its own definition,
/// and entity to the aggregator definitions that also cover it.
#[derive(Debug)]
pub struct IndexRegistry {
    prefix: String,
    nb_results: usize,
    batch_size: usize,
    definitions: Vec<IndexDefinition>,
    by_name: HashMap<String, usize>,
    by_entity: HashMap<String, usize>,
    aggregators_by_entity: HashMap<String, Vec<usize>>,
}

impl IndexRegistry {
    /// Build and validate the registry from loaded configuration.
    pub fn new(config: &SearchConfig) -> Result<Self, SyncError> {
        if config.batch_size == 0 {
            return Err(SyncError::configuration(
                "batch_size must be a positive integer",
            ));
        }

        let mut definitions = Vec::with_capacity(config.indices.len());
        let mut by_name = HashMap::new();
        let mut by_entity: HashMap<String, usize> = HashMap::new();
        let mut aggregators_by_entity: HashMap<String, Vec<usize>> = HashMap::new();

        for entry in &config.indices {
            if by_name.contains_key(&entry.name) {
                return Err(SyncError::configuration(format!(
                    "Duplicate index name \"{}\"",
                    entry.name
                )));
            }

            if entry.is_aggregator() && entry.entity.is_some() {
                return Err(SyncError::configuration(format!(
                    "Index \"{}\" declares both entity and aggregate",
                    entry.name
                )));
            }

            for field in &entry.identifier_fields {
                validate_sql_identifier("identifier field", field)?;
            }
            if entry.identifier_fields.is_empty() {
                return Err(SyncError::configuration(format!(
                    "Index \"{}\" has no identifier fields",
                    entry.name
                )));
            }
            if !entry.is_aggregator() {
                validate_sql_identifier("table name", entry.table_name())?;
            }

            let target = if entry.is_aggregator() {
                IndexTarget::Aggregator(entry.aggregate.clone())
            } else {
                IndexTarget::Concrete(entry.entity_name().to_string())
            };

            let serializer_groups = if entry.enable_serializer_groups {
                entry.serializer_groups.clone()
            } else {
                Vec::new()
            };

            let definition = IndexDefinition {
                name: entry.name.clone(),
                prefixed_name: format!("{}{}", config.prefix, entry.name),
                target,
                primary_key: entry.primary_key.clone(),
                index_if: entry.index_if.clone(),
                serializer_groups,
                group_fields: entry.groups.clone(),
                settings: entry.settings.clone(),
            };

            let slot = definitions.len();
            by_name.insert(entry.name.clone(), slot);
            definitions.push(definition);
        }

        for (slot, definition) in definitions.iter().enumerate() {
            match &definition.target {
                IndexTarget::Concrete(entity) => {
                    // First index declaring an entity owns it.
                    by_entity.entry(entity.clone()).or_insert(slot);
                }
                IndexTarget::Aggregator(entities) => {
                    for entity in entities {
                        aggregators_by_entity
                            .entry(entity.clone())
                            .or_default()
                            .push(slot);
                    }
                }
            }
        }

        // Aggregator constituents need a concrete definition; without one
        // there is no provider to read their records from.
        for definition in &definitions {
            if let IndexTarget::Aggregator(entities) = &definition.target {
                for entity in entities {
                    if !by_entity.contains_key(entity) {
                        return Err(SyncError::configuration(format!(
                            "Aggregator index \"{}\" references unknown entity \"{}\"",
                            definition.name, entity
                        )));
                    }
                }
            }
        }

        Ok(Self {
            prefix: config.prefix.clone(),
            nb_results: config.nb_results,
            batch_size: config.batch_size,
            definitions,
            by_name,
            by_entity,
            aggregators_by_entity,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn nb_results(&self) -> usize {
        self.nb_results
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn definitions(&self) -> &[IndexDefinition] {
        &self.definitions
    }

    pub fn definition_by_name(&self, name: &str) -> Option<&IndexDefinition> {
        self.by_name.get(name).map(|slot| &self.definitions[*slot])
    }

    /// The concrete definition owning an entity.
    pub fn definition_for_entity(&self, entity: &str) -> Option<&IndexDefinition> {
        self.by_entity
            .get(entity)
            .map(|slot| &self.definitions[*slot])
    }

    /// Aggregator definitions that also cover an entity.
    pub fn aggregators_for_entity(&self, entity: &str) -> Vec<&IndexDefinition> {
        self.aggregators_by_entity
            .get(entity)
            .map(|slots| slots.iter().map(|slot| &self.definitions[*slot]).collect())
            .unwrap_or_default()
    }

    /// Whether an entity appears in the configuration, directly or through
    /// an aggregator.
    pub fn is_searchable(&self, entity: &str) -> bool {
        self.by_entity.contains_key(entity) || self.aggregators_by_entity.contains_key(entity)
    }

    /// The engine-side index uid for an entity, outside swap mode.
    pub fn searchable_as(&self, entity: &str) -> Result<String, SyncError> {
        self.definition_for_entity(entity)
            .map(|definition| definition.prefixed_name.clone())
            .ok_or_else(|| SyncError::not_searchable(entity))
    }
}

/// Parse a batch size supplied on the command line.
///
/// Only strings of ASCII digits are accepted, and zero is rejected; anything
/// else falls back to the configured default.
pub fn resolve_batch_size(supplied: Option<&str>, configured: usize) -> usize {
    supplied
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()))
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|parsed| *parsed > 0)
        .unwrap_or(configured)
}
