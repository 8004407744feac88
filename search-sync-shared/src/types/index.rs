//! Index definition types.
//!
//! An index definition is static configuration: loaded once at startup and
//! read-only afterwards. Aggregator definitions expand at resolution time
//! into one entry per constituent entity, all sharing the aggregator's name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::settings::IndexSettings;

/// What an index maps to on the source side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexTarget {
    /// A single concrete entity.
    Concrete(String),
    /// A composite index aggregating several entities.
    Aggregator(Vec<String>),
}

impl IndexTarget {
    pub fn is_aggregator(&self) -> bool {
        matches!(self, IndexTarget::Aggregator(_))
    }

    /// The entities this target covers, in declaration order.
    pub fn entities(&self) -> Vec<&str> {
        match self {
            IndexTarget::Concrete(entity) => vec![entity.as_str()],
            IndexTarget::Aggregator(entities) => entities.iter().map(String::as_str).collect(),
        }
    }
}

/// Static configuration of one search index.
///
/// # Fields
///
/// - `name`: logical name, unique within the prefix scope
/// - `prefixed_name`: `prefix + name`, the engine-side uid outside swap mode
/// - `target`: concrete entity or aggregator
/// - `primary_key`: name of the primary key attribute in documents
/// - `index_if`: optional property path evaluated per record; records whose
///   path is unreadable or falsy are removed instead of indexed
/// - `serializer_groups`: group scope for normalization; empty means no
///   group filter
/// - `group_fields`: field membership per group name
/// - `settings`: engine-side index settings pushed by the settings updater
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub prefixed_name: String,
    pub target: IndexTarget,
    pub primary_key: String,
    pub index_if: Option<String>,
    pub serializer_groups: Vec<String>,
    pub group_fields: HashMap<String, Vec<String>>,
    pub settings: Option<IndexSettings>,
}

/// One entry of the resolver's output: a `(name, prefixed_name, entity)`
/// triple. Aggregators have already been expanded at this point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedIndex {
    pub name: String,
    pub prefixed_name: String,
    pub entity: String,
}
