//! Document mapper: turns source records into searchable documents.
//!
//! One record can produce documents for several indices: its own index plus
//! every aggregator index covering its entity. Records failing their index
//! predicate are routed into the removal set of the same pass, so stale
//! documents disappear from the engine during a normal import.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use search_sync_shared::{DocumentId, IndexDefinition, SearchableDocument};

use crate::config::IndexRegistry;
use crate::errors::SyncError;
use crate::provider::{DataProvider, Record};

/// Result of mapping one page of records.
#[derive(Debug, Default)]
pub struct MappedBatch {
    /// Documents to index.
    pub documents: Vec<SearchableDocument>,
    /// Documents to remove (records failing their index predicate).
    pub removals: Vec<SearchableDocument>,
}

/// Maps records of configured entities into engine documents.
pub struct DocumentMapper {
    registry: Arc<IndexRegistry>,
}

impl DocumentMapper {
    pub fn new(registry: Arc<IndexRegistry>) -> Self {
        Self { registry }
    }

    /// Map a page of records belonging to one entity.
    ///
    /// `effective_prefix` is prepended to index names to form engine uids;
    /// during a zero-downtime import it carries the shadow marker.
    pub fn map_batch(
        &self,
        entity: &str,
        records: &[Record],
        provider: &dyn DataProvider,
        effective_prefix: &str,
    ) -> Result<MappedBatch, SyncError> {
        let base = self
            .registry
            .definition_for_entity(entity)
            .ok_or_else(|| SyncError::not_searchable(entity))?;

        let mut targets: Vec<&IndexDefinition> = vec![base];
        targets.extend(self.registry.aggregators_for_entity(entity));

        let mut batch = MappedBatch::default();

        for record in records {
            let identifier_values = provider.identifier_values(record)?;
            let id = DocumentId::from_identifier_values(&identifier_values)
                .ok_or_else(|| SyncError::identifier("Record has no primary key"))?;

            for definition in &targets {
                let index_uid = format!("{}{}", effective_prefix, definition.name);
                let fields = Self::normalize(record, definition);
                let document = SearchableDocument::new(
                    index_uid,
                    definition.primary_key.clone(),
                    id.clone(),
                    fields,
                );

                if Self::should_be_indexed(record, definition) {
                    batch.documents.push(document);
                } else {
                    batch.removals.push(document);
                }
            }
        }

        Ok(batch)
    }

    /// Apply the definition's serializer-group scope to a record.
    ///
    /// Empty groups mean no filter: every field is kept. Otherwise only
    /// fields belonging to at least one active group survive.
    fn normalize(record: &Record, definition: &IndexDefinition) -> Map<String, Value> {
        if definition.serializer_groups.is_empty() {
            return record.clone();
        }

        let allowed: HashSet<&str> = definition
            .serializer_groups
            .iter()
            .filter_map(|group| definition.group_fields.get(group))
            .flatten()
            .map(String::as_str)
            .collect();

        record
            .iter()
            .filter(|(key, _)| allowed.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Evaluate the definition's index predicate against a record.
    ///
    /// An unreadable path means "do not index".
    pub fn should_be_indexed(record: &Record, definition: &IndexDefinition) -> bool {
        match &definition.index_if {
            None => true,
            Some(path) => read_path(record, path).map(truthy).unwrap_or(false),
        }
    }
}

/// Walk a dot-separated property path through nested objects.
fn read_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

/// Boolean coercion for predicate values: null, zero, empty strings and
/// empty containers are falsy, everything else is truthy.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
