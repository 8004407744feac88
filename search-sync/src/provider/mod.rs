//! Data providers: paginated access to source records.
//!
//! One provider per concrete entity. Providers own no cross-index state;
//! per-batch caches are released with [`DataProvider::cleanup`] after every
//! page so memory stays bounded over arbitrarily large imports.

use async_trait::async_trait;
use serde_json::{Map, Value};

use search_sync_shared::{DocumentId, IdentifierValues};

use crate::errors::SyncError;

pub mod sqlite;

pub use sqlite::SqliteEntityProvider;

/// A source record, as a flat field map.
pub type Record = Map<String, Value>;

/// Paginated access to the records of one entity.
///
/// `provide` must return records ordered by their identifier fields
/// ascending, so that pagination is stable and non-overlapping across calls
/// even when rows are inserted concurrently. Insertion order is not
/// guaranteed, only identifier order.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Return up to `limit` records starting at `offset`, identifier
    /// ascending.
    async fn provide(&self, limit: usize, offset: usize) -> Result<Vec<Record>, SyncError>;

    /// Bulk lookup by primary key, used to hydrate search results.
    async fn load_by_identifiers(&self, ids: &[DocumentId]) -> Result<Vec<Record>, SyncError>;

    /// The identifier field(s) of a record as a non-empty ordered mapping.
    ///
    /// Fails with [`SyncError::Identifier`] when the record lacks an
    /// identifier.
    fn identifier_values(&self, record: &Record) -> Result<IdentifierValues, SyncError>;

    /// Release any per-batch caching state. Invoked once per page after
    /// submission.
    async fn cleanup(&self);
}

/// Read the given identifier fields out of a record.
///
/// Shared by provider implementations; a missing or null field means the
/// record has no resolvable identifier.
pub fn identifier_values_from_fields(
    record: &Record,
    fields: &[String],
) -> Result<IdentifierValues, SyncError> {
    let mut values = IdentifierValues::with_capacity(fields.len());

    for field in fields {
        match record.get(field) {
            Some(value) if !value.is_null() => values.push((field.clone(), value.clone())),
            _ => {
                return Err(SyncError::identifier(format!(
                    "Record has no value for identifier field \"{}\"",
                    field
                )))
            }
        }
    }

    if values.is_empty() {
        return Err(SyncError::identifier("Record has no primary key"));
    }

    Ok(values)
}
