//! Store-backed data provider over SQLite.
//!
//! Pages through a table ordered by its identifier columns ascending. Table
//! and column names come from validated configuration; they are interpolated
//! into SQL as quoted identifiers since placeholders cannot bind them.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::debug;

use search_sync_shared::{DocumentId, IdentifierValues};

use crate::errors::SyncError;
use crate::provider::{identifier_values_from_fields, DataProvider, Record};

/// Data provider reading records from a SQLite table.
pub struct SqliteEntityProvider {
    pool: SqlitePool,
    table: String,
    identifier_fields: Vec<String>,
}

impl SqliteEntityProvider {
    /// Create a provider for one table.
    ///
    /// Table and identifier names must be plain identifiers (alphanumeric and
    /// underscores); anything else is rejected.
    pub fn new(
        pool: SqlitePool,
        table: impl Into<String>,
        identifier_fields: Vec<String>,
    ) -> Result<Self, SyncError> {
        let table = table.into();

        Self::validate_identifier(&table)?;
        if identifier_fields.is_empty() {
            return Err(SyncError::configuration(format!(
                "Table \"{}\" needs at least one identifier field",
                table
            )));
        }
        for field in &identifier_fields {
            Self::validate_identifier(field)?;
        }

        Ok(Self {
            pool,
            table,
            identifier_fields,
        })
    }

    fn validate_identifier(name: &str) -> Result<(), SyncError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(SyncError::configuration(format!(
                "Invalid SQL identifier \"{}\"",
                name
            )));
        }

        Ok(())
    }

    fn order_by_clause(&self) -> String {
        self.identifier_fields
            .iter()
            .map(|field| format!("\"{}\" ASC", field))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Decode a row into a flat JSON record, by storage class.
    ///
    /// Binary columns carry no searchable text and decode to null.
    fn row_to_record(row: &SqliteRow) -> Result<Record, SyncError> {
        let mut record = Record::new();

        for (position, column) in row.columns().iter().enumerate() {
            let raw = row
                .try_get_raw(position)
                .map_err(|e| SyncError::provider(e.to_string()))?;

            let value = if raw.is_null() {
                Value::Null
            } else {
                match raw.type_info().name().to_ascii_uppercase().as_str() {
                    "INTEGER" | "BOOLEAN" => Value::from(
                        row.try_get::<i64, _>(position)
                            .map_err(|e| SyncError::provider(e.to_string()))?,
                    ),
                    "REAL" | "NUMERIC" => Value::from(
                        row.try_get::<f64, _>(position)
                            .map_err(|e| SyncError::provider(e.to_string()))?,
                    ),
                    "BLOB" => Value::Null,
                    _ => Value::from(
                        row.try_get::<String, _>(position)
                            .map_err(|e| SyncError::provider(e.to_string()))?,
                    ),
                }
            };

            record.insert(column.name().to_string(), value);
        }

        Ok(record)
    }
}

#[async_trait]
impl DataProvider for SqliteEntityProvider {
    async fn provide(&self, limit: usize, offset: usize) -> Result<Vec<Record>, SyncError> {
        let sql = format!(
            "SELECT * FROM \"{}\" ORDER BY {} LIMIT ? OFFSET ?",
            self.table,
            self.order_by_clause()
        );

        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SyncError::provider(e.to_string()))?;

        debug!(
            table = %self.table,
            limit = limit,
            offset = offset,
            row_count = rows.len(),
            "Fetched page"
        );

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn load_by_identifiers(&self, ids: &[DocumentId]) -> Result<Vec<Record>, SyncError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        if self.identifier_fields.len() > 1 {
            return Err(SyncError::provider(format!(
                "Table \"{}\" has a composite identifier; lookup by identifier is not supported",
                self.table
            )));
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM \"{}\" WHERE \"{}\" IN ({})",
            self.table, self.identifier_fields[0], placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = match id {
                DocumentId::Integer(n) => query.bind(*n),
                DocumentId::String(s) => query.bind(s.clone()),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SyncError::provider(e.to_string()))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    fn identifier_values(&self, record: &Record) -> Result<IdentifierValues, SyncError> {
        identifier_values_from_fields(record, &self.identifier_fields)
    }

    async fn cleanup(&self) {
        // The pool holds no per-batch identity map; nothing to release.
    }
}
