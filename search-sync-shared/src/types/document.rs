//! Document types for the search engine.
//!
//! This module defines the document identifier and the ephemeral document
//! structure submitted to the search engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier values of a source record, as an ordered list of
/// `(field name, value)` pairs. Never empty for a valid record.
pub type IdentifierValues = Vec<(String, Value)>;

/// Identifier of a document in the search engine.
///
/// Documents are identified either by an integer or by a string, depending on
/// the source record's primary key. Composite identifiers are flattened into
/// a single string (see [`DocumentId::from_identifier_values`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Integer(i64),
    String(String),
}

impl DocumentId {
    /// Derive a document id from a record's identifier values.
    ///
    /// A single identifier is used as-is (integers stay integers). Composite
    /// identifiers are joined as `field-value__field-value` with any trailing
    /// separator characters trimmed. Repeated calls over the same values
    /// produce byte-identical results.
    ///
    /// Returns `None` when `values` is empty.
    pub fn from_identifier_values(values: &IdentifierValues) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => Some(Self::from_value(&values[0].1)),
            _ => {
                let mut id = String::new();
                for (key, value) in values {
                    id.push_str(key);
                    id.push('-');
                    id.push_str(&Self::value_fragment(value));
                    id.push_str("__");
                }
                Some(DocumentId::String(
                    id.trim_end_matches('_').to_string(),
                ))
            }
        }
    }

    /// Convert a scalar JSON value into a document id.
    ///
    /// Returns `None` for non-scalar values, which cannot identify a
    /// document.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if n.is_i64() => Some(Self::from_value(value)),
            Value::String(_) => Some(Self::from_value(value)),
            _ => None,
        }
    }

    /// Convert a single identifier value into a document id.
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) if n.is_i64() => {
                // is_i64 checked above
                DocumentId::Integer(n.as_i64().unwrap_or_default())
            }
            Value::String(s) => DocumentId::String(s.clone()),
            other => DocumentId::String(Self::value_fragment(other)),
        }
    }

    /// Render an identifier value for use inside a composite id string.
    fn value_fragment(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// The id as a JSON value, for embedding into a document payload.
    pub fn as_json(&self) -> Value {
        match self {
            DocumentId::Integer(n) => Value::from(*n),
            DocumentId::String(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Integer(n) => write!(f, "{}", n),
            DocumentId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for DocumentId {
    fn from(value: i64) -> Self {
        DocumentId::Integer(value)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        DocumentId::String(value.to_string())
    }
}

/// A document ready for submission to the search engine.
///
/// Created immediately before submission and discarded once the engine call
/// returns; never persisted.
///
/// # Fields
///
/// - `index_uid`: the full engine-side index uid (prefix applied, possibly a
///   shadow uid during a zero-downtime import)
/// - `primary_key`: the name of the primary key attribute in the payload
/// - `id`: the document identifier derived from the source record
/// - `fields`: the normalized field map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchableDocument {
    pub index_uid: String,
    pub primary_key: String,
    pub id: DocumentId,
    pub fields: Map<String, Value>,
}

impl SearchableDocument {
    pub fn new(
        index_uid: impl Into<String>,
        primary_key: impl Into<String>,
        id: DocumentId,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            index_uid: index_uid.into(),
            primary_key: primary_key.into(),
            id,
            fields,
        }
    }

    /// The JSON payload submitted to the engine.
    ///
    /// Guarantees the primary key attribute is present; a value already in
    /// the field map wins over the derived id.
    pub fn into_payload(self) -> Map<String, Value> {
        let mut payload = self.fields;
        if !payload.contains_key(&self.primary_key) {
            payload.insert(self.primary_key, self.id.as_json());
        }
        payload
    }
}
