//! # Search Sync Shared
//!
//! This crate defines shared data structures and types used across the search
//! sync ecosystem: document identifiers, searchable documents, index
//! definitions and engine-side index settings.

pub mod types;

pub use types::document::{DocumentId, IdentifierValues, SearchableDocument};
pub use types::index::{IndexDefinition, IndexTarget, ResolvedIndex};
pub use types::settings::IndexSettings;
