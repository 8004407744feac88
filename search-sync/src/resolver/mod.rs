//! Entity resolver: turns requested index names into concrete import targets.
//!
//! Aggregator definitions expand into one entry per constituent entity, all
//! sharing the aggregator's name; the result is deduplicated so the same
//! `(name, entity)` pair is imported once.

use std::sync::Arc;
use tracing::debug;

use search_sync_shared::ResolvedIndex;

use crate::config::IndexRegistry;

/// Resolves requested index names against the configured definitions.
pub struct EntityResolver {
    registry: Arc<IndexRegistry>,
}

impl EntityResolver {
    pub fn new(registry: Arc<IndexRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve a set of requested index names.
    ///
    /// An empty request means all configured indices. Requested names are
    /// normalized by prepending the configured prefix unless already
    /// present, then matched against the definitions' prefixed names.
    /// Resolving the same input twice yields the same result.
    pub fn resolve(&self, requested: &[String]) -> Vec<ResolvedIndex> {
        let prefix = self.registry.prefix();

        let wanted: Vec<String> = requested
            .iter()
            .map(|name| {
                if name.starts_with(prefix) {
                    name.clone()
                } else {
                    format!("{}{}", prefix, name)
                }
            })
            .collect();

        let mut resolved: Vec<ResolvedIndex> = Vec::new();

        for definition in self.registry.definitions() {
            if !wanted.is_empty() && !wanted.contains(&definition.prefixed_name) {
                continue;
            }

            for entity in definition.target.entities() {
                let entry = ResolvedIndex {
                    name: definition.name.clone(),
                    prefixed_name: definition.prefixed_name.clone(),
                    entity: entity.to_string(),
                };

                if !resolved.contains(&entry) {
                    resolved.push(entry);
                }
            }
        }

        debug!(
            requested = requested.len(),
            resolved = resolved.len(),
            "Resolved import targets"
        );

        resolved
    }
}
