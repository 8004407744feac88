//! Engine-side index settings.
//!
//! Mirrors the settings object of the search engine's settings endpoint.
//! All fields are optional; only fields that are `Some` are pushed, leaving
//! the engine defaults untouched for the rest.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index settings: attributes, ranking rules, typo tolerance and friends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displayed_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filterable_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortable_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_rules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<HashMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typo_tolerance: Option<TypoTolerance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faceting: Option<Faceting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl IndexSettings {
    /// True when no setting is present, in which case there is nothing to
    /// push to the engine.
    pub fn is_empty(&self) -> bool {
        self == &IndexSettings::default()
    }
}

/// Typo tolerance settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypoTolerance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_word_size_for_typos: Option<MinWordSizeForTypos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_on_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_on_attributes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinWordSizeForTypos {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_typo: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_typos: Option<u32>,
}

/// Faceting settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faceting {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_values_per_facet: Option<u64>,
}

/// Pagination settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_total_hits: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_settings() {
        assert!(IndexSettings::default().is_empty());

        let settings = IndexSettings {
            ranking_rules: Some(vec!["words".to_string()]),
            ..Default::default()
        };
        assert!(!settings.is_empty());
    }

    #[test]
    fn test_camel_case_wire_format() {
        let settings = IndexSettings {
            filterable_attributes: Some(vec!["status".to_string()]),
            typo_tolerance: Some(TypoTolerance {
                enabled: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            value,
            json!({
                "filterableAttributes": ["status"],
                "typoTolerance": {"enabled": false}
            })
        );
    }

    #[test]
    fn test_deserialize_from_config_shape() {
        let settings: IndexSettings = serde_json::from_value(json!({
            "rankingRules": ["words", "typo"],
            "searchableAttributes": ["title", "body"],
            "pagination": {"maxTotalHits": 2000}
        }))
        .unwrap();

        assert_eq!(
            settings.ranking_rules,
            Some(vec!["words".to_string(), "typo".to_string()])
        );
        assert_eq!(settings.pagination.unwrap().max_total_hits, Some(2000));
    }
}
