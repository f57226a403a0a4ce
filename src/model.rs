//! Data model shared by the normalizer, fetchers and orchestrator

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Active filters, key -> selected values. Empty value lists are never stored.
pub type FilterMap = BTreeMap<String, Vec<String>>;

/// Minimal record for list and autocomplete display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub entity_id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_label: Option<String>,
}

impl EntitySummary {
    pub fn new(entity_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            label: label.into(),
            secondary_label: None,
        }
    }

    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary_label = Some(secondary.into());
        self
    }

    /// Case-insensitive substring match on label or id. `needle` must already
    /// be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.label.to_lowercase().contains(needle) || self.entity_id.to_lowercase().contains(needle)
    }
}

/// Normalized full record for one selected entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProfile {
    pub entity_id: String,
    /// Domain-specific properties in payload order
    pub properties: IndexMap<String, Value>,
    /// Relation kind -> related entities, de-duplicated by label
    pub relations: IndexMap<String, Vec<EntitySummary>>,
}

impl EntityProfile {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Related entities of one kind; empty when absent
    pub fn relation(&self, kind: &str) -> &[EntitySummary] {
        self.relations.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// "The" related entity for singular relations such as a parent
    /// organization: the first element of the de-duplicated list.
    pub fn head(&self, kind: &str) -> Option<&EntitySummary> {
        self.relation(kind).first()
    }

    /// Display name: `name`, then `label`, then the id
    pub fn display_name(&self) -> &str {
        self.property_str("name")
            .or_else(|| self.property_str("label"))
            .unwrap_or(&self.entity_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    #[default]
    Idle,
    /// Debounce timer armed
    Pending,
    Loading,
    Ready,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    /// No list fetch has run yet (context not ready)
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// Point-in-time copy of a search session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnapshot {
    pub query_text: String,
    pub generation: u64,
    pub candidates: Vec<EntitySummary>,
    pub status: SearchStatus,
}

/// Point-in-time copy of the selection state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    pub selected_id: Option<String>,
    pub last_fetched_id: Option<String>,
    pub profile: Option<EntityProfile>,
    pub status: SelectionStatus,
    pub error: Option<String>,
}

/// Point-in-time copy of the entity list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot {
    pub items: Vec<EntitySummary>,
    pub status: ListStatus,
    pub filters: FilterMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_matches_label_or_id() {
        let summary = EntitySummary::new("T-72B3", "Main Battle Tank");
        assert!(summary.matches("battle"));
        assert!(summary.matches("t-72"));
        assert!(!summary.matches("frigate"));
    }

    #[test]
    fn test_profile_accessors() {
        let mut profile = EntityProfile {
            entity_id: "42".to_string(),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "42");
        assert!(profile.relation("operators").is_empty());
        assert!(profile.head("operators").is_none());

        profile.properties.insert("name".to_string(), json!("Leopard 2"));
        profile.relations.insert(
            "operators".to_string(),
            vec![EntitySummary::new("de", "Germany"), EntitySummary::new("pl", "Poland")],
        );
        assert_eq!(profile.display_name(), "Leopard 2");
        assert_eq!(profile.head("operators").unwrap().label, "Germany");
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let value = serde_json::to_value(EntitySummary::new("1", "A").with_secondary("B")).unwrap();
        assert_eq!(value, json!({"entityId": "1", "label": "A", "secondaryLabel": "B"}));
    }
}
