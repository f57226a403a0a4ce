//! Response normalization
//!
//! Backends answer in several inconsistent shapes. These pure functions map
//! every known shape onto [`EntityProfile`] and [`EntitySummary`] lists and
//! never fail: an unrecognized payload degrades to the most permissive
//! reading ("the raw result is the profile").
//!
//! Profile shapes:
//! - `{result: {X: {properties: {...}}}}`
//! - `{result: {properties: {...}}}`
//! - `{result: {...}}`
//! - `{result: [rowObject, ...]}` with relation arrays spread across rows
//! - `{resultRows: [[...]], columns: [...]}` as produced by the graph backend
//!
//! Relation lists are de-duplicated by display label, keeping the first seen
//! entry. Two distinct entities sharing a label therefore collapse into one.

use crate::kinds::EntityKind;
use crate::model::{EntityProfile, EntitySummary};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde_json::{Map, Value};
use tracing::debug;

const ID_KEYS: [&str; 3] = ["id", "entityId", "elementId"];
const LABEL_KEYS: [&str; 3] = ["label", "name", "title"];

type Row = Map<String, Value>;

/// Unwrap node-like `{properties: {...}}` values
fn node_properties(value: &Value) -> &Value {
    match value.get("properties") {
        Some(props @ Value::Object(_)) => props,
        _ => value,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_field<'a>(value: &Value, keys: impl IntoIterator<Item = &'a str>) -> Option<String> {
    keys.into_iter()
        .find_map(|key| value.get(key).and_then(scalar_string))
}

fn raw_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten one related item to `{entity_id, label}`.
///
/// The label comes from `label`, then `name`; failing both, the raw item
/// itself is used.
pub fn relation_summary(item: &Value) -> EntitySummary {
    let node = node_properties(item);
    let label = first_field(node, ["label", "name"]).unwrap_or_else(|| raw_label(item));
    let entity_id = first_field(node, ID_KEYS).unwrap_or_else(|| label.clone());
    EntitySummary::new(entity_id, label)
}

/// Keep the first occurrence of each label
pub fn dedupe_by_label(items: Vec<EntitySummary>) -> Vec<EntitySummary> {
    let mut seen = FxHashSet::default();
    items
        .into_iter()
        .filter(|item| seen.insert(item.label.clone()))
        .collect()
}

/// Keep the first occurrence of each id
pub fn dedupe_by_id(items: Vec<EntitySummary>) -> Vec<EntitySummary> {
    let mut seen = FxHashSet::default();
    items
        .into_iter()
        .filter(|item| seen.insert(item.entity_id.clone()))
        .collect()
}

/// Turn a positional row (no column names) into a row object: cell 0 is the
/// entity, the remaining cells map onto the kind's relation kinds in order.
fn positional_row(cells: &[Value], kind: &EntityKind) -> Row {
    let mut row = Row::new();
    let entity_key = kind.entity_key.clone().unwrap_or_else(|| "entity".to_string());
    let mut cells = cells.iter();
    if let Some(entity) = cells.next() {
        row.insert(entity_key, entity.clone());
    }
    for (relation, cell) in kind.relation_kinds.iter().zip(cells) {
        row.insert(relation.clone(), cell.clone());
    }
    row
}

fn columned_row(columns: &[String], cells: &[Value]) -> Row {
    columns
        .iter()
        .cloned()
        .zip(cells.iter().cloned())
        .collect()
}

fn columns_of(raw: &Value) -> Option<Vec<String>> {
    raw.get("columns")?.as_array().map(|cols| {
        cols.iter()
            .map(raw_label)
            .collect()
    })
}

/// Every profile shape reduced to a list of row objects
fn profile_rows(raw: &Value, kind: &EntityKind) -> Vec<Row> {
    if let Some(Value::Array(rows)) = raw.get("resultRows") {
        let columns = columns_of(raw);
        return rows
            .iter()
            .filter_map(|row| match (row, &columns) {
                (Value::Array(cells), Some(columns)) => Some(columned_row(columns, cells)),
                (Value::Array(cells), None) => Some(positional_row(cells, kind)),
                (Value::Object(map), _) => Some(map.clone()),
                _ => None,
            })
            .collect();
    }

    let payload = match raw.get("result") {
        Some(result) => result,
        None => {
            debug!("Profile payload for {} has no result key; using raw value", kind.name);
            raw
        }
    };

    match payload {
        Value::Array(rows) => rows
            .iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map.clone()),
                Value::Array(cells) => Some(positional_row(cells, kind)),
                _ => None,
            })
            .collect(),
        Value::Object(map) => vec![map.clone()],
        _ => Vec::new(),
    }
}

/// Locate the entity's own fields inside one row object
fn entity_fields<'a>(row: &'a Row, kind: &'a EntityKind) -> (Option<&'a str>, &'a Row) {
    if let Some(key) = kind.entity_key.as_deref() {
        if let Some(Value::Object(entity)) = row.get(key).map(node_properties) {
            return (Some(key), entity);
        }
    }
    if let Some(Value::Object(props)) = row.get("properties") {
        return (Some("properties"), props);
    }
    // `{X: {properties: {...}}}` under a key the kind does not know about
    let wrapped = row.iter().find(|(key, value)| {
        !kind.is_relation(key) && matches!(value.get("properties"), Some(Value::Object(_)))
    });
    if let Some((key, value)) = wrapped {
        if let Value::Object(entity) = node_properties(value) {
            return (Some(key.as_str()), entity);
        }
    }
    (None, row)
}

fn collect_relation_items(value: &Value, out: &mut Vec<EntitySummary>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                collect_relation_items(item, out);
            }
        }
        item => out.push(relation_summary(item)),
    }
}

/// Normalize any known profile payload. `requested_id` is the fallback
/// entity id when the payload carries none.
pub fn normalize_profile(raw: &Value, kind: &EntityKind, requested_id: &str) -> EntityProfile {
    let rows = profile_rows(raw, kind);

    let mut relations: IndexMap<String, Vec<EntitySummary>> = kind
        .relation_kinds
        .iter()
        .map(|relation| (relation.clone(), Vec::new()))
        .collect();
    let mut properties: IndexMap<String, Value> = IndexMap::new();

    for (index, row) in rows.iter().enumerate() {
        let (entity_key, entity) = entity_fields(row, kind);

        if index == 0 {
            for (key, value) in entity {
                if !kind.is_relation(key) {
                    properties.insert(key.clone(), value.clone());
                }
            }
            // Extra scalar columns next to the wrapped entity
            if entity_key.is_some() {
                for (key, value) in row {
                    if Some(key.as_str()) != entity_key
                        && !kind.is_relation(key)
                        && !properties.contains_key(key)
                    {
                        properties.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        for relation in &kind.relation_kinds {
            let items = relations.entry(relation.clone()).or_default();
            if let Some(value) = row.get(relation) {
                collect_relation_items(value, items);
            }
            if entity_key.is_some() {
                if let Some(value) = entity.get(relation) {
                    collect_relation_items(value, items);
                }
            }
        }
    }

    for items in relations.values_mut() {
        *items = dedupe_by_label(std::mem::take(items));
    }

    let id_keys = std::iter::once(kind.id_field.as_str()).chain(ID_KEYS);
    let entity_id = id_keys
        .into_iter()
        .find_map(|key| properties.get(key).and_then(scalar_string))
        .unwrap_or_else(|| requested_id.to_string());

    EntityProfile {
        entity_id,
        properties,
        relations,
    }
}

fn summary_from_object(value: &Value, kind: &EntityKind) -> Option<EntitySummary> {
    let node = node_properties(value);
    let id = first_field(node, std::iter::once(kind.id_field.as_str()).chain(ID_KEYS));
    let label = first_field(node, std::iter::once(kind.label_field.as_str()).chain(LABEL_KEYS));

    let (entity_id, label) = match (id, label) {
        (Some(id), Some(label)) => (id, label),
        (Some(id), None) => (id.clone(), id),
        (None, Some(label)) => (label.clone(), label),
        (None, None) => return None,
    };

    let mut summary = EntitySummary::new(entity_id, label);
    summary.secondary_label = kind
        .secondary_field
        .as_deref()
        .and_then(|field| node.get(field))
        .and_then(scalar_string);
    Some(summary)
}

/// Rows without column names: node-like cells win, otherwise the scalars are
/// read positionally as id, label, secondary label
fn row_summary(cells: &[Value], kind: &EntityKind) -> Option<EntitySummary> {
    if let Some(node) = cells.iter().find(|cell| cell.is_object()) {
        return summary_from_object(node, kind);
    }
    let mut scalars = cells.iter().map(scalar_string);
    let entity_id = scalars.next().flatten()?;
    let label = scalars.next().flatten().unwrap_or_else(|| entity_id.clone());
    let mut summary = EntitySummary::new(entity_id, label);
    summary.secondary_label = scalars.next().flatten();
    Some(summary)
}

fn element_summary(item: &Value, kind: &EntityKind) -> Option<EntitySummary> {
    match item {
        Value::Object(_) => summary_from_object(item, kind),
        Value::Array(cells) => row_summary(cells, kind),
        other => scalar_string(other).map(|s| EntitySummary::new(s.clone(), s)),
    }
}

fn has_suggestion_keys(raw: &Value) -> bool {
    raw.get("titles").is_some() || raw.get("events").is_some()
}

/// Normalize a list payload into summaries, de-duplicated by id (first seen)
pub fn normalize_list(raw: &Value, kind: &EntityKind) -> Vec<EntitySummary> {
    let summaries: Vec<EntitySummary> = if let Some(Value::Array(rows)) = raw.get("resultRows") {
        let columns = columns_of(raw);
        rows.iter()
            .filter_map(|row| match (row, &columns) {
                (Value::Array(cells), Some(columns)) => {
                    summary_from_object(&Value::Object(columned_row(columns, cells)), kind)
                }
                _ => element_summary(row, kind),
            })
            .collect()
    } else if has_suggestion_keys(raw) {
        return normalize_suggestions(raw, kind);
    } else {
        match raw.get("result").unwrap_or(raw) {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| element_summary(item, kind))
                .collect(),
            other => {
                debug!("Unrecognized list payload for {}: {}", kind.name, shape_name(other));
                Vec::new()
            }
        }
    };
    dedupe_by_id(summaries)
}

/// Normalize a suggestion payload (`{titles: [...], events: [...]}`),
/// falling back to any list shape
pub fn normalize_suggestions(raw: &Value, kind: &EntityKind) -> Vec<EntitySummary> {
    if !has_suggestion_keys(raw) {
        return normalize_list(raw, kind);
    }

    let mut summaries = Vec::new();
    for (key, secondary) in [("titles", "title"), ("events", "event")] {
        if let Some(Value::Array(items)) = raw.get(key) {
            summaries.extend(
                items
                    .iter()
                    .filter_map(|item| element_summary(item, kind))
                    .map(|s| s.with_secondary(secondary)),
            );
        }
    }
    dedupe_by_id(summaries)
}

/// Plain label list (e.g. countries) from any list shape
pub fn normalize_labels(raw: &Value) -> Vec<String> {
    let kind = EntityKind::builder("label").build();
    let mut seen = FxHashSet::default();
    normalize_list(raw, &kind)
        .into_iter()
        .map(|summary| summary.label)
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
