//! Dot-path (un)flattening of rollup documents.
//!
//! The server stores rollups as flat mappings from dotted key paths to
//! numbers (`byWasteType.Orgânico.totalKg -> 120.0`). These helpers convert
//! between that wire shape and nested JSON; keys without a dot pass through
//! verbatim, so top-level scalars like `totalKg` or an explicit `id` survive
//! the round trip untouched.

use common::error::CoreError;
use common::model::rollup::{NestedRollup, RollupDocument};
use serde_json::{Map, Value};

/// Expand a path-flattened mapping into a nested object.
///
/// When a scalar already occupies an intermediate segment of a later path,
/// the scalar wins and the conflicting path is dropped; the server never
/// produces such documents, but a malformed one must not panic the reader.
pub fn unflatten(flat: &Map<String, Value>) -> Value {
    let mut root = Map::new();
    for (path, value) in flat {
        insert_path(&mut root, path, value.clone());
    }
    Value::Object(root)
}

fn insert_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Collapse a nested object into a path-flattened mapping. Inverse of
/// [`unflatten`] for documents without empty intermediate objects.
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            flatten_into(&mut out, key, child);
        }
    }
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(out, &format!("{prefix}.{key}"), child);
            }
        }
        _ => {
            out.insert(prefix.to_string(), value.clone());
        }
    }
}

/// Unflatten a rollup document into its typed nested form.
///
/// Branches absent from the document come out as empty maps (zero
/// contribution). A document whose values cannot be read as the nested
/// schema at all is reported as a serialization error; the resolver treats
/// that the same as a missing breakdown structure and falls back to raw
/// records.
pub fn nested_from_document(doc: &RollupDocument) -> Result<NestedRollup, CoreError> {
    let nested = unflatten(&doc.fields);
    let mut rollup: NestedRollup = serde_json::from_value(nested)?;
    rollup.id = doc.id.clone();
    rollup.client_id = doc.client_id.clone();
    Ok(rollup)
}
