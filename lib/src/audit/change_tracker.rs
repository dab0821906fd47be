// lib/src/audit/change_tracker.rs

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use models::medical::{FieldChange, Visit};

/// Bookkeeping fields that change on every mutation and carry no information
/// of their own in a diff.
const IGNORED_FIELDS: [&str; 2] = ["updatedAt", "updatedBy"];

fn as_object(visit: Option<&Visit>) -> Map<String, Value> {
    match visit.and_then(|v| serde_json::to_value(v).ok()) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Field-level diff keyed by wire (camelCase) field name. Only fields whose
/// value actually changed are present; an absent side is `null`.
pub fn diff_visits(before: Option<&Visit>, after: Option<&Visit>) -> BTreeMap<String, FieldChange> {
    let before = as_object(before);
    let after = as_object(after);

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter(|key| !IGNORED_FIELDS.contains(&key.as_str()))
        .filter_map(|key| {
            let old = before.get(key).cloned().unwrap_or(Value::Null);
            let new = after.get(key).cloned().unwrap_or(Value::Null);
            (old != new).then(|| (key.clone(), FieldChange { before: old, after: new }))
        })
        .collect()
}
