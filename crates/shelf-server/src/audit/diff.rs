//! Field-level change computation
//!
//! Business code calls [`compute_changes`] with the entity state before and
//! after a mutation. The capture pipeline never diffs on its own; it only sees
//! request and response shapes.
//!
//! ```rust
//! use serde_json::json;
//! use shelf_server::audit::diff::compute_changes;
//!
//! let before = json!({"name": "Old", "price": 100});
//! let after = json!({"name": "New", "price": 100});
//! let changes = compute_changes(before.as_object(), after.as_object(), None).unwrap();
//!
//! assert_eq!(changes.before.unwrap()["name"], "Old");
//! assert!(!changes.after.unwrap().contains_key("price"));
//! ```

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::models::{AuditChanges, Snapshot};

/// Compute the minimal before/after delta between two snapshots
///
/// Only `fields` are examined when given, otherwise every key of `after`.
/// Values are compared structurally, numbers by value (`100` equals `100.0`).
/// A field missing on one side differs from a field set to `null`; the
/// missing side simply omits the key.
/// Returns `None` when nothing changed.
pub fn compute_changes(
    before: Option<&Snapshot>,
    after: Option<&Snapshot>,
    fields: Option<&[&str]>,
) -> Option<AuditChanges> {
    let (before, after) = match (before, after) {
        (None, None) => return None,
        (None, Some(after)) => {
            return Some(AuditChanges {
                before: None,
                after: Some(after.clone()),
            })
        }
        (Some(before), None) => {
            return Some(AuditChanges {
                before: Some(before.clone()),
                after: None,
            })
        }
        (Some(before), Some(after)) => (before, after),
    };

    let mut changed_before = Snapshot::new();
    let mut changed_after = Snapshot::new();

    let mut record = |field: &str| {
        let old = before.get(field);
        let new = after.get(field);
        let unchanged = match (old, new) {
            (Some(old), Some(new)) => same_value(old, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        if let Some(old) = old {
            changed_before.insert(field.to_string(), old.clone());
        }
        if let Some(new) = new {
            changed_after.insert(field.to_string(), new.clone());
        }
    };

    match fields {
        Some(fields) => fields.iter().for_each(|field| record(*field)),
        None => after.keys().for_each(|field| record(field.as_str())),
    }

    if changed_before.is_empty() && changed_after.is_empty() {
        return None;
    }

    Some(AuditChanges {
        before: Some(changed_before),
        after: Some(changed_after),
    })
}

fn same_value(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            x == y || matches!((x.as_f64(), y.as_f64()), (Some(x), Some(y)) if x == y)
        },
        (JsonValue::Array(xs), JsonValue::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        },
        (JsonValue::Object(xs), JsonValue::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| same_value(x, y)))
        },
        _ => a == b,
    }
}

/// Serialize a typed entity into a snapshot
///
/// Returns `None` when the value does not serialize to a JSON object.
pub fn snapshot_of<T: Serialize>(value: &T) -> Option<Snapshot> {
    match serde_json::to_value(value).ok()? {
        JsonValue::Object(map) => Some(map),
        _ => None,
    }
}
