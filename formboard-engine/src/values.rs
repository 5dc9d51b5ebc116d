//! Helpers for reading live form-value maps.
//!
//! The engine accepts values either as a flat map keyed by dotted paths or as
//! a nested object tree; both address the same logical state. These helpers
//! normalize the difference for the schema validator and the evaluator.

use indexmap::IndexMap;
use serde_json::Value;

/// Flatten a value map into dotted concrete paths.
///
/// Objects recurse; arrays recurse only when their elements are objects
/// (repeater instances) — scalar arrays (multiselect values) are leaves.
/// Container values are kept alongside their children so existence checks
/// can see them.
pub fn flatten(values: &Value) -> IndexMap<String, &Value> {
    let mut out = IndexMap::new();
    if let Value::Object(map) = values {
        for (key, value) in map {
            walk(key.clone(), value, &mut out);
        }
    }
    out
}

fn walk<'a>(prefix: String, value: &'a Value, out: &mut IndexMap<String, &'a Value>) {
    out.insert(prefix.clone(), value);
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(format!("{prefix}.{key}"), child, out);
            }
        }
        Value::Array(items) if items.iter().any(Value::is_object) => {
            for (i, child) in items.iter().enumerate() {
                walk(format!("{prefix}.{i}"), child, out);
            }
        }
        _ => {}
    }
}

/// Look up a dotted path: exact flat key first, then a nested traversal
/// through objects and array indices.
pub fn lookup<'a>(values: &'a Value, path: &str) -> Option<&'a Value> {
    if let Value::Object(map) = values {
        if let Some(v) = map.get(path) {
            return Some(v);
        }
    }
    let mut current = values;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Coerce a value to a number: JSON numbers pass through, strings are parsed.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Whether a value counts as "not entered" for required-ness.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Equality with numeric coercion: `1` and `"1"` compare equal, everything
/// else falls back to strict JSON equality.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    a == b
}
