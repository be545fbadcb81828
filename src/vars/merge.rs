// src/vars/merge.rs

//! Recursive deep-merge of template variables.

use serde_json::{Map, Value};

/// Merge `overlay` onto `base`, returning a new value.
///
/// Nested objects merge key-wise; every other combination (scalars, arrays,
/// or an object meeting a non-object) is replaced wholesale by `overlay`.
/// Neither input is modified.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(deep_merge_maps(base_map, overlay_map))
        }
        (_, other) => other.clone(),
    }
}

/// Object-level form of [`deep_merge`].
pub fn deep_merge_maps(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, overlay_value) in overlay {
        let next = match merged.get(key) {
            Some(existing) => deep_merge(existing, overlay_value),
            None => overlay_value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}
