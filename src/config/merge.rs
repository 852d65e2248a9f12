//! Field-by-field merging of configuration tiers.
//!
//! Higher tiers override lower ones key by key. Arrays and scalars are
//! replaced whole.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// A null in `overlay` means "not specified" and keeps the base value.
///
/// # Example
/// ```
/// use serde_json::json;
/// use hit_batch::config::deep_merge;
///
/// let base = json!({"storage": {"db_path": "hits.db"}, "import": {"max_rows": 10}});
/// let overlay = json!({"import": {"max_rows": 50}});
/// let merged = deep_merge(base, overlay);
/// assert_eq!(merged["storage"]["db_path"], "hits.db");
/// assert_eq!(merged["import"]["max_rows"], 50);
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge values in order, later values taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
