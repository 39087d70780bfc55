//! Dot-path access into dynamic values

use serde_json::{Map, Value};

/// Split a dot path into its segments
pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// Value at a dot path, if every segment resolves through objects
pub(crate) fn value_at_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |current, segment| current.as_object()?.get(segment))
}

/// Whether the object that should hold the last segment of `path` exists
pub(crate) fn has_containing_object(root: &Value, path: &str) -> bool {
    match path.rsplit_once('.') {
        Some((parent, _)) => value_at_path(root, parent).is_some_and(Value::is_object),
        None => root.is_object(),
    }
}

/// Walk to the object that holds the last segment of `path`, creating
/// intermediate objects on the way. Existing siblings are preserved; a
/// non-object sitting on the path is replaced by an empty object.
pub(crate) fn materialize_parent<'a>(
    root: &'a mut Value,
    path: &[&str],
) -> Option<&'a mut Map<String, Value>> {
    let (_, parents) = path.split_last()?;
    let mut current = root;
    for segment in parents {
        let object = ensure_object(current)?;
        current = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current)
}

fn ensure_object(value: &mut Value) -> Option<&mut Map<String, Value>> {
    if !value.is_object() {
        if !value.is_null() {
            tracing::warn!("Replacing non-object value on destination path with an object");
        }
        *value = Value::Object(Map::new());
    }
    value.as_object_mut()
}
