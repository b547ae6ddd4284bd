//! Descriptor documents (topologies, experiments) as JSON trees
//!
//! Documents are `serde_json::Value` trees with key order preserved, so a
//! `clone()` is a full structural copy and a write/read cycle keeps both
//! values and field order.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A topology or experiment descriptor.
pub type Document = Value;

/// Read and parse a descriptor from disk.
///
/// # Errors
///
/// Returns `Error::TemplateLoad` if the file cannot be read or parsed
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::TemplateLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| Error::TemplateLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Serialize with 4-space indentation.
///
/// # Errors
///
/// Returns error if the value cannot be serialized
pub fn to_pretty_string<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write a descriptor, creating parent directories as needed.
///
/// # Errors
///
/// Returns error if a directory or the file cannot be created
pub fn write_document<P: AsRef<Path>>(path: P, doc: &Document) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = to_pretty_string(doc)?;
    let mut file = fs::File::create(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// Set `map[key][field] = value`, creating `map[key]` (or replacing it, if
/// it is not an object) as needed.
pub(crate) fn set_nested(map: &mut Map<String, Value>, key: &str, field: &str, value: Value) {
    match map.get_mut(key) {
        Some(Value::Object(inner)) => {
            inner.insert(field.to_string(), value);
        }
        slot => {
            let mut inner = Map::new();
            inner.insert(field.to_string(), value);
            match slot {
                Some(existing) => *existing = Value::Object(inner),
                None => {
                    map.insert(key.to_string(), Value::Object(inner));
                }
            }
        }
    }
}

/// Mutable objects of the array stored at `key`, skipping non-object items.
pub(crate) fn objects_mut<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    map.get_mut(key)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pretty_uses_four_spaces() {
        let text = to_pretty_string(&json!({"a": {"b": 1}})).unwrap();
        assert!(text.contains("\n    \"a\": {\n        \"b\": 1\n    }"));
    }

    #[test]
    fn test_write_then_load_preserves_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/doc.json");
        let doc = json!({
            "zeta": 1,
            "alpha": [1.5, {"x": null}],
            "mid": {"k": "v"}
        });

        write_document(&path, &doc).unwrap();
        let loaded = load_document(&path).unwrap();

        assert_eq!(loaded, doc);
        let keys: Vec<&String> = loaded.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_load_missing_is_template_error() {
        let err = load_document("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::TemplateLoad { .. }));
    }

    #[test]
    fn test_set_nested_replaces_scalar() {
        let mut map = Map::new();
        map.insert("cpu".into(), json!(3));
        set_nested(&mut map, "cpu", "coreCount", json!(8));
        assert_eq!(Value::Object(map), json!({"cpu": {"coreCount": 8}}));
    }

    #[test]
    fn test_set_nested_keeps_siblings_and_creates_missing() {
        let mut map = Map::new();
        map.insert("cpu".into(), json!({"coreSpeed": 2100}));
        set_nested(&mut map, "cpu", "coreCount", json!(8));
        set_nested(&mut map, "memory", "memorySize", json!(512));
        assert_eq!(
            Value::Object(map),
            json!({"cpu": {"coreSpeed": 2100, "coreCount": 8}, "memory": {"memorySize": 512}})
        );
    }
}
