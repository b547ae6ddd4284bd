//! Reference entries and selection manifest records

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::naming::normalize_path;

/// Type given to workload entries the base template says nothing about.
pub const DEFAULT_WORKLOAD_TYPE: &str = "ComputeWorkload";

/// Type given to failure-model entries the base template says nothing about.
pub const DEFAULT_FAILURE_TYPE: &str = "trace-based";

/// A `{pathToFile, type?}` reference inside an experiment descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Workspace-relative, forward-slash path.
    #[serde(rename = "pathToFile")]
    pub path_to_file: String,
    /// Entry type, when known.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
}

/// Build the reference entry for `folder/file`.
///
/// The type comes from `original` (the base entry at the same position) when
/// it has one, else from `default_type`, else it is omitted.
#[must_use]
pub fn build_entry(folder: &str, file: &str, original: Option<&Value>, default_type: Option<&str>) -> EntryRecord {
    let entry_type = original
        .and_then(|entry| entry.get("type"))
        .and_then(Value::as_str)
        .or(default_type)
        .map(ToString::to_string);

    EntryRecord {
        path_to_file: normalize_path(&format!("{folder}/{file}")),
        entry_type,
    }
}

/// Metadata for one generated experiment, consumed by queueing,
/// validation and export.
///
/// The reference lists hold the file names exactly as they were selected
/// (relative to their input folder); `None` means the base template's
/// references were kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    /// Experiment file name relative to the experiments root.
    pub name: String,
    /// Selected topology files.
    pub topology: Option<Vec<String>>,
    /// Selected workload files.
    pub workload: Option<Vec<String>>,
    /// Selected failure trace files.
    pub failures: Option<Vec<String>>,
}

impl SelectionEntry {
    /// Entry for an existing experiment file with no explicit selections.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topology: None,
            workload: None,
            failures: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_from_original_entry() {
        let original = json!({"pathToFile": "old.csv", "type": "TraceWorkload"});
        let entry = build_entry("workload_traces", "w.csv", Some(&original), Some(DEFAULT_WORKLOAD_TYPE));
        assert_eq!(entry.path_to_file, "workload_traces/w.csv");
        assert_eq!(entry.entry_type.as_deref(), Some("TraceWorkload"));
    }

    #[test]
    fn test_type_falls_back_to_default_then_none() {
        let untyped = json!({"pathToFile": "old.json"});
        let entry = build_entry("failure_traces", "f.parquet", Some(&untyped), Some(DEFAULT_FAILURE_TYPE));
        assert_eq!(entry.entry_type.as_deref(), Some("trace-based"));

        let topo = build_entry("topologies", "borg/DE.json", None, None);
        assert_eq!(serde_json::to_value(&topo).unwrap(), json!({"pathToFile": "topologies/borg/DE.json"}));
    }

    #[test]
    fn test_path_is_normalized() {
        let entry = build_entry("topologies/", ".\\borg\\DE.json", None, None);
        assert_eq!(entry.path_to_file, "topologies/borg/DE.json");
    }

    #[test]
    fn test_selection_entry_serde_shape() {
        let entry = SelectionEntry {
            name: "exp.json".into(),
            topology: Some(vec!["a.json".into()]),
            workload: None,
            failures: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({"name": "exp.json", "topology": ["a.json"], "workload": null, "failures": null})
        );
    }
}
