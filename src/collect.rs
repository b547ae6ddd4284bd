//! Minimal file set needed to reproduce a batch of experiments

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::config::{folder_prefix, CapsuleConfig};
use crate::document::{load_document, Document};
use crate::experiment::SelectionEntry;
use crate::naming::normalize_path;

fn references<'a>(document: &'a Document, key: &'a str) -> impl Iterator<Item = String> + 'a {
    document
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("pathToFile").and_then(Value::as_str))
        .filter(|p| !p.is_empty())
        .map(normalize_path)
}

/// Carbon traces referenced by a topology's cluster power sources.
fn carbon_traces(topology: &Document) -> impl Iterator<Item = String> + '_ {
    topology
        .get("clusters")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|cluster| cluster.pointer("/powerSource/carbonTracePath"))
        .filter_map(Value::as_str)
        .map(normalize_path)
}

/// Workspace-relative paths of every file a capsule needs for `selections`.
///
/// Includes each experiment file; the topology, workload and failure files
/// the selection lists (or, when it lists none, every `pathToFile` in the
/// experiment); and the carbon traces referenced by collected topologies.
/// Topologies and carbon traces are only followed when present on disk.
#[must_use]
pub fn collect_experiment_files(config: &CapsuleConfig, selections: &[SelectionEntry]) -> BTreeSet<String> {
    let mut required = BTreeSet::new();
    let experiments_folder = folder_prefix(&config.experiments_root);

    for selection in selections {
        let experiment_path = normalize_path(&format!("{experiments_folder}/{}", selection.name));
        required.insert(experiment_path.clone());

        let experiment = match load_document(config.resolve(&experiment_path)) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(experiment = %selection.name, error = %e, "failed to load experiment");
                continue;
            }
        };

        let sources = [
            (&selection.topology, &config.topologies_root, "topologies"),
            (&selection.workload, &config.workload_traces_folder, "workloads"),
            (&selection.failures, &config.failure_traces_folder, "failureModels"),
        ];
        for (selected, folder, key) in sources {
            match selected.as_deref() {
                Some(files) if !files.is_empty() => {
                    let folder = folder_prefix(folder);
                    required.extend(files.iter().map(|f| normalize_path(&format!("{folder}/{f}"))));
                }
                _ => required.extend(references(&experiment, key)),
            }
        }

        for topology_path in references(&experiment, "topologies") {
            let resolved = config.resolve(&topology_path);
            if !resolved.exists() {
                continue;
            }
            match load_document(&resolved) {
                Ok(topology) => required.extend(
                    carbon_traces(&topology).filter(|trace| config.resolve(Path::new(trace)).exists()),
                ),
                Err(e) => warn!(topology = %topology_path, error = %e, "failed to parse topology"),
            }
        }
    }

    required
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::write_document;
    use serde_json::json;

    #[test]
    fn test_collects_references_and_carbon_traces() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = CapsuleConfig::with_root(root);

        std::fs::create_dir_all(root.join("carbon_traces")).unwrap();
        std::fs::write(root.join("carbon_traces/NL.parquet"), "").unwrap();
        write_document(
            root.join("topologies/borg/DE.json"),
            &json!({"clusters": [
                {"powerSource": {"carbonTracePath": "carbon_traces/NL.parquet"}},
                {"powerSource": {"carbonTracePath": "carbon_traces/missing.parquet"}}
            ]}),
        )
        .unwrap();
        write_document(
            root.join("experiments/exp.json"),
            &json!({
                "topologies": [{"pathToFile": "topologies/borg/DE.json"}],
                "workloads": [{"pathToFile": "workload_traces/w.parquet"}],
                "failureModels": [{"pathToFile": "failure_traces/f.parquet"}]
            }),
        )
        .unwrap();

        let selection = SelectionEntry {
            name: "exp.json".into(),
            topology: None,
            workload: Some(vec!["chosen.parquet".into()]),
            failures: Some(vec![]),
        };
        let files: Vec<String> = collect_experiment_files(&config, &[selection]).into_iter().collect();

        assert_eq!(
            files,
            [
                "carbon_traces/NL.parquet",
                "experiments/exp.json",
                "failure_traces/f.parquet",
                "topologies/borg/DE.json",
                "workload_traces/chosen.parquet",
            ]
        );
    }

    #[test]
    fn test_unreadable_experiment_still_listed() {
        let dir = tempfile::tempdir().unwrap();
        let config = CapsuleConfig::with_root(dir.path());
        let files = collect_experiment_files(&config, &[SelectionEntry::named("ghost.json")]);
        assert_eq!(files.into_iter().collect::<Vec<_>>(), ["experiments/ghost.json"]);
    }
}
