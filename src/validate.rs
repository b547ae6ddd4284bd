//! Reference validation for generated experiments
//!
//! Every experiment in a batch is checked and gets its own outcome; a bad
//! experiment never hides problems in the ones after it.

use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::CapsuleConfig;
use crate::document::load_document;
use crate::experiment::SelectionEntry;
use crate::Error;

/// Document keys whose entries must point at existing files.
pub const REFERENCE_KEYS: [&str; 3] = ["topologies", "workloads", "failureModels"];

/// Result of validating one experiment.
#[derive(Debug)]
pub enum ValidationStatus {
    /// Every reference resolves to an existing file.
    Valid,
    /// The experiment file itself could not be read or parsed.
    Unreadable(String),
    /// One error per malformed entry or missing file.
    Invalid(Vec<Error>),
}

/// Outcome for one experiment of a batch.
#[derive(Debug)]
pub struct ValidationOutcome {
    /// Experiment file name relative to the experiments root.
    pub name: String,
    /// What was found.
    pub status: ValidationStatus,
}

impl ValidationOutcome {
    /// Whether the experiment passed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self.status, ValidationStatus::Valid)
    }
}

/// Outcomes for a whole batch, in input order.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// One outcome per validated experiment.
    pub outcomes: Vec<ValidationOutcome>,
}

impl ValidationReport {
    /// True when every experiment is valid (vacuously true when empty).
    #[must_use]
    pub fn all_valid(&self) -> bool {
        self.outcomes.iter().all(ValidationOutcome::is_valid)
    }

    /// Outcomes that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &ValidationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_valid())
    }
}

/// Check that each entry under `key` has a `pathToFile` that exists.
///
/// Missing keys are fine. Paths are resolved against the workspace root.
#[must_use]
pub fn check_references(config: &CapsuleConfig, key: &str, document: &Value, experiment: &str) -> Vec<Error> {
    let Some(entries) = document.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            match entry.get("pathToFile").and_then(Value::as_str).filter(|p| !p.is_empty()) {
                None => Some(Error::MissingPathToFile {
                    experiment: experiment.to_string(),
                    key: key.to_string(),
                    entry: entry.to_string(),
                }),
                Some(path) if !config.resolve(path).exists() => Some(Error::ReferencedFileMissing {
                    experiment: experiment.to_string(),
                    key: key.to_string(),
                    path: path.to_string(),
                }),
                Some(_) => None,
            }
        })
        .collect()
}

/// Validate one experiment file under the experiments root.
#[must_use]
pub fn validate_experiment(config: &CapsuleConfig, name: &str) -> ValidationOutcome {
    let path = config.experiments_dir().join(Path::new(name));
    let status = match load_document(&path) {
        Err(e) => ValidationStatus::Unreadable(e.to_string()),
        Ok(document) => {
            let problems: Vec<Error> = REFERENCE_KEYS
                .iter()
                .flat_map(|key| check_references(config, key, &document, name))
                .collect();
            if problems.is_empty() {
                ValidationStatus::Valid
            } else {
                ValidationStatus::Invalid(problems)
            }
        }
    };
    ValidationOutcome {
        name: name.to_string(),
        status,
    }
}

/// Validate every experiment of a batch.
#[must_use]
pub fn validate_experiments(config: &CapsuleConfig, selections: &[SelectionEntry]) -> ValidationReport {
    let outcomes: Vec<ValidationOutcome> = selections
        .iter()
        .map(|selection| validate_experiment(config, &selection.name))
        .collect();

    for outcome in &outcomes {
        match &outcome.status {
            ValidationStatus::Valid => {}
            ValidationStatus::Unreadable(reason) => {
                warn!(experiment = %outcome.name, %reason, "failed to read experiment");
            }
            ValidationStatus::Invalid(problems) => {
                for problem in problems {
                    warn!(experiment = %outcome.name, "{problem}");
                }
            }
        }
    }

    let report = ValidationReport { outcomes };
    if report.all_valid() {
        info!(count = report.outcomes.len(), "validation passed");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::write_document;
    use serde_json::json;

    fn workspace() -> (tempfile::TempDir, CapsuleConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = CapsuleConfig::with_root(dir.path());
        (dir, config)
    }

    #[test]
    fn test_missing_key_is_fine() {
        let (_dir, config) = workspace();
        assert!(check_references(&config, "workloads", &json!({}), "exp.json").is_empty());
    }

    #[test]
    fn test_missing_path_to_file_vs_missing_file() {
        let (dir, config) = workspace();
        std::fs::create_dir_all(dir.path().join("topologies")).unwrap();
        std::fs::write(dir.path().join("topologies/ok.json"), "{}").unwrap();

        let doc = json!({"topologies": [
            {"pathToFile": "topologies/ok.json"},
            {"type": "x"},
            {"pathToFile": "topologies/gone.json"}
        ]});
        let problems = check_references(&config, "topologies", &doc, "exp.json");

        assert_eq!(problems.len(), 2);
        assert!(matches!(&problems[0], Error::MissingPathToFile { key, .. } if key == "topologies"));
        assert!(
            matches!(&problems[1], Error::ReferencedFileMissing { path, .. } if path == "topologies/gone.json")
        );
    }

    #[test]
    fn test_batch_reports_every_experiment() {
        let (dir, config) = workspace();
        std::fs::create_dir_all(dir.path().join("workload_traces")).unwrap();
        std::fs::write(dir.path().join("workload_traces/w.csv"), "").unwrap();

        let experiments = config.experiments_dir();
        write_document(
            experiments.join("bad.json"),
            &json!({"workloads": [{"pathToFile": "workload_traces/missing.csv"}]}),
        )
        .unwrap();
        write_document(
            experiments.join("good.json"),
            &json!({"workloads": [{"pathToFile": "workload_traces/w.csv"}]}),
        )
        .unwrap();

        let selections = [
            SelectionEntry::named("bad.json"),
            SelectionEntry::named("good.json"),
            SelectionEntry::named("absent.json"),
        ];
        let report = validate_experiments(&config, &selections);

        assert_eq!(report.outcomes.len(), 3);
        assert!(!report.all_valid());
        assert!(matches!(report.outcomes[0].status, ValidationStatus::Invalid(ref p) if p.len() == 1));
        assert!(report.outcomes[1].is_valid());
        assert!(matches!(report.outcomes[2].status, ValidationStatus::Unreadable(_)));
        assert_eq!(report.failures().count(), 2);
    }

    #[test]
    fn test_empty_batch_is_valid() {
        let (_dir, config) = workspace();
        assert!(validate_experiments(&config, &[]).all_valid());
    }
}
