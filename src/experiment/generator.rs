//! Experiment expansion, grouping and persistence

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{error, info};

use super::entry::{build_entry, SelectionEntry, DEFAULT_FAILURE_TYPE, DEFAULT_WORKLOAD_TYPE};
use super::params::{ExperimentParams, EXPORT_INTERVAL, PRINT_FREQUENCY, RUN, SEED};
use crate::config::{folder_prefix, CapsuleConfig};
use crate::document::{load_document, write_document, Document};
use crate::generation::{resolve_collisions, GenerationReport, WriteFailure};
use crate::naming::{experiment_filename, experiment_name, topology_group_prefix};
use crate::params::{cast_float, cast_int};
use crate::{Error, Result};

/// Name used when neither the caller nor the template names the experiment.
pub const DEFAULT_EXPERIMENT_NAME: &str = "custom_experiment";

/// One built experiment before it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentVariant {
    /// File name relative to the experiments root (may contain `/`).
    pub filename: String,
    /// Merged descriptor.
    pub document: Document,
    /// Manifest record handed downstream once written.
    pub selection: SelectionEntry,
}

/// Generates experiment descriptors under the configured experiments root.
#[derive(Debug, Clone, Copy)]
pub struct ExperimentGenerator<'a> {
    config: &'a CapsuleConfig,
}

impl<'a> ExperimentGenerator<'a> {
    /// Create a generator bound to a workspace layout.
    #[must_use]
    pub const fn new(config: &'a CapsuleConfig) -> Self {
        Self { config }
    }

    /// Load a base experiment; `None` gives an empty document.
    ///
    /// `template` is resolved against the experiments root.
    ///
    /// # Errors
    ///
    /// Returns `Error::TemplateLoad` if the file is unreadable, malformed,
    /// or not a JSON object
    pub fn load_template(&self, template: Option<&Path>) -> Result<Document> {
        let Some(file) = template else {
            return Ok(Value::Object(Map::new()));
        };
        let path = self.config.experiments_dir().join(file);
        let doc = load_document(&path)?;
        if doc.is_object() {
            Ok(doc)
        } else {
            Err(Error::TemplateLoad {
                path,
                reason: "experiment template is not a JSON object".into(),
            })
        }
    }

    /// Build every experiment of one call in memory.
    ///
    /// With `group_by_topology_folder`, topologies are grouped by their
    /// folder and each group becomes its own pass named `<group>/<name>`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNumber` if a numeric token is malformed
    pub fn build(&self, base: &Document, params: &ExperimentParams) -> Result<Vec<ExperimentVariant>> {
        let base_name = params
            .name
            .clone()
            .or_else(|| base.get("name").and_then(Value::as_str).map(ToString::to_string))
            .unwrap_or_else(|| DEFAULT_EXPERIMENT_NAME.to_string());

        match params.topologies.as_deref() {
            Some(topologies) if params.group_by_topology_folder && !topologies.is_empty() => {
                let mut variants = Vec::new();
                for (group, files) in self.group_topologies(topologies) {
                    let name = format!("{group}/{base_name}");
                    variants.extend(self.build_pass(&name, base, Some(&files), params)?);
                }
                Ok(variants)
            }
            topologies => self.build_pass(&base_name, base, topologies, params),
        }
    }

    /// Build every experiment and check file names under the configured
    /// collision policy.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNumber` for malformed tokens and
    /// `Error::NameCollision` under the `Fail` policy
    pub fn plan(&self, base: &Document, params: &ExperimentParams) -> Result<Vec<ExperimentVariant>> {
        let variants = self.build(base, params)?;
        resolve_collisions(variants, self.config.collision_policy, |v| v.filename.as_str())
    }

    /// Topology files grouped by folder, in first-seen order.
    fn group_topologies(&self, topologies: &[String]) -> Vec<(String, Vec<String>)> {
        let folder = folder_prefix(&self.config.topologies_root);
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for topology in topologies {
            let key = topology_group_prefix(topology, &folder);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, files)) => files.push(topology.clone()),
                None => groups.push((key, vec![topology.clone()])),
            }
        }
        groups
    }

    /// One flat pass: reference overrides, then one experiment per iteration.
    fn build_pass(
        &self,
        name: &str,
        base: &Document,
        topologies: Option<&[String]>,
        params: &ExperimentParams,
    ) -> Result<Vec<ExperimentVariant>> {
        let mut template = base.clone();
        if !template.is_object() {
            template = Value::Object(Map::new());
        }
        if let Some(root) = template.as_object_mut() {
            self.override_references(root, topologies, params);
        }

        let policies = prefab_policies(&params.policies);
        let checkpoint = checkpoint_model(params)?;
        let max_failures = params
            .max_failures
            .iter()
            .map(|t| cast_int("max_failures", t).map(Value::from))
            .collect::<Result<Vec<Value>>>()?;

        let mut variants = Vec::new();
        for assignment in params.iteration_axes().index_aligned() {
            let mut experiment = template.clone();
            let Some(doc) = experiment.as_object_mut() else {
                continue;
            };

            let seed = assignment.get(SEED);
            let run = assignment.get(RUN);
            let full_name = experiment_name(name, seed, run);

            if let Some(seed) = seed {
                doc.insert("initialSeed".into(), json!(cast_int("seed", seed)?));
            }
            if let Some(run) = run {
                doc.insert("runs".into(), json!(cast_int("runs", run)?));
            }
            doc.insert("name".into(), json!(full_name));

            if !policies.is_empty() {
                doc.insert("allocationPolicies".into(), Value::Array(policies.clone()));
            }
            if let Some(model) = &checkpoint {
                doc.insert("checkpointModels".into(), json!([model]));
            }
            if !max_failures.is_empty() {
                doc.insert("maxNumFailures".into(), Value::Array(max_failures.clone()));
            }

            let interval = assignment
                .get(EXPORT_INTERVAL)
                .map(|t| cast_int("export_interval", t))
                .transpose()?;
            let frequency = assignment
                .get(PRINT_FREQUENCY)
                .map(|t| cast_int("print_frequency", t))
                .transpose()?;
            apply_export_model(doc, interval, frequency, &params.files_to_export);

            if let Some(folder) = &params.output_folder {
                doc.insert("outputFolder".into(), json!(folder));
            }

            let filename = experiment_filename(&full_name);
            variants.push(ExperimentVariant {
                selection: SelectionEntry {
                    name: filename.clone(),
                    topology: topologies.map(<[String]>::to_vec),
                    workload: params.workloads.clone(),
                    failures: params.failures.clone(),
                },
                filename,
                document: experiment,
            });
        }
        Ok(variants)
    }

    fn override_references(
        &self,
        root: &mut Map<String, Value>,
        topologies: Option<&[String]>,
        params: &ExperimentParams,
    ) {
        let lists = [
            ("topologies", &self.config.topologies_root, topologies, None),
            (
                "workloads",
                &self.config.workload_traces_folder,
                params.workloads.as_deref(),
                Some(DEFAULT_WORKLOAD_TYPE),
            ),
            (
                "failureModels",
                &self.config.failure_traces_folder,
                params.failures.as_deref(),
                Some(DEFAULT_FAILURE_TYPE),
            ),
        ];

        for (key, folder, files, default_type) in lists {
            let Some(files) = files else { continue };
            let folder = folder_prefix(folder);
            let originals: Vec<Value> = root
                .get(key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let entries: Vec<Value> = files
                .iter()
                .enumerate()
                .map(|(i, file)| build_entry(&folder, file, originals.get(i), default_type))
                .map(|entry| json!(entry))
                .collect();
            root.insert(key.into(), Value::Array(entries));
        }
    }

    /// Write one experiment under the experiments root.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be written
    pub fn save(&self, variant: &ExperimentVariant) -> Result<PathBuf> {
        let full = self.config.experiments_dir().join(&variant.filename);
        write_document(&full, &variant.document)?;
        info!(name = %variant.filename, "Generated experiment");
        Ok(full)
    }

    /// Load the template, build and write every experiment.
    ///
    /// A template that cannot be loaded is logged and yields an empty
    /// report. Write failures are recorded per file and leave the other
    /// experiments untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNumber` if a numeric token is malformed and
    /// `Error::NameCollision` if two experiments share a file name under the
    /// `Fail` policy; nothing is written in either case
    pub fn generate(
        &self,
        template: Option<&Path>,
        params: &ExperimentParams,
    ) -> Result<GenerationReport<SelectionEntry>> {
        let base = match self.load_template(template) {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = %e, "failed to load base experiment");
                return Ok(GenerationReport::empty());
            }
        };

        let variants = self.plan(&base, params)?;

        let mut report = GenerationReport::empty();
        for variant in variants {
            match self.save(&variant) {
                Ok(_) => report.written.push(variant.selection),
                Err(e) => {
                    error!(name = %variant.filename, error = %e, "failed to write experiment");
                    report.failed.push(WriteFailure {
                        path: self.config.experiments_dir().join(&variant.filename),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }
}

fn prefab_policies(names: &[String]) -> Vec<Value> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(|n| json!({ "type": "prefab", "policyName": n }))
        .collect()
}

/// Checkpoint model, only when interval, duration and scaling are all set.
fn checkpoint_model(params: &ExperimentParams) -> Result<Option<Value>> {
    let (Some(interval), Some(duration), Some(scaling)) = (
        params.checkpoint_interval.as_deref(),
        params.checkpoint_duration.as_deref(),
        params.checkpoint_scaling.as_deref(),
    ) else {
        return Ok(None);
    };
    Ok(Some(json!({
        "checkpointInterval": cast_int("checkpoint_interval", interval)?,
        "checkpointDuration": cast_int("checkpoint_duration", duration)?,
        "checkpointIntervalScaling": cast_float("checkpoint_scaling", scaling)?
    })))
}

/// Overlay onto the template's first export model, or synthesize one from
/// whatever is set; nothing set and no template model means no key.
fn apply_export_model(
    doc: &mut Map<String, Value>,
    interval: Option<i64>,
    frequency: Option<i64>,
    files_to_export: &[String],
) {
    let mut fields = Map::new();
    if let Some(interval) = interval {
        fields.insert("exportInterval".into(), json!(interval));
    }
    if let Some(frequency) = frequency {
        fields.insert("printFrequency".into(), json!(frequency));
    }
    if !files_to_export.is_empty() {
        fields.insert("filesToExport".into(), json!(files_to_export));
    }

    let existing = doc
        .get_mut("exportModels")
        .and_then(Value::as_array_mut)
        .filter(|models| !models.is_empty())
        .and_then(|models| models.first_mut())
        .and_then(Value::as_object_mut);

    match existing {
        Some(first) => first.extend(fields),
        None if !fields.is_empty() => {
            doc.insert("exportModels".into(), json!([Value::Object(fields)]));
        }
        None => {}
    }
}
