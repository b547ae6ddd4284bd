//! Experiment overrides for one generation call

use serde::{Deserialize, Serialize};

use crate::params::Axes;

/// Seed axis name.
pub(crate) const SEED: &str = "seed";
/// Run-count axis name.
pub(crate) const RUN: &str = "run";
/// Export interval axis name.
pub(crate) const EXPORT_INTERVAL: &str = "export_interval";
/// Print frequency axis name.
pub(crate) const PRINT_FREQUENCY: &str = "print_frequency";

/// Overrides applied to a base experiment.
///
/// Reference lists replace the template's list wholesale when `Some`.
/// Numeric fields are text tokens, cast when the experiment is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentParams {
    /// Base experiment name; falls back to the template's `name`.
    pub name: Option<String>,
    /// Topology files, relative to the topology root.
    pub topologies: Option<Vec<String>>,
    /// Workload files, relative to the workload traces folder.
    pub workloads: Option<Vec<String>>,
    /// Failure trace files, relative to the failure traces folder.
    pub failures: Option<Vec<String>>,
    /// Prefab allocation policy names.
    pub policies: Vec<String>,
    /// Checkpoint interval (integer).
    pub checkpoint_interval: Option<String>,
    /// Checkpoint duration (integer).
    pub checkpoint_duration: Option<String>,
    /// Checkpoint interval scaling (float).
    pub checkpoint_scaling: Option<String>,
    /// Export intervals, one per iteration (integer).
    pub export_intervals: Vec<String>,
    /// Print frequencies, one per iteration (integer).
    pub print_frequencies: Vec<String>,
    /// Output files the simulator should export.
    pub files_to_export: Vec<String>,
    /// Initial seeds, one per iteration (integer).
    pub seeds: Vec<String>,
    /// Run counts, one per iteration (integer).
    pub runs: Vec<String>,
    /// Maximum failure counts (integer list, set wholesale).
    pub max_failures: Vec<String>,
    /// Simulator output folder.
    pub output_folder: Option<String>,
    /// One experiment per topology folder instead of one per call.
    pub group_by_topology_folder: bool,
}

impl ExperimentParams {
    /// The index-aligned per-iteration axes.
    #[must_use]
    pub fn iteration_axes(&self) -> Axes {
        Axes::new()
            .with(SEED, self.seeds.clone())
            .with(RUN, self.runs.clone())
            .with(EXPORT_INTERVAL, self.export_intervals.clone())
            .with(PRINT_FREQUENCY, self.print_frequencies.clone())
    }
}
