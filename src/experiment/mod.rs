//! Experiment Generator
//!
//! Overrides the reference lists, scheduling policies, checkpoint model,
//! failure limits and export model of a base experiment, then writes one
//! descriptor per index-aligned {seed, run, export interval, print
//! frequency} iteration.
//!
//! ## Outputs
//!
//! ```text
//! experiments/<name>[_s<seed>][_r<run>].json
//! experiments/<topology group>/<name>...json   (grouped generation)
//! ```
//!
//! Every written file yields a [`SelectionEntry`], the record the runner,
//! validator and file collector consume downstream.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use repro_capsule::config::CapsuleConfig;
//! use repro_capsule::experiment::{ExperimentGenerator, ExperimentParams};
//!
//! let config = CapsuleConfig::default();
//! let params = ExperimentParams {
//!     name: Some("baseline".into()),
//!     topologies: Some(vec!["borg/DE.json".into()]),
//!     workloads: Some(vec!["bitbrains.parquet".into()]),
//!     seeds: vec!["1".into(), "2".into()],
//!     ..ExperimentParams::default()
//! };
//!
//! let report = ExperimentGenerator::new(&config).generate(None, &params)?;
//! assert_eq!(report.written[0].name, "baseline_s1.json");
//! # Ok::<(), repro_capsule::Error>(())
//! ```

mod entry;
mod generator;
mod params;

pub use entry::{build_entry, EntryRecord, SelectionEntry, DEFAULT_FAILURE_TYPE, DEFAULT_WORKLOAD_TYPE};
pub use generator::{ExperimentGenerator, ExperimentVariant, DEFAULT_EXPERIMENT_NAME};
pub use params::ExperimentParams;
