//! # repro-capsule: Reproducibility Capsules for Datacenter Simulation
//!
//! Generates families of topology and experiment descriptors for an external
//! datacenter simulator from compact parameter specs, then validates, runs,
//! compares and packages them so a result set can be reproduced elsewhere.
//!
//! ## Pipeline
//!
//! ```text
//! "1-8:1 + 16"  ──parse──>  ["1", .., "8", "16"]  ──expand──>  assignments
//!        assignments  ──merge into base clone──>  variants  ──name──>  topologies/ experiments/
//!        experiments  ──validate / run / compare / collect / report / export──>  capsule.zip
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use repro_capsule::config::CapsuleConfig;
//! use repro_capsule::experiment::{ExperimentGenerator, ExperimentParams};
//! use repro_capsule::params::parse_input;
//! use repro_capsule::topology::{TopologyGenerator, TopologyOptions, TopologyParams};
//! use repro_capsule::validate::validate_experiments;
//!
//! let config = CapsuleConfig::default();
//!
//! let topologies = TopologyGenerator::new(&config).generate(
//!     None,
//!     &TopologyParams {
//!         core_counts: parse_input("8,16,32"),
//!         ..TopologyParams::default()
//!     },
//!     &TopologyOptions::default(),
//! )?;
//!
//! let experiments = ExperimentGenerator::new(&config).generate(
//!     None,
//!     &ExperimentParams {
//!         name: Some("cores".into()),
//!         topologies: Some(topologies.written),
//!         seeds: parse_input("1-3:1"),
//!         ..ExperimentParams::default()
//!     },
//! )?;
//!
//! assert!(validate_experiments(&config, &experiments.written).all_valid());
//! # Ok::<(), repro_capsule::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod archive;
pub mod collect;
pub mod compare;
pub mod config;
pub mod document;
pub mod error;
pub mod experiment;
pub mod generation;
pub mod naming;
pub mod params;
pub mod report;
pub mod runner;
pub mod topology;
pub mod validate;

pub use error::{Error, Result};
