//! Topology Generator
//!
//! Expands hardware, power, battery and carbon axes against a base topology
//! and writes one descriptor per variant under the topology root.
//!
//! ## Document shape
//!
//! ```text
//! { "clusters": [ { "name", "powerSource"?, "battery"?,
//!                   "hosts": [ { "name", "count", "cpu": {coreCount, coreSpeed},
//!                                "memory": {memorySize}, "powerModel"? } ] } ] }
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use repro_capsule::config::CapsuleConfig;
//! use repro_capsule::params::{parse_input, ExpansionMode};
//! use repro_capsule::topology::{TopologyGenerator, TopologyOptions, TopologyParams};
//!
//! let config = CapsuleConfig::default();
//! let params = TopologyParams {
//!     core_counts: parse_input("8,16"),
//!     carbon_traces: parse_input("NL.parquet,DE.parquet"),
//!     ..TopologyParams::default()
//! };
//! let options = TopologyOptions {
//!     mode: ExpansionMode::Cartesian,
//!     ..TopologyOptions::default()
//! };
//!
//! let report = TopologyGenerator::new(&config).generate(None, &params, &options)?;
//! assert_eq!(report.written.len(), 4);
//! # Ok::<(), repro_capsule::Error>(())
//! ```

mod generator;
mod params;

pub use generator::{default_topology, TopologyGenerator, TopologyVariant};
pub use params::{axis, PowerModelSpec, TopologyOptions, TopologyParams};
