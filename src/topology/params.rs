//! Topology axes and per-call options

use serde::{Deserialize, Serialize};

use crate::params::{Axes, ExpansionMode};

/// Axis names, in cartesian iteration order.
pub mod axis {
    /// Carbon trace file under the carbon traces folder.
    pub const CARBON: &str = "carbon";
    /// Number of hosts per host entry.
    pub const HOST_COUNT: &str = "host_count";
    /// Battery capacity.
    pub const BATTERY_CAPACITY: &str = "battery_capacity";
    /// Carbon-intensity threshold the battery policy starts at.
    pub const STARTING_THRESHOLD: &str = "starting_threshold";
    /// Charging speed as a fraction of capacity.
    pub const CHARGING_SPEED: &str = "charging_speed";
    /// Expected battery lifetime.
    pub const EXPECTED_LIFETIME: &str = "expected_lifetime";
    /// CPU cores per host.
    pub const CORE_COUNT: &str = "core_count";
    /// CPU core speed.
    pub const CORE_SPEED: &str = "core_speed";
    /// Host memory size.
    pub const MEMORY_SIZE: &str = "memory_size";
}

/// Axis values for one topology call, as expanded text tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyParams {
    /// Core counts (integer).
    pub core_counts: Vec<String>,
    /// Core speeds (integer).
    pub core_speeds: Vec<String>,
    /// Memory sizes (integer).
    pub memory_sizes: Vec<String>,
    /// Host counts (integer).
    pub host_counts: Vec<String>,
    /// Carbon trace file names.
    pub carbon_traces: Vec<String>,
    /// Battery capacities (integer).
    pub battery_capacities: Vec<String>,
    /// Starting carbon-intensity thresholds (float).
    pub starting_thresholds: Vec<String>,
    /// Charging speeds as fraction of capacity (float).
    pub charging_speeds: Vec<String>,
    /// Expected battery lifetimes (integer).
    pub expected_lifetimes: Vec<String>,
}

impl TopologyParams {
    /// Named axes in cartesian iteration order.
    #[must_use]
    pub fn axes(&self) -> Axes {
        Axes::new()
            .with(axis::CARBON, self.carbon_traces.clone())
            .with(axis::HOST_COUNT, self.host_counts.clone())
            .with(axis::BATTERY_CAPACITY, self.battery_capacities.clone())
            .with(axis::STARTING_THRESHOLD, self.starting_thresholds.clone())
            .with(axis::CHARGING_SPEED, self.charging_speeds.clone())
            .with(axis::EXPECTED_LIFETIME, self.expected_lifetimes.clone())
            .with(axis::CORE_COUNT, self.core_counts.clone())
            .with(axis::CORE_SPEED, self.core_speeds.clone())
            .with(axis::MEMORY_SIZE, self.memory_sizes.clone())
    }
}

/// Power model attached to every host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerModelSpec {
    /// Model type, e.g. `linear` or `sqrt`.
    pub model_type: String,
    /// Idle power draw.
    pub idle_power: Option<f64>,
    /// Peak power draw.
    pub max_power: Option<f64>,
    /// Constant power draw.
    pub power: Option<f64>,
}

/// Per-call switches that do not vary across variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyOptions {
    /// Output base name without `.json`.
    pub name: Option<String>,
    /// Attach battery blocks when capacity and threshold are set.
    pub include_battery: bool,
    /// Attach this power model to every host.
    pub power_model: Option<PowerModelSpec>,
    /// Index-aligned or cartesian expansion.
    pub mode: ExpansionMode,
}
