//! Per-variant merge, naming and persistence for topologies

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{error, info};

use super::params::{axis, PowerModelSpec, TopologyOptions, TopologyParams};
use crate::config::CapsuleConfig;
use crate::document::{load_document, objects_mut, set_nested, write_document, Document};
use crate::generation::{resolve_collisions, GenerationReport, WriteFailure};
use crate::naming::{topology_path, TopologyPathParts};
use crate::params::{cast_float, cast_int, Assignment};
use crate::Result;

const DEFAULT_EXPECTED_LIFETIME: i64 = 10;
const EMBODIED_CARBON_PER_CAPACITY: i64 = 100;
const BATTERY_POLICY_TYPE: &str = "runningMeanPlus";
const BATTERY_POLICY_WINDOW: i64 = 168;

/// One merged topology and the path it is written to, relative to the
/// topology root.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyVariant {
    /// Relative output path.
    pub path: String,
    /// Merged descriptor.
    pub document: Document,
}

/// Single-cluster, single-host topology used when no base file is given.
#[must_use]
pub fn default_topology() -> Document {
    json!({ "clusters": [new_cluster(16, 2100, 100_000, 1, 0)] })
}

fn new_cluster(core_count: i64, core_speed: i64, memory_size: i64, host_count: i64, index: usize) -> Value {
    json!({
        "name": format!("C{index}"),
        "hosts": [{
            "name": format!("H{index}"),
            "cpu": {
                "coreCount": core_count,
                "coreSpeed": core_speed
            },
            "memory": {
                "memorySize": memory_size
            },
            "count": host_count
        }]
    })
}

/// Battery block values for one variant.
#[derive(Debug, Clone, Copy)]
struct BatterySettings {
    capacity: i64,
    charging_speed: f64,
    expected_lifetime: i64,
    starting_threshold: f64,
}

/// Casted overrides for one variant; `None` leaves the base untouched.
#[derive(Debug, Clone, Default)]
struct Overrides<'a> {
    carbon: Option<&'a str>,
    host_count: Option<i64>,
    core_count: Option<i64>,
    core_speed: Option<i64>,
    memory_size: Option<i64>,
    battery: Option<BatterySettings>,
}

impl<'a> Overrides<'a> {
    fn resolve(assignment: &'a Assignment, include_battery: bool) -> Result<Self> {
        let int = |name: &'static str| assignment.get(name).map(|t| cast_int(name, t)).transpose();

        let battery = if include_battery {
            Self::resolve_battery(assignment)?
        } else {
            None
        };

        Ok(Self {
            carbon: assignment.get(axis::CARBON).filter(|c| !c.is_empty()),
            host_count: int(axis::HOST_COUNT)?,
            core_count: int(axis::CORE_COUNT)?,
            core_speed: int(axis::CORE_SPEED)?,
            memory_size: int(axis::MEMORY_SIZE)?,
            battery,
        })
    }

    /// Battery only applies with a capacity and a strictly positive threshold.
    #[allow(clippy::cast_precision_loss)]
    fn resolve_battery(assignment: &Assignment) -> Result<Option<BatterySettings>> {
        let (Some(capacity), Some(threshold)) = (
            assignment.get(axis::BATTERY_CAPACITY),
            assignment.get(axis::STARTING_THRESHOLD),
        ) else {
            return Ok(None);
        };

        let starting_threshold = cast_float(axis::STARTING_THRESHOLD, threshold)?;
        if starting_threshold <= 0.0 {
            return Ok(None);
        }
        let capacity = cast_int(axis::BATTERY_CAPACITY, capacity)?;
        let fraction = assignment
            .get(axis::CHARGING_SPEED)
            .map(|t| cast_float(axis::CHARGING_SPEED, t))
            .transpose()?;
        let expected_lifetime = assignment
            .get(axis::EXPECTED_LIFETIME)
            .map(|t| cast_int(axis::EXPECTED_LIFETIME, t))
            .transpose()?
            .unwrap_or(DEFAULT_EXPECTED_LIFETIME);

        Ok(Some(BatterySettings {
            capacity,
            charging_speed: fraction.map_or(0.0, |f| f * capacity as f64),
            expected_lifetime,
            starting_threshold,
        }))
    }
}

/// Whole numbers are stored as JSON integers.
#[allow(clippy::cast_possible_truncation)]
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn power_model_block(spec: &PowerModelSpec) -> Value {
    let mut block = Map::new();
    block.insert("modelType".into(), json!(spec.model_type));
    if let Some(power) = spec.power {
        block.insert("power".into(), json!(power));
    }
    if let Some(idle) = spec.idle_power {
        block.insert("idlePower".into(), json!(idle));
    }
    if let Some(max) = spec.max_power {
        block.insert("maxPower".into(), json!(max));
    }
    Value::Object(block)
}

fn apply_overrides(
    document: &mut Document,
    overrides: &Overrides<'_>,
    power_model: Option<&PowerModelSpec>,
    carbon_prefix: &str,
) {
    let Some(root) = document.as_object_mut() else {
        return;
    };

    for cluster in objects_mut(root, "clusters") {
        if let Some(carbon) = overrides.carbon {
            cluster.insert(
                "powerSource".into(),
                json!({ "carbonTracePath": format!("{carbon_prefix}/{carbon}") }),
            );
        }

        if let Some(battery) = overrides.battery {
            // A policy carried by the base battery wins over the default one
            let policy = cluster
                .get("battery")
                .and_then(|b| b.get("batteryPolicy"))
                .cloned()
                .unwrap_or_else(|| {
                    json!({
                        "type": BATTERY_POLICY_TYPE,
                        "startingThreshold": battery.starting_threshold,
                        "windowSize": BATTERY_POLICY_WINDOW
                    })
                });
            cluster.insert(
                "battery".into(),
                json!({
                    "capacity": battery.capacity,
                    "chargingSpeed": number(battery.charging_speed),
                    "embodiedCarbon": EMBODIED_CARBON_PER_CAPACITY * battery.capacity,
                    "expectedLifetime": battery.expected_lifetime,
                    "batteryPolicy": policy
                }),
            );
        }

        for host in objects_mut(cluster, "hosts") {
            if let Some(cores) = overrides.core_count {
                set_nested(host, "cpu", "coreCount", json!(cores));
            }
            if let Some(speed) = overrides.core_speed {
                set_nested(host, "cpu", "coreSpeed", json!(speed));
            }
            if let Some(memory) = overrides.memory_size {
                set_nested(host, "memory", "memorySize", json!(memory));
            }
            if let Some(count) = overrides.host_count {
                host.insert("count".into(), json!(count));
            }
            if let Some(spec) = power_model.filter(|p| !p.model_type.is_empty()) {
                host.insert("powerModel".into(), power_model_block(spec));
            }
        }
    }
}

/// Generates topology descriptors under the configured topology root.
#[derive(Debug, Clone, Copy)]
pub struct TopologyGenerator<'a> {
    config: &'a CapsuleConfig,
}

impl<'a> TopologyGenerator<'a> {
    /// Create a generator bound to a workspace layout.
    #[must_use]
    pub const fn new(config: &'a CapsuleConfig) -> Self {
        Self { config }
    }

    /// Merge one assignment into a copy of `base` and derive its path.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNumber` if a numeric axis token is malformed
    pub fn build_variant(
        &self,
        base: &Document,
        assignment: &Assignment,
        options: &TopologyOptions,
    ) -> Result<TopologyVariant> {
        let overrides = Overrides::resolve(assignment, options.include_battery)?;

        let mut document = base.clone();
        apply_overrides(
            &mut document,
            &overrides,
            options.power_model.as_ref(),
            &self.config.carbon_prefix(),
        );

        let path = topology_path(&TopologyPathParts {
            host_count: assignment.get(axis::HOST_COUNT),
            battery_capacity: assignment.get(axis::BATTERY_CAPACITY),
            charging_speed: assignment.get(axis::CHARGING_SPEED),
            battery_enabled: options.include_battery,
            carbon: overrides.carbon,
            core_count: assignment.get(axis::CORE_COUNT),
            core_speed: assignment.get(axis::CORE_SPEED),
            memory_size: assignment.get(axis::MEMORY_SIZE),
            name: options.name.as_deref(),
        });

        Ok(TopologyVariant { path, document })
    }

    /// Build every variant of one call in memory, without writing.
    ///
    /// Paths are checked for collisions under the configured policy:
    /// `Fail` rejects the whole call, `Overwrite` keeps the later variant.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNumber` for malformed tokens and
    /// `Error::NameCollision` under the `Fail` policy
    pub fn plan(
        &self,
        base: &Document,
        params: &TopologyParams,
        options: &TopologyOptions,
    ) -> Result<Vec<TopologyVariant>> {
        let variants = params
            .axes()
            .expand(options.mode)
            .iter()
            .map(|assignment| self.build_variant(base, assignment, options))
            .collect::<Result<Vec<_>>>()?;
        resolve_collisions(variants, self.config.collision_policy, |v| v.path.as_str())
    }

    /// Write one variant under the topology root.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be written
    pub fn save(&self, variant: &TopologyVariant) -> Result<PathBuf> {
        let full = self.config.topologies_dir().join(&variant.path);
        write_document(&full, &variant.document)?;
        info!(path = %variant.path, "Generated topology");
        Ok(full)
    }

    /// Load the base, expand, merge and write every variant.
    ///
    /// `template` is resolved against the topology root; `None` uses
    /// [`default_topology`]. A base that cannot be loaded is logged and
    /// yields an empty report. Write failures are recorded per file.
    ///
    /// # Errors
    ///
    /// Returns error for malformed numeric tokens or a name collision under
    /// the `Fail` policy; nothing is written in either case
    pub fn generate(
        &self,
        template: Option<&Path>,
        params: &TopologyParams,
        options: &TopologyOptions,
    ) -> Result<GenerationReport<String>> {
        let base = match template {
            Some(file) => match load_document(self.config.topologies_dir().join(file)) {
                Ok(doc) => doc,
                Err(e) => {
                    error!(error = %e, "failed to load base topology");
                    return Ok(GenerationReport::empty());
                }
            },
            None => default_topology(),
        };

        let variants = self.plan(&base, params, options)?;

        let mut report = GenerationReport::empty();
        for variant in variants {
            match self.save(&variant) {
                Ok(_) => report.written.push(variant.path),
                Err(e) => {
                    error!(path = %variant.path, error = %e, "failed to write topology");
                    report.failed.push(WriteFailure {
                        path: self.config.topologies_dir().join(&variant.path),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }
}
