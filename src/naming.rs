//! Deterministic output paths for generated descriptors

use std::path::Path;

/// Base filename used when a topology call does not name its output.
pub const DEFAULT_TOPOLOGY_NAME: &str = "topology.json";

/// Group key for topologies that sit directly under the topology root.
pub const UNGROUPED: &str = "Ungrouped";

/// The topology axis tokens that take part in naming.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologyPathParts<'a> {
    /// Host count token.
    pub host_count: Option<&'a str>,
    /// Battery capacity token; only used when `battery_enabled`.
    pub battery_capacity: Option<&'a str>,
    /// Charging speed token; only used when `battery_enabled`.
    pub charging_speed: Option<&'a str>,
    /// Whether battery blocks are being generated for this call.
    pub battery_enabled: bool,
    /// Carbon trace file name.
    pub carbon: Option<&'a str>,
    /// Core count token.
    pub core_count: Option<&'a str>,
    /// Core speed token.
    pub core_speed: Option<&'a str>,
    /// Memory size token.
    pub memory_size: Option<&'a str>,
    /// Base name (without `.json`); `topology` when absent.
    pub name: Option<&'a str>,
}

/// Relative path for one topology variant.
///
/// Folders: `hosts<N>`, `bat<capacity>_<chargingSpeed>`, `carbon-<trace stem>`
/// (each only when set). File: `core<>_speed<>_mem<>_<name>.json` using only
/// the set tokens, or just `<name>.json`.
#[must_use]
pub fn topology_path(parts: &TopologyPathParts<'_>) -> String {
    let mut segments: Vec<String> = Vec::new();

    if let Some(hosts) = parts.host_count {
        segments.push(format!("hosts{hosts}"));
    }
    if parts.battery_enabled {
        if let (Some(capacity), Some(speed)) = (parts.battery_capacity, parts.charging_speed) {
            segments.push(format!("bat{capacity}_{speed}"));
        }
    }
    if let Some(carbon) = parts.carbon.filter(|c| !c.is_empty()) {
        segments.push(format!("carbon-{}", file_stem(carbon)));
    }

    let base = parts
        .name
        .filter(|n| !n.is_empty())
        .map_or_else(|| DEFAULT_TOPOLOGY_NAME.to_string(), |n| format!("{n}.json"));

    let features: Vec<String> = [
        ("core", parts.core_count),
        ("speed", parts.core_speed),
        ("mem", parts.memory_size),
    ]
    .into_iter()
    .filter_map(|(tag, value)| value.map(|v| format!("{tag}{v}")))
    .collect();

    let file = if features.is_empty() {
        base
    } else {
        format!("{}_{base}", features.join("_"))
    };
    segments.push(file);
    segments.join("/")
}

/// Stem of a file name, keeping any leading directories out.
fn file_stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map_or_else(|| file.to_string(), |s| s.to_string_lossy().into_owned())
}

/// Experiment file name: `name` with `.json` appended unless already present.
#[must_use]
pub fn experiment_filename(name: &str) -> String {
    if name.ends_with(".json") {
        name.to_string()
    } else {
        format!("{name}.json")
    }
}

/// Experiment name with `_s<seed>` / `_r<run>` suffixes for the set values.
#[must_use]
pub fn experiment_name(base: &str, seed: Option<&str>, run: Option<&str>) -> String {
    let mut name = base.to_string();
    if let Some(seed) = seed {
        name.push_str("_s");
        name.push_str(seed);
    }
    if let Some(run) = run {
        name.push_str("_r");
        name.push_str(run);
    }
    name
}

/// Folder a topology reference belongs to, relative to the topology root.
///
/// `topologies/borg/800/DE.json` groups under `borg/800`; a file directly
/// under the root groups under [`UNGROUPED`].
#[must_use]
pub fn topology_group_prefix(path: &str, topologies_folder: &str) -> String {
    let path = path.replace('\\', "/");
    let prefix = format!("{}/", topologies_folder.trim_end_matches('/'));
    let path = path.strip_prefix(&prefix).unwrap_or(&path);
    match path.rsplit_once('/') {
        Some((dir, _)) if !dir.trim().is_empty() => dir.trim().to_string(),
        _ => UNGROUPED.to_string(),
    }
}

/// Lexically normalize a forward-slash path: drops `.` segments and empty
/// segments, resolves `..` against preceding segments.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if out.last().is_some_and(|s| *s != "..") {
                    out.pop();
                } else if !absolute {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    let joined = out.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_path_base_only() {
        assert_eq!(topology_path(&TopologyPathParts::default()), "topology.json");
        let named = TopologyPathParts {
            name: Some("borg"),
            ..Default::default()
        };
        assert_eq!(topology_path(&named), "borg.json");
    }

    #[test]
    fn test_topology_path_full() {
        let parts = TopologyPathParts {
            host_count: Some("4"),
            battery_capacity: Some("100"),
            charging_speed: Some("1"),
            battery_enabled: true,
            carbon: Some("NL_2021.parquet"),
            core_count: Some("8"),
            core_speed: None,
            memory_size: Some("2000"),
            name: None,
        };
        assert_eq!(
            topology_path(&parts),
            "hosts4/bat100_1/carbon-NL_2021/core8_mem2000_topology.json"
        );
    }

    #[test]
    fn test_battery_segment_needs_enabled_and_speed() {
        let disabled = TopologyPathParts {
            battery_capacity: Some("100"),
            charging_speed: Some("1"),
            ..Default::default()
        };
        assert_eq!(topology_path(&disabled), "topology.json");

        let no_speed = TopologyPathParts {
            battery_capacity: Some("100"),
            battery_enabled: true,
            ..Default::default()
        };
        assert_eq!(topology_path(&no_speed), "topology.json");
    }

    #[test]
    fn test_experiment_name_suffixes() {
        assert_eq!(experiment_name("exp", None, None), "exp");
        assert_eq!(experiment_name("exp", Some("3"), Some("5")), "exp_s3_r5");
        assert_eq!(experiment_name("exp", None, Some("5")), "exp_r5");
    }

    #[test]
    fn test_experiment_filename() {
        assert_eq!(experiment_filename("exp"), "exp.json");
        assert_eq!(experiment_filename("a/b.json"), "a/b.json");
    }

    #[test]
    fn test_topology_group_prefix() {
        assert_eq!(topology_group_prefix("topologies/borg/800/DE.json", "topologies"), "borg/800");
        assert_eq!(topology_group_prefix("borg\\800\\DE.json", "topologies"), "borg/800");
        assert_eq!(topology_group_prefix("DE.json", "topologies"), UNGROUPED);
        assert_eq!(topology_group_prefix("topologies/DE.json", "topologies"), UNGROUPED);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("topologies/./a//b.json"), "topologies/a/b.json");
        assert_eq!(normalize_path("topologies/../workload_traces/w.csv"), "workload_traces/w.csv");
        assert_eq!(normalize_path("a\\b"), "a/b");
        assert_eq!(normalize_path("../x"), "../x");
    }
}
