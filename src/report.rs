//! Capsule README generation
//!
//! Summarizes the queued experiments (reference lists, execution times) and
//! the machine they ran on, as Markdown.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::System;
use tracing::info;

use crate::config::CapsuleConfig;
use crate::document::{load_document, Document};
use crate::experiment::SelectionEntry;
use crate::runner::RunTiming;
use crate::Result;

/// Simulator release the capsule targets.
pub const SIMULATOR_VERSION: &str = "2.4e";

/// Host the experiments were executed on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// CPU architecture.
    pub machine: String,
    /// CPU brand string.
    pub processor: Option<String>,
    /// Physical cores.
    pub cores: Option<usize>,
    /// Logical CPUs.
    pub threads: Option<usize>,
    /// Total memory in GiB, two decimals.
    pub memory_gb: Option<f64>,
    /// Host name.
    pub hostname: Option<String>,
    /// Operating system name and version.
    pub platform: String,
}

impl SystemInfo {
    /// Describe the current host.
    #[must_use]
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let processor = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty());
        let platform = System::long_os_version()
            .unwrap_or_else(|| format!("{}-{}", std::env::consts::FAMILY, std::env::consts::OS));

        Self {
            machine: std::env::consts::ARCH.to_string(),
            processor,
            cores: Some(num_cpus::get_physical()),
            threads: Some(num_cpus::get()),
            memory_gb: memory_gb(sys.total_memory()),
            hostname: System::host_name().filter(|h| !h.is_empty()),
            platform,
        }
    }
}

/// Bytes to GiB, rounded to two decimals; zero means the size is unknown.
#[allow(clippy::cast_precision_loss)]
fn memory_gb(bytes: u64) -> Option<f64> {
    if bytes == 0 {
        return None;
    }
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    Some((gb * 100.0).round() / 100.0)
}

/// Timings and host description for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Per-experiment execution times.
    pub experiments: Vec<RunTiming>,
    /// Host the batch ran on.
    pub system_info: SystemInfo,
}

/// Capsule provenance header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapsuleMetadata {
    /// Date the capsule was generated.
    pub created_on: NaiveDate,
    /// Targeted simulator release.
    pub simulator_version: String,
    /// Version of this tool.
    pub tool_version: String,
}

impl CapsuleMetadata {
    /// Metadata stamped with today's local date.
    #[must_use]
    pub fn now() -> Self {
        Self {
            created_on: Local::now().date_naive(),
            simulator_version: SIMULATOR_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn paths_of(document: &Document, key: &str) -> Vec<String> {
    document
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|e| e.get("pathToFile").and_then(Value::as_str))
        .map(ToString::to_string)
        .collect()
}

fn push_file_list(lines: &mut Vec<String>, plural: &str, label: &str, files: &[String]) {
    if files.is_empty() {
        return;
    }
    lines.push(format!("- **{plural}**: {} files", files.len()));
    lines.push(format!("<details><summary>Show {label} List</summary>\n"));
    lines.extend(files.iter().cloned());
    lines.push("</details>\n".to_string());
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// Render the capsule README.
///
/// Experiments whose file cannot be read still get their heading.
#[must_use]
pub fn render_readme(
    config: &CapsuleConfig,
    selections: &[SelectionEntry],
    stats: &RunStats,
    metadata: &CapsuleMetadata,
) -> String {
    let mut lines: Vec<String> = vec![
        "# Reproducibility Capsule\n".into(),
        "This capsule contains all artifacts needed to reproduce the experiments listed below using OpenDC.\n".into(),
        "## Experiments Overview\n".into(),
        "## Capsule Metadata".into(),
        format!("- **Created on**: {}", metadata.created_on.format("%Y-%m-%d")),
        format!("- **OpenDC Version**: {}", metadata.simulator_version),
        format!("- **Capsule Tool Version**: {}\n", metadata.tool_version),
    ];

    for (i, selection) in selections.iter().enumerate() {
        lines.push(format!("### Experiment {}: `{}`", i + 1, selection.name));
        if let Ok(document) = load_document(config.experiments_dir().join(&selection.name)) {
            push_file_list(&mut lines, "Topologies", "Topology", &paths_of(&document, "topologies"));
            push_file_list(&mut lines, "Workloads", "Workload", &paths_of(&document, "workloads"));
            push_file_list(&mut lines, "Failures", "Failure", &paths_of(&document, "failureModels"));
        }
        lines.push(String::new());
    }

    lines.push("## Execution Time per Experiment\n".into());
    lines.push("| Experiment | Duration (seconds) |".into());
    lines.push("|------------|--------------------|".into());
    lines.extend(
        stats
            .experiments
            .iter()
            .map(|timing| format!("| {} | {} |", timing.name, or_na(timing.duration_sec))),
    );

    let sys = &stats.system_info;
    lines.extend([
        String::new(),
        "Experiments were executed on the following system, we recommend to have at least these specifications when rerunning the experiments\n".into(),
        "## System Information\n".into(),
        format!("- **Machine**: {}", sys.machine),
        format!("- **Processor**: {}", or_na(sys.processor.as_deref())),
        format!("- **Cores**: {}", or_na(sys.cores)),
        format!("- **Threads**: {}", or_na(sys.threads)),
        format!("- **Memory**: {} GB", or_na(sys.memory_gb)),
        format!("- **Host**: {}", or_na(sys.hostname.as_deref())),
        format!("- **Platform**: {}\n", sys.platform),
        "## How to Run".into(),
        "1. Make sure Java 21 is installed for the OpenDC runner.".into(),
        "2. Run `capsule run` from the capsule root to execute every listed experiment.".into(),
        "3. Outputs will appear in the `output/` directory.".into(),
        "4. Run `capsule compare` to check reproduced outputs against the originals.".into(),
        "5. Run `capsule export` to package the capsule as a zip archive.".into(),
    ]);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Render the README and write it to `output_path`.
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn generate_readme<P: AsRef<Path>>(
    config: &CapsuleConfig,
    selections: &[SelectionEntry],
    stats: &RunStats,
    output_path: P,
) -> Result<PathBuf> {
    let text = render_readme(config, selections, stats, &CapsuleMetadata::now());
    let path = output_path.as_ref().to_path_buf();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, text)?;
    info!(path = %path.display(), "README generated");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::write_document;
    use serde_json::json;

    fn metadata() -> CapsuleMetadata {
        CapsuleMetadata {
            created_on: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            simulator_version: SIMULATOR_VERSION.into(),
            tool_version: "0.1.0".into(),
        }
    }

    #[test]
    fn test_render_lists_references_and_timings() {
        let dir = tempfile::tempdir().unwrap();
        let config = CapsuleConfig::with_root(dir.path());
        write_document(
            config.experiments_dir().join("exp.json"),
            &json!({
                "topologies": [{"pathToFile": "topologies/a.json"}, {"pathToFile": "topologies/b.json"}],
                "workloads": [{"pathToFile": "workload_traces/w.parquet"}]
            }),
        )
        .unwrap();

        let stats = RunStats {
            experiments: vec![RunTiming {
                name: "exp.json".into(),
                duration_sec: Some(12.5),
            }],
            system_info: SystemInfo {
                machine: "x86_64".into(),
                cores: Some(4),
                threads: Some(8),
                platform: "unix-linux".into(),
                ..SystemInfo::default()
            },
        };
        let selections = [SelectionEntry::named("exp.json"), SelectionEntry::named("gone.json")];
        let text = render_readme(&config, &selections, &stats, &metadata());

        assert!(text.contains("- **Created on**: 2025-03-01"));
        assert!(text.contains("### Experiment 1: `exp.json`"));
        assert!(text.contains("- **Topologies**: 2 files"));
        assert!(text.contains("workload_traces/w.parquet"));
        assert!(!text.contains("Failure List"));
        assert!(text.contains("### Experiment 2: `gone.json`"));
        assert!(text.contains("| exp.json | 12.5 |"));
        assert!(text.contains("- **Cores**: 4"));
        assert!(text.contains("- **Threads**: 8"));
        assert!(text.contains("- **Processor**: N/A"));
        assert!(text.contains("- **Memory**: N/A GB"));
    }

    #[test]
    fn test_generate_readme_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CapsuleConfig::with_root(dir.path());
        let path = generate_readme(&config, &[], &RunStats::default(), dir.path().join("README.md")).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("# Reproducibility Capsule"));
    }

    #[test]
    fn test_system_info_collect() {
        let info = SystemInfo::collect();
        assert!(!info.machine.is_empty());
        assert!(info.threads.unwrap_or(1) >= 1);
        assert!(info.cores.unwrap_or(1) <= info.threads.unwrap_or(usize::MAX));
        assert!(info.memory_gb.map_or(true, |gb| gb > 0.0));
    }

    #[test]
    fn test_memory_gb_rounds_and_zero_is_unknown() {
        assert_eq!(memory_gb(0), None);
        assert_eq!(memory_gb(8 * 1024 * 1024 * 1024), Some(8.0));
        assert_eq!(memory_gb(1_610_612_736), Some(1.5));
    }

    #[test]
    fn test_render_section_layout() {
        let config = CapsuleConfig::default();
        let text = render_readme(&config, &[], &RunStats::default(), &metadata());
        let lines: Vec<&str> = text.lines().collect();
        let header = lines.iter().position(|l| *l == "| Experiment | Duration (seconds) |").unwrap();
        assert_eq!(lines[header - 2], "## Execution Time per Experiment");
        assert!(lines.contains(&"## Capsule Metadata"));
        assert!(text.ends_with("archive.\n"));
    }
}
