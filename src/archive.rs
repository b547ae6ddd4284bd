//! Capsule packaging as a zip archive
//!
//! Two layouts are supported:
//!
//! - **Capsule**: only what the selected experiments need (the collected
//!   file set), plus the README, the simulator runner and the output tree.
//!   Deflated.
//! - **Export all**: every workspace input and output folder as-is. Stored,
//!   for fast packaging of large trace sets.
//!
//! Entry names are workspace-relative with forward slashes, so the archive
//! unpacks into a layout the generators and the runner accept unchanged.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use repro_capsule::archive::create_capsule_archive;
//! use repro_capsule::config::CapsuleConfig;
//! use repro_capsule::experiment::SelectionEntry;
//!
//! let config = CapsuleConfig::default();
//! let selections = [SelectionEntry::named("baseline.json")];
//! let summary = create_capsule_archive(
//!     &config,
//!     &selections,
//!     Some(Path::new("README.md")),
//!     Path::new("reproducibility_capsule.zip"),
//! )?;
//! println!("{} entries", summary.entries.len());
//! # Ok::<(), repro_capsule::Error>(())
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::collect::collect_experiment_files;
use crate::config::CapsuleConfig;
use crate::experiment::SelectionEntry;
use crate::{Error, Result};

/// Default archive file name.
pub const DEFAULT_ARCHIVE_NAME: &str = "reproducibility_capsule.zip";

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Archive location.
    pub path: PathBuf,
    /// Entry names, sorted.
    pub entries: Vec<String>,
}

/// Archive entries keyed by entry name, pointing at their source file.
type Entries = BTreeMap<String, PathBuf>;

fn entry_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Add a workspace-relative file, or every file below a workspace-relative
/// directory. Missing roots are skipped.
fn add_root(entries: &mut Entries, config: &CapsuleConfig, rel: &Path) {
    let full = config.resolve(rel);
    if full.is_file() {
        entries.insert(entry_name(rel), full);
    } else if full.is_dir() {
        for entry in WalkDir::new(&full)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            if let Ok(inner) = entry.path().strip_prefix(&full) {
                entries.insert(entry_name(&rel.join(inner)), entry.path().to_path_buf());
            }
        }
    } else {
        debug!(path = %rel.display(), "not on disk, skipped");
    }
}

/// Top-level folder (or file) holding the runner, when it is inside the
/// workspace.
fn runner_root(config: &CapsuleConfig) -> Option<PathBuf> {
    match config.runner_path.components().next()? {
        Component::Normal(first) => Some(PathBuf::from(first)),
        _ => None,
    }
}

/// Add the README under its workspace-relative name, or its bare file name
/// when it lives outside the workspace.
fn add_readme(entries: &mut Entries, config: &CapsuleConfig, readme: &Path) {
    if !readme.is_file() {
        warn!(path = %readme.display(), "README not found, archive will not include it");
        return;
    }
    let name = readme
        .strip_prefix(&config.workspace_root)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| readme.file_name().map(PathBuf::from));
    if let Some(name) = name {
        entries.insert(entry_name(&name), readme.to_path_buf());
    }
}

/// Absolute location of `output` once its parent exists.
fn archive_target(output: &Path) -> Result<PathBuf> {
    let file_name = output
        .file_name()
        .ok_or_else(|| Error::Config(format!("archive path {} has no file name", output.display())))?;
    let parent = output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    Ok(parent.canonicalize()?.join(file_name))
}

fn write_archive(mut entries: Entries, output: &Path, method: CompressionMethod) -> Result<ArchiveSummary> {
    let target = archive_target(output)?;
    // A previous archive at the same location must not be packed into the new one
    entries.retain(|_, source| source.canonicalize().map_or(true, |p| p != target));

    let mut zip = ZipWriter::new(BufWriter::new(File::create(&target)?));
    let options = SimpleFileOptions::default().compression_method(method).large_file(true);
    for (name, source) in &entries {
        zip.start_file(name.as_str(), options)?;
        let mut input = File::open(source)?;
        std::io::copy(&mut input, &mut zip)?;
    }
    zip.finish()?;

    info!(path = %target.display(), entries = entries.len(), "archive written");
    Ok(ArchiveSummary {
        path: target,
        entries: entries.into_keys().collect(),
    })
}

/// Package the files `selections` need into a deflated capsule archive.
///
/// Contents: the collected file set, `readme` (when given and present),
/// the runner's top-level folder and the output tree. Collected files that
/// are not on disk are skipped.
///
/// # Errors
///
/// Returns error if the archive cannot be created or a source file cannot be
/// read
pub fn create_capsule_archive(
    config: &CapsuleConfig,
    selections: &[SelectionEntry],
    readme: Option<&Path>,
    output: &Path,
) -> Result<ArchiveSummary> {
    let mut entries = Entries::new();
    for file in collect_experiment_files(config, selections) {
        let rel = PathBuf::from(&file);
        if !config.resolve(&rel).exists() {
            warn!(path = %file, "referenced file missing, left out of the archive");
            continue;
        }
        add_root(&mut entries, config, &rel);
    }
    if let Some(readme) = readme {
        add_readme(&mut entries, config, readme);
    }
    if let Some(runner) = runner_root(config) {
        add_root(&mut entries, config, &runner);
    }
    add_root(&mut entries, config, &config.output_root);

    write_archive(entries, output, CompressionMethod::Deflated)
}

/// Package every workspace folder (experiments, topologies, all trace
/// folders, outputs, runner) and the README without compression.
///
/// # Errors
///
/// Returns error if the archive cannot be created or a source file cannot be
/// read
pub fn export_all(config: &CapsuleConfig, readme: Option<&Path>, output: &Path) -> Result<ArchiveSummary> {
    let mut entries = Entries::new();
    let roots = [
        &config.experiments_root,
        &config.topologies_root,
        &config.workload_traces_folder,
        &config.failure_traces_folder,
        &config.carbon_traces_folder,
        &config.output_root,
    ];
    for root in roots {
        add_root(&mut entries, config, root);
    }
    if let Some(runner) = runner_root(config) {
        add_root(&mut entries, config, &runner);
    }
    if let Some(readme) = readme {
        add_readme(&mut entries, config, readme);
    }

    write_archive(entries, output, CompressionMethod::Stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::write_document;
    use serde_json::json;
    use std::io::Read;
    use zip::ZipArchive;

    fn touch(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// Workspace with one experiment referencing one topology and one trace.
    fn workspace(root: &Path) -> CapsuleConfig {
        let config = CapsuleConfig::with_root(root);
        write_document(
            root.join("experiments/exp.json"),
            &json!({
                "topologies": [{"pathToFile": "topologies/t.json"}],
                "workloads": [{"pathToFile": "workload_traces/w.parquet"}],
                "failureModels": [{"pathToFile": "failure_traces/gone.parquet"}]
            }),
        )
        .unwrap();
        write_document(root.join("experiments/other.json"), &json!({})).unwrap();
        write_document(root.join("topologies/t.json"), &json!({"clusters": []})).unwrap();
        touch(&root.join("topologies/unused.json"), "{}");
        touch(&root.join("workload_traces/w.parquet"), "trace");
        touch(&root.join("OpenDCExperimentRunner/bin/OpenDCExperimentRunner"), "#!/bin/sh\n");
        touch(&root.join("output/exp/raw-output/0/host.parquet"), "rows");
        touch(&root.join("README.md"), "# Reproducibility Capsule\n");
        config
    }

    fn read_back(path: &Path) -> ZipArchive<File> {
        ZipArchive::new(File::open(path).unwrap()).unwrap()
    }

    fn names(archive: &ZipArchive<File>) -> Vec<String> {
        let mut names: Vec<String> = archive.file_names().map(ToString::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn test_capsule_archive_holds_only_needed_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());
        let output = dir.path().join("dist/capsule.zip");

        let summary = create_capsule_archive(
            &config,
            &[SelectionEntry::named("exp.json")],
            Some(&dir.path().join("README.md")),
            &output,
        )
        .unwrap();

        let expected = [
            "OpenDCExperimentRunner/bin/OpenDCExperimentRunner",
            "README.md",
            "experiments/exp.json",
            "output/exp/raw-output/0/host.parquet",
            "topologies/t.json",
            "workload_traces/w.parquet",
        ];
        assert_eq!(summary.entries, expected);

        let mut archive = read_back(&output);
        assert_eq!(names(&archive), expected);

        let mut trace = archive.by_name("workload_traces/w.parquet").unwrap();
        assert_eq!(trace.compression(), CompressionMethod::Deflated);
        let mut content = String::new();
        trace.read_to_string(&mut content).unwrap();
        assert_eq!(content, "trace");
    }

    #[test]
    fn test_export_all_is_stored_and_complete() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());
        let output = dir.path().join("all.zip");

        let summary = export_all(&config, Some(&dir.path().join("README.md")), &output).unwrap();
        assert!(summary.entries.contains(&"experiments/other.json".to_string()));
        assert!(summary.entries.contains(&"topologies/unused.json".to_string()));
        assert!(summary.entries.contains(&"README.md".to_string()));

        let mut archive = read_back(&output);
        assert_eq!(names(&archive).len(), summary.entries.len());
        assert_eq!(
            archive.by_name("topologies/t.json").unwrap().compression(),
            CompressionMethod::Stored
        );
    }

    #[test]
    fn test_archive_inside_packed_folder_is_not_repacked() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());
        let output = dir.path().join("output/capsule.zip");
        let selections = [SelectionEntry::named("exp.json")];

        create_capsule_archive(&config, &selections, None, &output).unwrap();
        let summary = create_capsule_archive(&config, &selections, None, &output).unwrap();

        assert!(!summary.entries.iter().any(|e| e.ends_with("capsule.zip")));
        assert!(!summary.entries.contains(&"README.md".to_string()));
        assert_eq!(names(&read_back(&output)), summary.entries);
    }

    #[test]
    fn test_readme_outside_workspace_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let config = CapsuleConfig::with_root(dir.path());
        let readme = elsewhere.path().join("NOTES.md");
        touch(&readme, "notes");

        let summary = export_all(&config, Some(&readme), &dir.path().join("a.zip")).unwrap();
        assert_eq!(summary.entries, ["NOTES.md"]);
    }

    #[test]
    fn test_runner_root_is_first_component() {
        let config = CapsuleConfig::default();
        assert_eq!(runner_root(&config), Some(PathBuf::from("OpenDCExperimentRunner")));

        let absolute = CapsuleConfig {
            runner_path: PathBuf::from("/opt/runner/bin/run"),
            ..CapsuleConfig::default()
        };
        assert_eq!(runner_root(&absolute), None);
    }

    #[test]
    fn test_archive_path_without_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = CapsuleConfig::with_root(dir.path());
        let err = export_all(&config, None, Path::new("/")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
