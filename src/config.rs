//! Capsule configuration
//!
//! All folder conventions the generators and collaborators rely on live in
//! one explicit struct that is passed by reference into each call.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What to do when two variants of one topology call derive the same path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Abort the call before anything is written.
    #[default]
    Fail,
    /// Last write wins; each collision is logged.
    Overwrite,
}

/// Root folders and tooling locations for one capsule workspace.
///
/// Folder fields are relative to `workspace_root`. Descriptor documents
/// reference inputs with workspace-relative paths (`topologies/a.json`), so
/// the folder names double as the path prefix written into `pathToFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleConfig {
    /// Directory every relative path is resolved against.
    pub workspace_root: PathBuf,
    /// Generated topology descriptors.
    pub topologies_root: PathBuf,
    /// Generated experiment descriptors.
    pub experiments_root: PathBuf,
    /// Workload trace inputs.
    pub workload_traces_folder: PathBuf,
    /// Failure trace inputs.
    pub failure_traces_folder: PathBuf,
    /// Carbon-intensity trace inputs.
    pub carbon_traces_folder: PathBuf,
    /// Simulator output datasets.
    pub output_root: PathBuf,
    /// External simulator runner executable.
    pub runner_path: PathBuf,
    /// Name-collision handling for topology and experiment generation.
    pub collision_policy: CollisionPolicy,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            topologies_root: PathBuf::from("topologies"),
            experiments_root: PathBuf::from("experiments"),
            workload_traces_folder: PathBuf::from("workload_traces"),
            failure_traces_folder: PathBuf::from("failure_traces"),
            carbon_traces_folder: PathBuf::from("carbon_traces"),
            output_root: PathBuf::from("output"),
            runner_path: PathBuf::from("OpenDCExperimentRunner/bin/OpenDCExperimentRunner"),
            collision_policy: CollisionPolicy::Fail,
        }
    }
}

impl CapsuleConfig {
    /// Default layout rooted at `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: root.into(),
            ..Self::default()
        }
    }

    /// Load a config from a JSON file; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid config
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.as_ref().display())))
    }

    /// Resolve a workspace-relative path. Absolute paths are returned as-is.
    #[must_use]
    pub fn resolve<P: AsRef<Path>>(&self, rel: P) -> PathBuf {
        self.workspace_root.join(rel)
    }

    /// Directory generated topologies are written under.
    #[must_use]
    pub fn topologies_dir(&self) -> PathBuf {
        self.resolve(&self.topologies_root)
    }

    /// Directory generated experiments are written under.
    #[must_use]
    pub fn experiments_dir(&self) -> PathBuf {
        self.resolve(&self.experiments_root)
    }

    /// Directory simulator outputs are read from.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.output_root)
    }

    /// Reference prefix written into topology power sources.
    #[must_use]
    pub fn carbon_prefix(&self) -> String {
        folder_prefix(&self.carbon_traces_folder)
    }
}

/// Folder as a forward-slash prefix usable inside descriptor documents.
pub(crate) fn folder_prefix(folder: &Path) -> String {
    folder.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roots() {
        let config = CapsuleConfig::default();
        assert_eq!(config.topologies_root, PathBuf::from("topologies"));
        assert_eq!(config.experiments_root, PathBuf::from("experiments"));
        assert_eq!(config.carbon_prefix(), "carbon_traces");
        assert_eq!(config.collision_policy, CollisionPolicy::Fail);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: CapsuleConfig =
            serde_json::from_str(r#"{"experiments_root": "exps", "collision_policy": "overwrite"}"#)
                .unwrap();
        assert_eq!(config.experiments_root, PathBuf::from("exps"));
        assert_eq!(config.topologies_root, PathBuf::from("topologies"));
        assert_eq!(config.collision_policy, CollisionPolicy::Overwrite);
    }

    #[test]
    fn test_resolve_joins_workspace_root() {
        let config = CapsuleConfig::with_root("/tmp/ws");
        assert_eq!(config.experiments_dir(), PathBuf::from("/tmp/ws/experiments"));
        assert_eq!(config.resolve("/abs/file"), PathBuf::from("/abs/file"));
    }
}
