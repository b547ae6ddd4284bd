//! External simulator invocation
//!
//! Each queued experiment is handed to the runner executable as
//! `--experiment-path <absolute path>`; the runner writes its datasets
//! under the output root on its own.

use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::CapsuleConfig;
use crate::experiment::SelectionEntry;
use crate::{Error, Result};

/// Wall-clock time of one queued experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTiming {
    /// Experiment file name.
    pub name: String,
    /// Seconds, rounded to two decimals.
    pub duration_sec: Option<f64>,
}

/// Runs experiments through the configured simulator runner.
#[derive(Debug, Clone, Copy)]
pub struct ExperimentRunner<'a> {
    config: &'a CapsuleConfig,
}

impl<'a> ExperimentRunner<'a> {
    /// Create a runner bound to a workspace layout.
    #[must_use]
    pub const fn new(config: &'a CapsuleConfig) -> Self {
        Self { config }
    }

    fn runner_path(&self) -> PathBuf {
        self.config.resolve(&self.config.runner_path)
    }

    /// Run one experiment file (relative to the experiments root).
    ///
    /// # Errors
    ///
    /// Returns `Error::Runner` if the experiment or the runner is missing or
    /// the runner exits unsuccessfully, and `Error::Io` if it cannot be spawned
    pub fn run(&self, name: &str) -> Result<()> {
        let experiment = self.config.experiments_dir().join(name);
        if !experiment.is_file() {
            return Err(Error::Runner(format!(
                "Experiment file not found at {}",
                experiment.display()
            )));
        }
        let runner = self.runner_path();
        if !runner.is_file() {
            return Err(Error::Runner(format!("Runner not found at {}", runner.display())));
        }

        let experiment = std::fs::canonicalize(&experiment)?;
        let runner = std::fs::canonicalize(&runner)?;
        let output = Command::new(&runner)
            .arg("--experiment-path")
            .arg(&experiment)
            .current_dir(&self.config.workspace_root)
            .output()?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(experiment = name, "runner stderr:\n{stderr}");
        }
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Runner(format!("{name}: runner exited with {}", output.status)))
        }
    }

    /// Run every queued experiment in order, then clear the queue.
    ///
    /// A failed experiment is logged and still timed; the rest of the
    /// queue keeps running.
    pub fn run_queue(&self, queue: &mut Vec<SelectionEntry>) -> Vec<RunTiming> {
        if queue.is_empty() {
            info!("no experiments queued");
            return Vec::new();
        }

        info!(count = queue.len(), "running queued experiments");
        let mut timings = Vec::with_capacity(queue.len());
        for entry in queue.drain(..) {
            info!(experiment = %entry.name, "running");
            let started = Instant::now();
            if let Err(e) = self.run(&entry.name) {
                error!(experiment = %entry.name, error = %e, "experiment failed");
            }
            let seconds = started.elapsed().as_secs_f64();
            timings.push(RunTiming {
                name: entry.name,
                duration_sec: Some((seconds * 100.0).round() / 100.0),
            });
        }
        info!("all experiments completed");
        timings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_experiment_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = CapsuleConfig::with_root(dir.path());
        let err = ExperimentRunner::new(&config).run("nope.json").unwrap_err();
        assert!(err.to_string().contains("Experiment file not found"));
    }

    #[test]
    fn test_missing_runner_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = CapsuleConfig::with_root(dir.path());
        std::fs::create_dir_all(config.experiments_dir()).unwrap();
        std::fs::write(config.experiments_dir().join("e.json"), "{}").unwrap();
        let err = ExperimentRunner::new(&config).run("e.json").unwrap_err();
        assert!(err.to_string().contains("Runner not found"));
    }

    #[test]
    fn test_empty_queue() {
        let config = CapsuleConfig::default();
        assert!(ExperimentRunner::new(&config).run_queue(&mut Vec::new()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_queue_invokes_runner_and_drains() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let config = CapsuleConfig {
            runner_path: PathBuf::from("bin/runner.sh"),
            ..CapsuleConfig::with_root(dir.path())
        };
        let runner = dir.path().join("bin/runner.sh");
        std::fs::create_dir_all(runner.parent().unwrap()).unwrap();
        std::fs::write(&runner, "#!/bin/sh\necho \"$2\" >> invoked.txt\n").unwrap();
        std::fs::set_permissions(&runner, std::fs::Permissions::from_mode(0o755)).unwrap();

        std::fs::create_dir_all(config.experiments_dir().join("g")).unwrap();
        std::fs::write(config.experiments_dir().join("g/a.json"), "{}").unwrap();

        let mut queue = vec![SelectionEntry::named("g/a.json"), SelectionEntry::named("missing.json")];
        let timings = ExperimentRunner::new(&config).run_queue(&mut queue);

        assert!(queue.is_empty());
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[1].name, "missing.json");
        let invoked = std::fs::read_to_string(dir.path().join("invoked.txt")).unwrap();
        assert!(invoked.trim_end().ends_with("g/a.json"));
    }
}
