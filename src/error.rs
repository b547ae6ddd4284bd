//! Error types for repro-capsule
//!
//! Every variant carries enough context (experiment, key, entry, path) to
//! locate the offending record without re-running the step.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// repro-capsule error types
#[derive(Error, Debug)]
pub enum Error {
    /// Base template could not be read or parsed
    #[error("Failed to load template {path}: {reason}")]
    TemplateLoad {
        /// Template path as given
        path: PathBuf,
        /// Underlying read/parse failure
        reason: String,
    },

    /// An expanded token could not be cast to the type its axis expects
    #[error("Invalid numeric value '{value}' for {axis}")]
    InvalidNumber {
        /// Axis the token belongs to
        axis: &'static str,
        /// Offending token
        value: String,
    },

    /// Two variants of one generation call derived the same output path
    #[error("Name collision: more than one variant maps to {path}\nAdd the varying axis to the naming scheme or use the overwrite collision policy")]
    NameCollision {
        /// Colliding relative path
        path: PathBuf,
    },

    /// A reference entry lacks `pathToFile`
    #[error("Missing 'pathToFile' in {key} entry of '{experiment}': {entry}")]
    MissingPathToFile {
        /// Experiment file name
        experiment: String,
        /// Document key (`topologies`, `workloads`, `failureModels`)
        key: String,
        /// Serialized offending entry
        entry: String,
    },

    /// A reference entry points at a file that does not exist
    #[error("File not found for {key} in '{experiment}': {path}")]
    ReferencedFileMissing {
        /// Experiment file name
        experiment: String,
        /// Document key (`topologies`, `workloads`, `failureModels`)
        key: String,
        /// Referenced path
        path: String,
    },

    /// External simulator runner failed
    #[error("Runner error: {0}")]
    Runner(String),

    /// Invalid capsule configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Zip archive error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
