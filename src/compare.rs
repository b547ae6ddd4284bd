//! Output dataset comparison across runs (Arrow/Parquet)
//!
//! A reproduced run matches its original when both output trees hold the
//! same set of `.parquet` files (by relative path) and every pair decodes
//! to equal data: same schema, same rows in the same order. Row-group and
//! batch boundaries do not matter.
//!
//! Reproduced runs live next to their originals with a `repr_` prefix:
//!
//! ```text
//! output/
//!   baseline/        <- original
//!   repr_baseline/   <- reproduction
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::CapsuleConfig;
use crate::Result;

/// Directory-name prefix marking a reproduced run.
pub const REPRODUCED_PREFIX: &str = "repr_";

/// Every `.parquet` file under `root`, keyed by forward-slash relative path.
#[must_use]
pub fn parquet_files<P: AsRef<Path>>(root: P) -> BTreeMap<String, PathBuf> {
    let root = root.as_ref();
    WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "parquet"))
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?;
            Some((rel.to_string_lossy().replace('\\', "/"), e.path().to_path_buf()))
        })
        .collect()
}

/// Decode a Parquet file into a single record batch.
///
/// Returns `None` for a file with no batches.
///
/// # Errors
///
/// Returns error if the file cannot be opened or decoded
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Option<RecordBatch>> {
    let file = File::open(path.as_ref())?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    match batches.first() {
        None => Ok(None),
        Some(first) => Ok(Some(concat_batches(&first.schema(), &batches)?)),
    }
}

/// Whether two Parquet files hold equal data.
///
/// # Errors
///
/// Returns error if either file cannot be decoded
pub fn datasets_equal<P: AsRef<Path>, Q: AsRef<Path>>(a: P, b: Q) -> Result<bool> {
    Ok(load_dataset(a)? == load_dataset(b)?)
}

/// Result of comparing one original/reproduced output pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputComparison {
    /// Original run directory.
    pub original: PathBuf,
    /// Reproduced run directory.
    pub reproduced: PathBuf,
    /// Files only the original has.
    pub missing: Vec<String>,
    /// Files only the reproduction has.
    pub extra: Vec<String>,
    /// Files present on both sides whose data differs.
    pub mismatched: Vec<String>,
    /// Files that could not be decoded, with the reason.
    pub unreadable: Vec<(String, String)>,
}

impl OutputComparison {
    /// True when the file sets agree and every pair is equal.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.mismatched.is_empty() && self.unreadable.is_empty()
    }
}

/// Compare an original output tree against a reproduced one.
#[must_use]
pub fn compare_outputs<P: AsRef<Path>, Q: AsRef<Path>>(original: P, reproduced: Q) -> OutputComparison {
    let original_files = parquet_files(&original);
    let reproduced_files = parquet_files(&reproduced);

    let mut comparison = OutputComparison {
        original: original.as_ref().to_path_buf(),
        reproduced: reproduced.as_ref().to_path_buf(),
        ..OutputComparison::default()
    };

    comparison.extra = reproduced_files
        .keys()
        .filter(|rel| !original_files.contains_key(*rel))
        .cloned()
        .collect();

    for (rel, original_path) in &original_files {
        let Some(reproduced_path) = reproduced_files.get(rel) else {
            comparison.missing.push(rel.clone());
            continue;
        };
        match datasets_equal(original_path, reproduced_path) {
            Ok(true) => {}
            Ok(false) => comparison.mismatched.push(rel.clone()),
            Err(e) => comparison.unreadable.push((rel.clone(), e.to_string())),
        }
    }
    comparison
}

/// Every `repr_<x>` directory under `output_root` paired with its sibling
/// `<x>`, at any depth. Pairs with no Parquet output on either side are
/// left out.
#[must_use]
pub fn find_output_pairs<P: AsRef<Path>>(output_root: P) -> Vec<(PathBuf, PathBuf)> {
    WalkDir::new(output_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_str()?;
            let original_name = name.strip_prefix(REPRODUCED_PREFIX)?;
            let original = e.path().parent()?.join(original_name);
            original.is_dir().then(|| (original, e.path().to_path_buf()))
        })
        .filter(|(original, reproduced)| {
            !parquet_files(original).is_empty() || !parquet_files(reproduced).is_empty()
        })
        .collect()
}

/// Compare every original/reproduced pair under the configured output root.
#[must_use]
pub fn compare_all_outputs(config: &CapsuleConfig) -> Vec<OutputComparison> {
    let pairs = find_output_pairs(config.output_dir());
    if pairs.is_empty() {
        info!("no experiment pairs found");
        return Vec::new();
    }

    let comparisons: Vec<OutputComparison> = pairs
        .iter()
        .map(|(original, reproduced)| compare_outputs(original, reproduced))
        .collect();

    for comparison in comparisons.iter().filter(|c| !c.matches()) {
        warn!(
            original = %comparison.original.display(),
            missing = comparison.missing.len(),
            extra = comparison.extra.len(),
            mismatched = comparison.mismatched.len(),
            unreadable = comparison.unreadable.len(),
            "outputs do not match"
        );
    }
    if comparisons.iter().all(OutputComparison::matches) {
        info!(pairs = comparisons.len(), "all experiments match");
    }
    comparisons
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;
    use parquet::file::properties::WriterProperties;
    use std::sync::Arc;

    fn write_parquet(path: &Path, values: &[f64], row_group: usize) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let schema = Arc::new(Schema::new(vec![
            Field::new("timestamp", DataType::Int64, false),
            Field::new("power_draw", DataType::Float64, false),
        ]));
        let timestamps: Vec<i64> = (0..values.len() as i64).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(timestamps)),
                Arc::new(Float64Array::from(values.to_vec())),
            ],
        )
        .unwrap();

        let props = WriterProperties::builder().set_max_row_group_size(row_group).build();
        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, Some(props)).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_identical_outputs_match_across_row_groups() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("baseline");
        let reproduced = dir.path().join("repr_baseline");
        write_parquet(&original.join("raw/host.parquet"), &[1.0, 2.0, 3.0], 3);
        write_parquet(&reproduced.join("raw/host.parquet"), &[1.0, 2.0, 3.0], 1);

        let comparison = compare_outputs(&original, &reproduced);
        assert!(comparison.matches(), "{comparison:?}");
    }

    #[test]
    fn test_detects_value_and_file_set_differences() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("baseline");
        let reproduced = dir.path().join("repr_baseline");
        write_parquet(&original.join("host.parquet"), &[1.0, 2.0], 10);
        write_parquet(&reproduced.join("host.parquet"), &[1.0, 2.5], 10);
        write_parquet(&original.join("task.parquet"), &[0.0], 10);
        write_parquet(&reproduced.join("service.parquet"), &[0.0], 10);

        let comparison = compare_outputs(&original, &reproduced);
        assert!(!comparison.matches());
        assert_eq!(comparison.mismatched, ["host.parquet"]);
        assert_eq!(comparison.missing, ["task.parquet"]);
        assert_eq!(comparison.extra, ["service.parquet"]);
    }

    #[test]
    fn test_corrupt_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a");
        let reproduced = dir.path().join("repr_a");
        write_parquet(&original.join("host.parquet"), &[1.0], 10);
        std::fs::create_dir_all(&reproduced).unwrap();
        std::fs::write(reproduced.join("host.parquet"), b"not parquet").unwrap();

        let comparison = compare_outputs(&original, &reproduced);
        assert_eq!(comparison.unreadable.len(), 1);
    }

    #[test]
    fn test_find_pairs_nested_and_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        write_parquet(&out.join("group/exp/host.parquet"), &[1.0], 10);
        write_parquet(&out.join("group/repr_exp/host.parquet"), &[1.0], 10);
        std::fs::create_dir_all(out.join("empty")).unwrap();
        std::fs::create_dir_all(out.join("repr_empty")).unwrap();
        std::fs::create_dir_all(out.join("repr_orphan")).unwrap();

        let pairs = find_output_pairs(out);
        assert_eq!(pairs, [(out.join("group/exp"), out.join("group/repr_exp"))]);
    }

    #[test]
    fn test_compare_all_outputs_uses_output_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = CapsuleConfig::with_root(dir.path());
        assert!(compare_all_outputs(&config).is_empty());

        write_parquet(&dir.path().join("output/exp/host.parquet"), &[4.0], 10);
        write_parquet(&dir.path().join("output/repr_exp/host.parquet"), &[4.0], 10);
        let results = compare_all_outputs(&config);
        assert_eq!(results.len(), 1);
        assert!(results[0].matches());
    }
}
