//! Outcome of one generation call

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;

use crate::config::CollisionPolicy;
use crate::{Error, Result};

/// A variant that was built but could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Destination that failed.
    pub path: PathBuf,
    /// Underlying error, rendered.
    pub reason: String,
}

/// What one generation call wrote and what it failed to write.
///
/// A failed write never stops the remaining variants, so both lists may be
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport<T> {
    /// One record per persisted variant, in generation order.
    pub written: Vec<T>,
    /// Variants whose write failed.
    pub failed: Vec<WriteFailure>,
}

impl<T> Default for GenerationReport<T> {
    fn default() -> Self {
        Self {
            written: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> GenerationReport<T> {
    /// Report with nothing written.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no write failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Append another report's records.
    pub fn merge(&mut self, other: Self) {
        self.written.extend(other.written);
        self.failed.extend(other.failed);
    }
}

/// Enforce unique output paths across the variants of one call.
///
/// `Fail` rejects the call at the first repeated path; `Overwrite` keeps the
/// later variant in the earlier one's slot, so each path is planned once.
///
/// # Errors
///
/// Returns `Error::NameCollision` under the `Fail` policy
pub(crate) fn resolve_collisions<V>(
    variants: Vec<V>,
    policy: CollisionPolicy,
    path_of: impl Fn(&V) -> &str,
) -> Result<Vec<V>> {
    let mut planned: Vec<V> = Vec::with_capacity(variants.len());
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for variant in variants {
        let path = path_of(&variant).to_string();
        match by_path.get(&path) {
            None => {
                by_path.insert(path, planned.len());
                planned.push(variant);
            }
            Some(&index) => match policy {
                CollisionPolicy::Fail => {
                    return Err(Error::NameCollision {
                        path: PathBuf::from(path),
                    });
                }
                CollisionPolicy::Overwrite => {
                    warn!(%path, "variant overwrites an earlier one");
                    planned[index] = variant;
                }
            },
        }
    }
    Ok(planned)
}
