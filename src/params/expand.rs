//! Index-aligned and cartesian expansion over named axes

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// How a family of variants is derived from several axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionMode {
    /// Pair the i-th value of every axis; shorter axes are absent past their end.
    #[default]
    IndexAligned,
    /// Every combination across the non-empty axes.
    Cartesian,
}

/// Number of index-aligned iterations: the longest axis, never less than 1.
#[must_use]
pub fn iteration_count(lengths: &[usize]) -> usize {
    lengths.iter().copied().max().unwrap_or(0).max(1)
}

/// Ordered collection of named axes.
///
/// Insertion order is preserved and drives cartesian iteration order (the
/// first axis varies slowest).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Axes {
    axes: Vec<(&'static str, Vec<String>)>,
}

impl Axes {
    /// Create an empty axis set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an axis (builder style).
    #[must_use]
    pub fn with(mut self, name: &'static str, values: Vec<String>) -> Self {
        self.push(name, values);
        self
    }

    /// Append an axis.
    pub fn push(&mut self, name: &'static str, values: Vec<String>) {
        self.axes.push((name, values));
    }

    /// Values of one axis, empty if unknown.
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.axes
            .iter()
            .find(|(axis, _)| *axis == name)
            .map_or(&[][..], |(_, values)| values.as_slice())
    }

    /// Whether every axis is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.iter().all(|(_, values)| values.is_empty())
    }

    /// Index-aligned iterator; always yields at least one assignment.
    #[must_use]
    pub fn index_aligned(&self) -> IndexAligned<'_> {
        let lengths: Vec<usize> = self.axes.iter().map(|(_, v)| v.len()).collect();
        IndexAligned {
            axes: self,
            index: 0,
            count: iteration_count(&lengths),
        }
    }

    /// Cartesian product over the non-empty axes.
    ///
    /// Axes with no values are left out of the product entirely. Tuples
    /// holding a blank token (the "no value" placeholder) are skipped, and a
    /// tuple repeated because an axis lists a value twice is yielded once.
    /// With no active axis the product is the single empty assignment.
    #[must_use]
    pub fn cartesian(&self) -> Vec<Assignment> {
        let active: Vec<&(&'static str, Vec<String>)> =
            self.axes.iter().filter(|(_, values)| !values.is_empty()).collect();

        let mut seen: HashSet<Vec<&str>> = HashSet::new();
        let mut out = Vec::new();
        let mut cursor = vec![0usize; active.len()];

        'product: loop {
            let combo: Vec<&str> = active
                .iter()
                .zip(&cursor)
                .map(|((_, values), &i)| values[i].as_str())
                .collect();

            if !combo.iter().any(|v| v.trim().is_empty()) && seen.insert(combo.clone()) {
                out.push(Assignment {
                    values: active
                        .iter()
                        .zip(combo)
                        .map(|((name, _), value)| (*name, value.to_string()))
                        .collect(),
                });
            }

            // Odometer: rightmost axis advances fastest
            for pos in (0..active.len()).rev() {
                cursor[pos] += 1;
                if cursor[pos] < active[pos].1.len() {
                    continue 'product;
                }
                cursor[pos] = 0;
            }
            break;
        }
        out
    }

    /// Expand with the given mode.
    #[must_use]
    pub fn expand(&self, mode: ExpansionMode) -> Vec<Assignment> {
        match mode {
            ExpansionMode::IndexAligned => self.index_aligned().collect(),
            ExpansionMode::Cartesian => self.cartesian(),
        }
    }
}

/// Iterator over index-aligned assignments.
#[derive(Debug)]
pub struct IndexAligned<'a> {
    axes: &'a Axes,
    index: usize,
    count: usize,
}

impl Iterator for IndexAligned<'_> {
    type Item = Assignment;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let i = self.index;
        self.index += 1;
        Some(Assignment {
            values: self
                .axes
                .axes
                .iter()
                .filter_map(|(name, values)| values.get(i).map(|v| (*name, v.clone())))
                .collect(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndexAligned<'_> {}

/// One resolved value per axis that has a value in this variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<(&'static str, String)>,
}

impl Assignment {
    /// Token for `axis`, or `None` when the axis is absent in this variant.
    #[must_use]
    pub fn get(&self, axis: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| *name == axis)
            .map(|(_, value)| value.as_str())
    }

    /// `(axis, token)` pairs in axis order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.values.iter().map(|(name, value)| (*name, value.as_str()))
    }

    /// Number of axes set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no axis is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
