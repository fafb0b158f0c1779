//! Lazy enumeration of every non-empty subset of a feature group.

use crate::core::{FeatureGroup, FeatureSubset};
use crate::error::{ForecastError, Result};
use std::iter::FusedIterator;

/// Iterator over all 2^n - 1 non-empty subsets of n feature names.
///
/// Subsets come in canonical order: by size, then by the lexicographic
/// sequence of their members. Only the current combination of indices is
/// kept, so memory stays O(n) however many subsets are produced.
///
/// # Example
/// ```
/// use arimax_select::selection::SubsetEnumerator;
///
/// let subsets: Vec<String> = SubsetEnumerator::new(["b", "a", "c"])
///     .unwrap()
///     .map(|s| s.to_string())
///     .collect();
/// assert_eq!(
///     subsets,
///     ["{a}", "{b}", "{c}", "{a, b}", "{a, c}", "{b, c}", "{a, b, c}"]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SubsetEnumerator {
    names: Vec<String>,
    /// Indices of the next subset to emit; empty once exhausted.
    indices: Vec<usize>,
    remaining: usize,
}

impl SubsetEnumerator {
    /// Enumerate subsets of `names`. Duplicate names are rejected.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(ForecastError::InvalidParameter(format!(
                "feature '{}' listed twice",
                pair[0]
            )));
        }
        if names.len() >= usize::BITS as usize {
            return Err(ForecastError::InvalidParameter(format!(
                "{} features cannot be enumerated exhaustively",
                names.len()
            )));
        }

        let remaining = (1usize << names.len()) - 1;
        let indices = if names.is_empty() { Vec::new() } else { vec![0] };
        Ok(Self {
            names,
            indices,
            remaining,
        })
    }

    /// Enumerate subsets of a feature group.
    pub fn for_group(group: &FeatureGroup) -> Result<Self> {
        Self::new(group.features().iter().cloned())
    }

    /// Names being enumerated, sorted.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Total number of subsets, 2^n - 1.
    pub fn total(&self) -> usize {
        (1usize << self.names.len()) - 1
    }

    /// Move `indices` to the next combination of the same size, or to the
    /// first combination of the next size.
    fn advance(&mut self) {
        let n = self.names.len();
        let k = self.indices.len();
        if let Some(i) = (0..k).rev().find(|&i| self.indices[i] < n - k + i) {
            self.indices[i] += 1;
            for j in i + 1..k {
                self.indices[j] = self.indices[j - 1] + 1;
            }
        } else if k < n {
            self.indices = (0..=k).collect();
        } else {
            self.indices.clear();
        }
    }
}

impl Iterator for SubsetEnumerator {
    type Item = FeatureSubset;

    fn next(&mut self) -> Option<FeatureSubset> {
        if self.indices.is_empty() {
            return None;
        }
        let subset = self
            .indices
            .iter()
            .map(|&i| self.names[i].as_str())
            .collect();
        self.advance();
        self.remaining -= 1;
        Some(subset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SubsetEnumerator {}

impl FusedIterator for SubsetEnumerator {}
