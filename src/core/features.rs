//! Exogenous feature matrix, feature groups and feature subsets.

use crate::core::time_series::FitWindow;
use crate::error::{ForecastError, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Period-aligned exogenous regressors keyed by feature name.
///
/// Every column has exactly `len` values and row `i` belongs to period `i`
/// of the series the matrix was built for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    len: usize,
    columns: BTreeMap<String, Vec<f64>>,
}

impl FeatureMatrix {
    /// Create an empty matrix for a series of `len` periods.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            columns: BTreeMap::new(),
        }
    }

    /// Add a column. Fails on length mismatch, non-finite values or a duplicate name.
    pub fn with_feature(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.insert(name, values)?;
        Ok(self)
    }

    /// Add a column in place.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.len {
            return Err(ForecastError::DimensionMismatch {
                expected: self.len,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }
        if self.columns.contains_key(&name) {
            return Err(ForecastError::InvalidParameter(format!(
                "feature '{}' already present",
                name
            )));
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Number of periods covered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of features.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Feature names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Full column for a feature.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| ForecastError::UnknownFeature(name.to_string()))
    }

    /// Columns of `subset` restricted to `window`, in the subset's canonical order.
    pub fn regressors(&self, subset: &FeatureSubset, window: FitWindow) -> Result<Vec<&[f64]>> {
        window.check_within(self.len)?;
        subset
            .iter()
            .map(|name| self.column(name).map(|col| &col[window.start()..window.end()]))
            .collect()
    }

    /// A new matrix holding only the periods of `window`.
    pub fn slice(&self, window: FitWindow) -> Result<FeatureMatrix> {
        window.check_within(self.len)?;
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| (name.clone(), values[window.start()..window.end()].to_vec()))
            .collect();
        Ok(Self {
            len: window.len(),
            columns,
        })
    }

    /// Check that every member of `subset` is present.
    pub fn check_subset(&self, subset: &FeatureSubset) -> Result<()> {
        match subset.iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(ForecastError::UnknownFeature(missing.to_string())),
            None => Ok(()),
        }
    }
}

/// A named, ordered set of candidate features that may be combined freely.
///
/// Groups are assembled upstream so that mutually collinear features (a
/// composite indicator and its components, say) never share a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGroup {
    name: String,
    features: Vec<String>,
}

impl FeatureGroup {
    /// Create a group; duplicate or empty names are rejected.
    pub fn new<I, S>(name: impl Into<String>, features: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let features: Vec<String> = features.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for feature in &features {
            if feature.is_empty() {
                return Err(ForecastError::InvalidParameter(
                    "feature names must be non-empty".into(),
                ));
            }
            if !seen.insert(feature.as_str()) {
                return Err(ForecastError::InvalidParameter(format!(
                    "feature '{}' listed twice in group",
                    feature
                )));
            }
        }
        Ok(Self {
            name: name.into(),
            features,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A set of feature names used together as regressors.
///
/// Subsets order canonically: by size, then by the lexicographic sequence
/// of their member names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FeatureSubset(BTreeSet<String>);

impl FeatureSubset {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Member names in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// Union with another subset.
    pub fn union(&self, other: &FeatureSubset) -> FeatureSubset {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// This subset without `name`.
    pub fn without(&self, name: &str) -> FeatureSubset {
        Self(self.0.iter().filter(|n| *n != name).cloned().collect())
    }

    /// Whether every member of `self` is in `other` and `other` has more.
    pub fn is_strict_subset_of(&self, other: &FeatureSubset) -> bool {
        self.len() < other.len() && self.0.is_subset(&other.0)
    }
}

impl Ord for FeatureSubset {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.0.iter().cmp(other.0.iter()))
    }
}

impl PartialOrd for FeatureSubset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FeatureSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", name)?;
        }
        write!(f, "}}")
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureSubset {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
