//! Refits a winning specification on the training prefix of a split.
//!
//! A feature that varies over the full history can be constant, or a
//! combination of the others, once the series is cut at the split point and
//! differenced. The reconciler keeps the pinned order, drops the feature
//! blamed for the rank deficiency and retries until a fit succeeds.

use crate::core::{FeatureMatrix, FeatureSubset, SplitPoint, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::{ModelOrder, RegressionArima};
use crate::selection::fitter::{FitResult, FitterConfig, ModelFitter};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Which degenerate feature to drop on a rank deficiency.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DropOrder {
    /// The most collinear feature first.
    #[default]
    Collinearity,
    /// The first listed feature among the degenerate ones; falls back to
    /// collinearity order when none is listed.
    Priority(Vec<String>),
}

impl DropOrder {
    /// Pick the feature to drop from degenerate features sorted most collinear first.
    fn choose<'a>(&self, degenerate: &'a [String]) -> Option<&'a String> {
        match self {
            DropOrder::Collinearity => degenerate.first(),
            DropOrder::Priority(priority) => priority
                .iter()
                .find_map(|p| degenerate.iter().find(|d| *d == p))
                .or_else(|| degenerate.first()),
        }
    }
}

/// Configuration for [`SplitReconciler`].
#[derive(Debug, Clone, Default)]
pub struct ReconcileConfig {
    pub fitter: FitterConfig,
    pub drop_order: DropOrder,
}

impl ReconcileConfig {
    pub fn with_fitter(mut self, fitter: FitterConfig) -> Self {
        self.fitter = fitter;
        self
    }

    pub fn with_drop_order(mut self, drop_order: DropOrder) -> Self {
        self.drop_order = drop_order;
        self
    }
}

/// A feature removed during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedFeature {
    pub name: String,
    /// The rank deficiency that caused the drop.
    pub reason: ForecastError,
}

/// The winning specification refitted on a training prefix.
#[derive(Debug, Clone)]
pub struct ReconciledFit {
    fit: FitResult,
    original_subset: FeatureSubset,
    dropped: Vec<DroppedFeature>,
    split: SplitPoint,
    origin: NaiveDate,
}

impl ReconciledFit {
    /// The successful training-prefix fit.
    pub fn fit(&self) -> &FitResult {
        &self.fit
    }

    pub fn model(&self) -> &RegressionArima {
        self.fit.model()
    }

    /// Features actually used.
    pub fn subset_used(&self) -> &FeatureSubset {
        self.fit.subset()
    }

    /// Features of the specification being reconciled.
    pub fn original_subset(&self) -> &FeatureSubset {
        &self.original_subset
    }

    /// Features dropped, in drop order.
    pub fn dropped(&self) -> &[DroppedFeature] {
        &self.dropped
    }

    pub fn order(&self) -> ModelOrder {
        self.fit.order()
    }

    pub fn split(&self) -> SplitPoint {
        self.split
    }

    /// First month of the series; period 0.
    pub fn origin(&self) -> NaiveDate {
        self.origin
    }
}

/// Refits a pinned (subset, order) on the training prefix, dropping
/// degenerate features as needed.
#[derive(Debug, Clone, Default)]
pub struct SplitReconciler {
    fitter: ModelFitter,
    drop_order: DropOrder,
}

impl SplitReconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            fitter: ModelFitter::new(config.fitter),
            drop_order: config.drop_order,
        }
    }

    /// Fit `order` with `subset` on the periods before `split`.
    ///
    /// Rank deficiency drops one feature per retry; any other failure, and
    /// running out of features, is fatal.
    pub fn reconcile(
        &self,
        series: &TimeSeries,
        features: &FeatureMatrix,
        subset: &FeatureSubset,
        order: ModelOrder,
        split: SplitPoint,
    ) -> Result<ReconciledFit> {
        if split.index() >= series.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "split point {} leaves nothing to hold out from {} periods",
                split.index(),
                series.len()
            )));
        }
        let needed = order.min_observations();
        if split.index() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: split.index(),
            });
        }

        let window = split.train_window();
        let mut current = subset.clone();
        let mut dropped: Vec<DroppedFeature> = Vec::new();

        loop {
            match self.fitter.fit(series, features, &current, window, Some(order)) {
                Ok(fit) => {
                    info!(
                        subset = %current,
                        order = %order,
                        window = %window,
                        dropped = dropped.len(),
                        aicc = fit.aicc(),
                        "specification reconciled"
                    );
                    return Ok(ReconciledFit {
                        fit,
                        original_subset: subset.clone(),
                        dropped,
                        split,
                        origin: series.origin(),
                    });
                }
                Err(err) if err.is_rank_deficiency() => {
                    let Some(name) = self.drop_order.choose(err.degenerate_features()).cloned()
                    else {
                        return Err(err);
                    };
                    warn!(
                        feature = %name,
                        order = %order,
                        window = %window,
                        "dropping degenerate feature"
                    );
                    current = current.without(&name);
                    dropped.push(DroppedFeature { name, reason: err });
                    if current.is_empty() {
                        return Err(ForecastError::Exhaustion {
                            subset: subset.to_string(),
                            order: order.to_string(),
                            window: window.to_string(),
                        });
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
