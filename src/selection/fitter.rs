//! Fits one feature subset over one window, with an automatic or pinned order.

use crate::core::{FeatureMatrix, FeatureSubset, FitWindow, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::{search_order, AutoOrderConfig, FitContext, ModelOrder, RegressionArima};
use crate::utils::optimization::NelderMeadConfig;
use std::time::{Duration, Instant};
use tracing::debug;

/// Configuration for [`ModelFitter`].
#[derive(Debug, Clone)]
pub struct FitterConfig {
    /// Bounds and strategy of the automatic order search.
    pub auto: AutoOrderConfig,
    /// Settings of the ARMA coefficient optimizer.
    pub optimizer: NelderMeadConfig,
    /// Residual ratio below which a regressor is treated as collinear.
    pub collinearity_tolerance: f64,
    /// Wall-clock budget of a single fit, order search included.
    pub timeout: Option<Duration>,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            auto: AutoOrderConfig::default(),
            optimizer: NelderMeadConfig::default().with_tolerance(1e-8),
            collinearity_tolerance: 1e-8,
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl FitterConfig {
    pub fn with_auto_config(mut self, auto: AutoOrderConfig) -> Self {
        self.auto = auto;
        self
    }

    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_collinearity_tolerance(mut self, tolerance: f64) -> Self {
        self.collinearity_tolerance = tolerance;
        self
    }

    /// Set the per-fit budget; `None` disables it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A successful fit of one subset over one window.
#[derive(Debug, Clone)]
pub struct FitResult {
    subset: FeatureSubset,
    window: FitWindow,
    model: RegressionArima,
    /// Orders tried by the automatic search with their AICc; empty when pinned.
    candidates: Vec<(ModelOrder, f64)>,
}

impl FitResult {
    pub fn subset(&self) -> &FeatureSubset {
        &self.subset
    }

    pub fn window(&self) -> FitWindow {
        self.window
    }

    pub fn order(&self) -> ModelOrder {
        self.model.order()
    }

    pub fn aicc(&self) -> f64 {
        self.model.aicc()
    }

    /// Parameter count entering the AICc.
    pub fn num_params(&self) -> usize {
        self.model.num_params()
    }

    /// The fitted model and its coefficients.
    pub fn model(&self) -> &RegressionArima {
        &self.model
    }

    /// Regression coefficients by feature name.
    pub fn coefficients(&self) -> impl Iterator<Item = (&str, f64)> {
        self.model
            .regressors()
            .iter()
            .map(String::as_str)
            .zip(self.model.regression_coefficients().iter().copied())
    }

    pub fn candidates(&self) -> &[(ModelOrder, f64)] {
        &self.candidates
    }
}

/// Fits regressions with seasonal ARIMA errors for a subset of features.
///
/// A fit never panics: every failure (rank deficiency, too short a window,
/// non-convergence, timeout) comes back as an error labelled with the subset.
#[derive(Debug, Clone, Default)]
pub struct ModelFitter {
    config: FitterConfig,
}

impl ModelFitter {
    pub fn new(config: FitterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    /// Fit `subset` over `window`, searching the order unless `pinned` is given.
    pub fn fit(
        &self,
        series: &TimeSeries,
        features: &FeatureMatrix,
        subset: &FeatureSubset,
        window: FitWindow,
        pinned: Option<ModelOrder>,
    ) -> Result<FitResult> {
        if features.len() != series.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: series.len(),
                got: features.len(),
            });
        }
        let y = series.window_values(window)?;
        let columns = features.regressors(subset, window)?;

        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let optimizer = self.config.optimizer.clone().with_deadline(deadline);
        let ctx = FitContext {
            subset,
            window,
            optimizer: &optimizer,
            timeout: self.config.timeout,
            collinearity_tolerance: self.config.collinearity_tolerance,
        };

        let (model, candidates) = match pinned {
            Some(order) => (RegressionArima::estimate(y, &columns, order, &ctx)?, Vec::new()),
            None => {
                let search = search_order(y, &columns, &self.config.auto, &ctx)?;
                (search.best, search.scores)
            }
        };

        debug!(
            subset = %subset,
            window = %window,
            order = %model.order(),
            aicc = model.aicc(),
            "subset fitted"
        );

        Ok(FitResult {
            subset: subset.clone(),
            window,
            model,
            candidates,
        })
    }
}
