//! Out-of-sample forecasts from a reconciled fit.

use crate::core::{month_at, FeatureMatrix, Forecast, ForecastPoint};
use crate::error::{ForecastError, Result};
use crate::selection::reconciler::ReconciledFit;
use crate::utils::stats::quantile_normal;
use tracing::debug;

/// Configuration for [`Forecaster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastConfig {
    /// Nominal coverage of the prediction intervals.
    pub level: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { level: 0.95 }
    }
}

impl ForecastConfig {
    pub fn with_level(mut self, level: f64) -> Self {
        self.level = level;
        self
    }
}

/// Produces forecasts past the split point of a [`ReconciledFit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Forecaster {
    config: ForecastConfig,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Forecast `horizon` periods after the split.
    ///
    /// `future` holds the feature values for the periods following the
    /// split, one row per period; only the features the fit kept are read.
    /// Fewer rows than `horizon` is a [`ForecastError::HorizonMismatch`].
    pub fn forecast(
        &self,
        fit: &ReconciledFit,
        future: &FeatureMatrix,
        horizon: usize,
    ) -> Result<Forecast> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast horizon must be positive".to_string(),
            ));
        }
        let level = self.config.level;
        if !(level > 0.0 && level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "interval level {} must lie in (0, 1)",
                level
            )));
        }
        if future.len() < horizon {
            return Err(ForecastError::HorizonMismatch {
                requested: horizon,
                available: future.len(),
            });
        }

        let columns = fit
            .subset_used()
            .iter()
            .map(|name| future.column(name).map(|c| &c[..horizon]))
            .collect::<Result<Vec<&[f64]>>>()?;
        let predictions = fit.model().forecast(&columns, horizon)?;

        let z = quantile_normal((1.0 + level) / 2.0);
        let start = fit.split().index();
        let points = predictions
            .into_iter()
            .enumerate()
            .map(|(h, (point, se))| -> Result<ForecastPoint> {
                let period = start + h;
                Ok(ForecastPoint {
                    period,
                    date: month_at(fit.origin(), period)?,
                    point,
                    lower: point - z * se,
                    upper: point + z * se,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subset = %fit.subset_used(),
            order = %fit.order(),
            horizon,
            "forecast produced"
        );
        Ok(Forecast::new(points, level))
    }
}
