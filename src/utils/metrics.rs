//! Out-of-sample accuracy of a forecast against held-out actuals.

use crate::core::{Forecast, MONTHS_PER_YEAR};
use crate::error::{ForecastError, Result};

/// Accuracy of a forecast over the held-out periods.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutAccuracy {
    /// Mean error (actual - forecast); positive means under-forecasting.
    pub me: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (None if zeros in actual)
    pub mape: Option<f64>,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// MAE scaled by the in-sample seasonal-naive MAE (None if the training
    /// prefix is shorter than two years or perfectly periodic).
    pub mase: Option<f64>,
    /// Share of actuals inside the prediction interval.
    pub coverage: f64,
}

/// Score `forecast` against `actual`, using `training` to scale MASE.
///
/// `actual` must have one value per forecast period.
pub fn evaluate_forecast(
    training: &[f64],
    actual: &[f64],
    forecast: &Forecast,
) -> Result<HoldoutAccuracy> {
    if actual.is_empty() || forecast.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != forecast.horizon() {
        return Err(ForecastError::DimensionMismatch {
            expected: forecast.horizon(),
            got: actual.len(),
        });
    }

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| a - f.point)
        .collect();

    let me = errors.iter().sum::<f64>() / n;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();

    let mape = if actual.contains(&0.0) {
        None
    } else {
        let sum: f64 = actual.iter().zip(&errors).map(|(a, e)| (e / a).abs()).sum();
        Some(100.0 * sum / n)
    };

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| {
            let denom = a.abs() + f.point.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - f.point).abs() / denom
            }
        })
        .sum::<f64>()
        * 100.0
        / n;

    let mase = seasonal_naive_mae(training).map(|scale| mae / scale);

    let covered = actual
        .iter()
        .zip(forecast.iter())
        .filter(|(a, f)| **a >= f.lower && **a <= f.upper)
        .count();

    Ok(HoldoutAccuracy {
        me,
        mae,
        rmse,
        mape,
        smape,
        mase,
        coverage: covered as f64 / n,
    })
}

/// In-sample MAE of the seasonal naive forecast y[t] = y[t - 12].
fn seasonal_naive_mae(training: &[f64]) -> Option<f64> {
    if training.len() < 2 * MONTHS_PER_YEAR {
        return None;
    }
    let diffs: Vec<f64> = training
        .windows(MONTHS_PER_YEAR + 1)
        .map(|w| (w[MONTHS_PER_YEAR] - w[0]).abs())
        .collect();
    let scale = diffs.iter().sum::<f64>() / diffs.len() as f64;
    (scale > 0.0).then_some(scale)
}
