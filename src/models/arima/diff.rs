//! Differencing utilities for seasonal ARIMA models.

use crate::utils::stats::population_variance;

/// Apply regular differencing `d` times.
///
/// # Arguments
/// * `series` - The input series
/// * `d` - Differencing order (number of times to difference)
///
/// # Returns
/// The differenced series, `d` values shorter (never shorter than empty).
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply seasonal differencing at lag `period`, `cap_d` times.
pub fn seasonal_difference(series: &[f64], cap_d: usize, period: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    if period == 0 {
        return result;
    }
    for _ in 0..cap_d {
        if result.len() <= period {
            return Vec::new();
        }
        result = result[period..]
            .iter()
            .zip(&result)
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Seasonal then regular differencing: (1 - B)^d (1 - B^period)^D applied to `series`.
pub fn apply_differencing(series: &[f64], d: usize, cap_d: usize, period: usize) -> Vec<f64> {
    difference(&seasonal_difference(series, cap_d, period), d)
}

/// Multiply two polynomials in the backshift operator given as coefficient
/// vectors (index = power of B).
pub fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Coefficients of (1 - B)^d (1 - B^period)^D, leading 1 first.
pub fn differencing_polynomial(d: usize, cap_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..cap_d {
            poly = poly_mul(&poly, &seasonal);
        }
    }
    poly
}

/// Undo differencing for values that continue `history`.
///
/// `future_differenced[h]` is the differenced value at the period right after
/// `history` plus `h`. The recursion is
/// `y[t] = w[t] - sum_{j >= 1} c[j] * y[t - j]` with `c` the differencing
/// polynomial, so `history` must hold at least `d + period * D` values.
pub fn integrate(
    history: &[f64],
    future_differenced: &[f64],
    d: usize,
    cap_d: usize,
    period: usize,
) -> Vec<f64> {
    let poly = differencing_polynomial(d, cap_d, period);
    let mut levels = history.to_vec();
    for w in future_differenced {
        let t = levels.len();
        let carried: f64 = poly
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(j, _)| *j <= t)
            .map(|(j, c)| c * levels[t - j])
            .sum();
        levels.push(w - carried);
    }
    levels.split_off(history.len())
}

/// Suggest the seasonal differencing order from the strength of seasonality.
///
/// Seasonal differencing is suggested when it shrinks the variance below
/// `threshold` times the original. Needs two full cycles.
pub fn nsdiffs(series: &[f64], period: usize, max_cap_d: usize, threshold: f64) -> usize {
    if max_cap_d == 0 || period < 2 || series.len() < 2 * period {
        return 0;
    }
    let original = population_variance(series);
    if original.is_nan() || original <= 0.0 {
        return 0;
    }
    let differenced = seasonal_difference(series, 1, period);
    if population_variance(&differenced) < threshold * original {
        1
    } else {
        0
    }
}
