//! KPSS level-stationarity test and the differencing order it implies.

use crate::models::arima::diff::difference;
use crate::utils::stats::mean;

/// KPSS critical values for level stationarity (Kwiatkowski et al., 1992).
const KPSS_CRITICAL: [(f64, f64); 3] = [(0.10, 0.347), (0.05, 0.463), (0.01, 0.739)];

/// Outcome of a KPSS test.
#[derive(Debug, Clone, PartialEq)]
pub struct KpssResult {
    /// LM statistic.
    pub statistic: f64,
    /// Interpolated p-value; NaN when the statistic is undefined.
    pub p_value: f64,
    /// Bartlett window width of the long-run variance.
    pub lags: usize,
}

impl KpssResult {
    fn undefined(lags: usize) -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags,
        }
    }

    /// True when the null of level stationarity is rejected at `alpha`.
    ///
    /// An undefined statistic (too short, or no variation) never rejects.
    pub fn rejects(&self, alpha: f64) -> bool {
        self.p_value.is_finite() && self.p_value < alpha
    }
}

/// KPSS test of the null hypothesis that `series` is level stationary.
///
/// `lags` defaults to `floor(4 * (n / 100)^0.25)`, at least 1.
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> KpssResult {
    let n = series.len();
    let lags = lags
        .unwrap_or_else(|| (4.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize)
        .min(n / 2)
        .max(1);
    if n < 4 {
        return KpssResult::undefined(lags);
    }

    let nf = n as f64;
    let level = mean(series);
    let deviations: Vec<f64> = series.iter().map(|v| v - level).collect();

    let partial_sums = deviations
        .iter()
        .scan(0.0, |acc, e| {
            *acc += e;
            Some(*acc)
        })
        .map(|s| s * s)
        .sum::<f64>();

    let gamma = |j: usize| -> f64 {
        deviations[j..]
            .iter()
            .zip(&deviations)
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / nf
    };
    let long_run_variance = (1..=lags).fold(gamma(0), |acc, j| {
        let bartlett = 1.0 - j as f64 / (lags + 1) as f64;
        acc + 2.0 * bartlett * gamma(j)
    });

    if long_run_variance <= f64::EPSILON * gamma(0).max(1.0) {
        return KpssResult::undefined(lags);
    }

    let statistic = partial_sums / (nf * nf) / long_run_variance;
    KpssResult {
        statistic,
        p_value: kpss_p_value(statistic),
        lags,
    }
}

/// Linear interpolation in the critical-value table, clamped to [0.01, 0.10]
/// beyond its ends.
fn kpss_p_value(statistic: f64) -> f64 {
    if !statistic.is_finite() {
        return f64::NAN;
    }
    let (first, last) = (KPSS_CRITICAL[0], KPSS_CRITICAL[KPSS_CRITICAL.len() - 1]);
    if statistic <= first.1 {
        return first.0;
    }
    if statistic >= last.1 {
        return last.0;
    }
    KPSS_CRITICAL
        .windows(2)
        .find(|w| statistic <= w[1].1)
        .map(|w| {
            let frac = (statistic - w[0].1) / (w[1].1 - w[0].1);
            w[0].0 + frac * (w[1].0 - w[0].0)
        })
        .unwrap_or(last.0)
}

/// Number of first differences needed before KPSS stops rejecting at `alpha`.
///
/// Stops early when the differenced series becomes too short to test.
pub fn ndiffs(series: &[f64], alpha: f64, max_d: usize) -> usize {
    let mut d = 0;
    let mut current = series.to_vec();
    while d < max_d && kpss_test(&current, None).rejects(alpha) {
        d += 1;
        current = difference(&current, 1);
    }
    d
}
