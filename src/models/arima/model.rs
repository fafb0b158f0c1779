//! Regression with seasonal ARIMA errors.
//!
//! The target is modelled as `y[t] = x[t]·beta + n[t]` where the error `n`
//! follows SARIMA(p, d, q)(P, D, Q)\[12\]. Estimation is two-stage: the
//! regression coefficients (and the mean or drift) come from least squares on
//! the differenced series, and the ARMA coefficients minimize the conditional
//! sum of squares of the differenced regression errors with zero pre-sample
//! values. Every order therefore uses the same number of observations,
//! `window - d - 12 * D`, which keeps information criteria comparable across
//! ARMA orders.

use crate::core::{FeatureSubset, FitWindow};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{
    apply_differencing, differencing_polynomial, integrate, poly_mul, seasonal_difference,
};
use crate::models::arima::order::{ModelOrder, SEASONAL_PERIOD};
use crate::utils::ols::{ols_fit, residual_ratios};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use std::time::{Duration, Instant};

/// Box constraint on every AR and MA coefficient.
const COEFFICIENT_BOUND: f64 = 0.99;

/// Corrected Akaike information criterion, AIC + 2k(k+1)/(n-k-1).
///
/// Undefined (`None`) when `n <= k + 1` or the log-likelihood is not finite.
///
/// # Example
/// ```
/// use arimax_select::models::arima::aicc;
///
/// let value = aicc(-100.0, 3, 50).unwrap();
/// assert!((value - (206.0 + 24.0 / 46.0)).abs() < 1e-12);
/// assert!(aicc(-100.0, 3, 4).is_none());
/// ```
pub fn aicc(loglik: f64, k: usize, n: usize) -> Option<f64> {
    if n <= k + 1 || !loglik.is_finite() {
        return None;
    }
    let (k, n) = (k as f64, n as f64);
    Some(-2.0 * loglik + 2.0 * k + 2.0 * k * (k + 1.0) / (n - k - 1.0))
}

/// Labels and budgets for one estimation, used to build diagnosable errors.
#[derive(Debug, Clone, Copy)]
pub struct FitContext<'a> {
    /// Regressors being fitted, in column order.
    pub subset: &'a FeatureSubset,
    /// Window the columns were cut from.
    pub window: FitWindow,
    /// Optimizer settings, including the fit deadline.
    pub optimizer: &'a NelderMeadConfig,
    /// Wall-clock budget the deadline was derived from.
    pub timeout: Option<Duration>,
    /// Residual ratio below which a regressor counts as collinear.
    pub collinearity_tolerance: f64,
}

impl FitContext<'_> {
    pub(crate) fn deadline_passed(&self) -> bool {
        self.optimizer
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub(crate) fn timeout_error(&self) -> ForecastError {
        ForecastError::FitTimeout {
            subset: self.subset.to_string(),
            millis: self.timeout.map_or(0, |t| t.as_millis()),
        }
    }
}

/// Regressors that cannot be estimated on this window, most collinear first,
/// ties by name.
///
/// A column is degenerate when its differenced values are (nearly) a linear
/// combination of a level term and the other differenced regressors, or when
/// its levels repeat every 12 periods (a fixed-month dummy), whatever the
/// seasonal differencing. `names`, `levels` and `differenced` are parallel.
pub fn degenerate_regressors(
    names: &[&str],
    levels: &[&[f64]],
    differenced: &[&[f64]],
    tolerance: f64,
) -> Vec<String> {
    let ratios = residual_ratios(differenced, true);
    let mut flagged: Vec<(f64, &str)> = ratios
        .into_iter()
        .zip(levels)
        .map(|(ratio, column)| if repeats_yearly(column) { 0.0 } else { ratio })
        .zip(names.iter().copied())
        .filter(|(ratio, _)| *ratio < tolerance)
        .collect();
    flagged.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    flagged.into_iter().map(|(_, name)| name.to_string()).collect()
}

/// True when the lag-12 difference of `column` vanishes.
fn repeats_yearly(column: &[f64]) -> bool {
    let lagged = seasonal_difference(column, 1, SEASONAL_PERIOD);
    if lagged.is_empty() {
        return false;
    }
    let scale = column.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    lagged.iter().all(|v| v.abs() <= 1e-12 * scale)
}

/// Differenced regression stage shared by every ARMA order with the same
/// differencing and drift.
#[derive(Debug, Clone)]
pub(crate) struct Regression {
    order: ModelOrder,
    regressors: Vec<String>,
    beta: Vec<f64>,
    constant: f64,
    /// y - X·beta in levels over the window.
    errors: Vec<f64>,
    /// Differenced errors with the constant removed.
    differenced_errors: Vec<f64>,
}

impl Regression {
    /// Difference target and regressors, check their rank and regress.
    ///
    /// Only the differencing and drift of `order` matter here.
    pub(crate) fn prepare(
        y: &[f64],
        columns: &[&[f64]],
        order: ModelOrder,
        ctx: &FitContext<'_>,
    ) -> Result<Self> {
        order.validate()?;
        let names: Vec<&str> = ctx.subset.iter().collect();
        if names.len() != columns.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: names.len(),
                got: columns.len(),
            });
        }
        let needed = order.min_observations();
        if y.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: y.len(),
            });
        }
        if let Some(column) = columns.iter().find(|c| c.len() != y.len()) {
            return Err(ForecastError::DimensionMismatch {
                expected: y.len(),
                got: column.len(),
            });
        }

        let (d, cap_d) = (order.d, order.cap_d);
        let target = apply_differencing(y, d, cap_d, SEASONAL_PERIOD);
        let differenced: Vec<Vec<f64>> = columns
            .iter()
            .map(|c| apply_differencing(c, d, cap_d, SEASONAL_PERIOD))
            .collect();
        let differenced_refs: Vec<&[f64]> = differenced.iter().map(Vec::as_slice).collect();

        let degenerate = degenerate_regressors(
            &names,
            columns,
            &differenced_refs,
            ctx.collinearity_tolerance,
        );
        if !degenerate.is_empty() {
            return Err(ForecastError::RankDeficiency {
                features: degenerate,
                order: order.to_string(),
                window: ctx.window.to_string(),
            });
        }

        let ones = vec![1.0; target.len()];
        let mut design = differenced_refs;
        if order.has_constant() {
            design.push(&ones);
        }
        let fit = ols_fit(&target, &design)?;

        let (beta, constant) = if order.has_constant() {
            let (beta, constant) = fit.coefficients.split_at(columns.len());
            (beta.to_vec(), constant[0])
        } else {
            (fit.coefficients, 0.0)
        };

        let errors = (0..y.len())
            .map(|t| y[t] - columns.iter().zip(&beta).map(|(c, b)| c[t] * b).sum::<f64>())
            .collect();

        Ok(Self {
            order,
            regressors: names.iter().map(|s| s.to_string()).collect(),
            beta,
            constant,
            errors,
            differenced_errors: fit.residuals,
        })
    }

    /// Fit the ARMA part of `order` (same differencing and drift) to the errors.
    pub(crate) fn fit_arma(&self, order: ModelOrder, ctx: &FitContext<'_>) -> Result<RegressionArima> {
        debug_assert_eq!(
            (order.d, order.cap_d, order.has_constant()),
            (self.order.d, self.order.cap_d, self.order.has_constant())
        );
        if ctx.deadline_passed() {
            return Err(ctx.timeout_error());
        }

        let u = &self.differenced_errors;
        let n = u.len();
        let k = order.num_params(self.beta.len());
        let scale = (u.iter().map(|v| v * v).sum::<f64>() / n as f64).sqrt();
        if scale.is_nan() || scale <= f64::EPSILON {
            return Err(ForecastError::ComputationError(format!(
                "{} on {} leaves no residual variance",
                order, ctx.subset
            )));
        }

        let params = if order.arma_terms() == 0 {
            Vec::new()
        } else {
            let scaled: Vec<f64> = u.iter().map(|v| v / scale).collect();
            let initial = initial_params(&order);
            let bounds = vec![(-COEFFICIENT_BOUND, COEFFICIENT_BOUND); initial.len()];
            let result = nelder_mead(
                |params| {
                    let (ar, ma) = expand_polynomials(&order, params);
                    innovations(&scaled, &ar, &ma).iter().map(|e| e * e).sum()
                },
                &initial,
                Some(&bounds),
                ctx.optimizer,
            );
            if result.timed_out {
                return Err(ctx.timeout_error());
            }
            if !result.converged {
                return Err(ForecastError::NonConvergence {
                    subset: ctx.subset.to_string(),
                    order: order.to_string(),
                    iterations: result.iterations,
                });
            }
            result.optimal_point
        };

        let (ar_poly, ma_poly) = expand_polynomials(&order, &params);
        let residuals = innovations(u, &ar_poly, &ma_poly);
        let css: f64 = residuals.iter().map(|e| e * e).sum();
        let sigma2 = css / n as f64;
        if !sigma2.is_finite() || sigma2 <= 0.0 {
            return Err(ForecastError::ComputationError(format!(
                "{} on {} produced innovation variance {}",
                order, ctx.subset, sigma2
            )));
        }

        let loglik = -0.5 * n as f64 * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let aicc_value = aicc(loglik, k, n).ok_or(ForecastError::InsufficientData {
            needed: k + 2,
            got: n,
        })?;
        let aic = -2.0 * loglik + 2.0 * k as f64;
        let bic = -2.0 * loglik + k as f64 * (n as f64).ln();

        let (ar, rest) = params.split_at(order.p);
        let (ma, rest) = rest.split_at(order.q);
        let (seasonal_ar, seasonal_ma) = rest.split_at(order.cap_p);

        Ok(RegressionArima {
            order,
            regressors: self.regressors.clone(),
            beta: self.beta.clone(),
            constant: order.has_constant().then_some(self.constant),
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            seasonal_ar: seasonal_ar.to_vec(),
            seasonal_ma: seasonal_ma.to_vec(),
            ar_poly,
            ma_poly,
            sigma2,
            loglik,
            aic,
            aicc: aicc_value,
            bic,
            n_obs: n,
            num_params: k,
            residuals,
            differenced_errors: u.clone(),
            errors: self.errors.clone(),
        })
    }
}

/// Parameter vector layout: [phi_1..p, theta_1..q, Phi_1..P, Theta_1..Q].
fn initial_params(order: &ModelOrder) -> Vec<f64> {
    let block = |len: usize| (0..len).map(|i| 0.1 / (i + 1) as f64);
    block(order.p)
        .chain(block(order.q))
        .chain(block(order.cap_p))
        .chain(block(order.cap_q))
        .collect()
}

/// Multiply out the non-seasonal and seasonal AR and MA polynomials.
///
/// AR is returned as `1 - phi_1 B - ...` and MA as `1 + theta_1 B + ...`,
/// both with the leading 1.
fn expand_polynomials(order: &ModelOrder, params: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let (ar, rest) = params.split_at(order.p);
    let (ma, rest) = rest.split_at(order.q);
    let (seasonal_ar, seasonal_ma) = rest.split_at(order.cap_p);

    let lag_poly = |coefs: &[f64], sign: f64, spacing: usize| {
        let mut poly = vec![0.0; coefs.len() * spacing + 1];
        poly[0] = 1.0;
        for (i, c) in coefs.iter().enumerate() {
            poly[(i + 1) * spacing] = sign * c;
        }
        poly
    };

    let ar_poly = poly_mul(
        &lag_poly(ar, -1.0, 1),
        &lag_poly(seasonal_ar, -1.0, SEASONAL_PERIOD),
    );
    let ma_poly = poly_mul(
        &lag_poly(ma, 1.0, 1),
        &lag_poly(seasonal_ma, 1.0, SEASONAL_PERIOD),
    );
    (ar_poly, ma_poly)
}

/// Innovations of an ARMA process with zero pre-sample values:
/// `e[t] = sum_i ar[i] u[t - i] - sum_{j >= 1} ma[j] e[t - j]`.
fn innovations(u: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut e = vec![0.0; u.len()];
    for t in 0..u.len() {
        let mut value = 0.0;
        for (i, a) in ar.iter().enumerate().take(t + 1) {
            value += a * u[t - i];
        }
        for (j, m) in ma.iter().enumerate().skip(1).take(t) {
            value -= m * e[t - j];
        }
        e[t] = value;
    }
    e
}

/// A fitted regression with seasonal ARIMA errors.
#[derive(Debug, Clone)]
pub struct RegressionArima {
    order: ModelOrder,
    regressors: Vec<String>,
    beta: Vec<f64>,
    constant: Option<f64>,
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
    ar_poly: Vec<f64>,
    ma_poly: Vec<f64>,
    sigma2: f64,
    loglik: f64,
    aic: f64,
    aicc: f64,
    bic: f64,
    n_obs: usize,
    num_params: usize,
    residuals: Vec<f64>,
    differenced_errors: Vec<f64>,
    errors: Vec<f64>,
}

impl RegressionArima {
    /// Fit exactly `order` to `y` with the given regressor columns.
    ///
    /// `columns` must follow the order of `ctx.subset`.
    pub fn estimate(
        y: &[f64],
        columns: &[&[f64]],
        order: ModelOrder,
        ctx: &FitContext<'_>,
    ) -> Result<Self> {
        Regression::prepare(y, columns, order, ctx)?.fit_arma(order, ctx)
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Regressor names, in coefficient order.
    pub fn regressors(&self) -> &[String] {
        &self.regressors
    }

    /// Regression coefficients, parallel to [`Self::regressors`].
    pub fn regression_coefficients(&self) -> &[f64] {
        &self.beta
    }

    /// Coefficient of a named regressor.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.regressors
            .iter()
            .position(|r| r == name)
            .map(|i| self.beta[i])
    }

    /// Mean (no differencing) or drift (one difference), when included.
    pub fn constant(&self) -> Option<f64> {
        self.constant
    }

    /// Non-seasonal AR coefficients.
    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    /// Non-seasonal MA coefficients.
    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    pub fn seasonal_ar(&self) -> &[f64] {
        &self.seasonal_ar
    }

    pub fn seasonal_ma(&self) -> &[f64] {
        &self.seasonal_ma
    }

    /// Innovation variance.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn loglik(&self) -> f64 {
        self.loglik
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn aicc(&self) -> f64 {
        self.aicc
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Observations entering the likelihood.
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Parameter count used by the information criteria.
    pub fn num_params(&self) -> usize {
        self.num_params
    }

    /// One-step innovations over the differenced window.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Point forecasts and their standard errors for the periods right after
    /// the fitted window.
    ///
    /// `future` holds one column per regressor, in coefficient order, each
    /// covering at least `horizon` periods.
    pub fn forecast(&self, future: &[&[f64]], horizon: usize) -> Result<Vec<(f64, f64)>> {
        if future.len() != self.beta.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.beta.len(),
                got: future.len(),
            });
        }
        if let Some(available) = future.iter().map(|c| c.len()).min() {
            if available < horizon {
                return Err(ForecastError::HorizonMismatch {
                    requested: horizon,
                    available,
                });
            }
        }

        let mut u = self.differenced_errors.clone();
        let mut e = self.residuals.clone();
        let mut differenced = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let t = u.len();
            let mut value = 0.0;
            for (i, a) in self.ar_poly.iter().enumerate().skip(1).take(t) {
                value -= a * u[t - i];
            }
            for (j, m) in self.ma_poly.iter().enumerate().skip(1).take(t) {
                value += m * e[t - j];
            }
            u.push(value);
            e.push(0.0);
            differenced.push(value + self.constant.unwrap_or(0.0));
        }

        let errors = integrate(
            &self.errors,
            &differenced,
            self.order.d,
            self.order.cap_d,
            SEASONAL_PERIOD,
        );

        let psi = self.psi_weights(horizon);
        let mut cumulative = 0.0;
        Ok(errors
            .iter()
            .enumerate()
            .map(|(h, error)| {
                let regression: f64 = future.iter().zip(&self.beta).map(|(c, b)| c[h] * b).sum();
                cumulative += psi[h] * psi[h];
                (regression + error, (self.sigma2 * cumulative).sqrt())
            })
            .collect())
    }

    /// Psi weights of the integrated ARMA error process, psi_0 = 1.
    fn psi_weights(&self, len: usize) -> Vec<f64> {
        let full_ar = poly_mul(
            &self.ar_poly,
            &differencing_polynomial(self.order.d, self.order.cap_d, SEASONAL_PERIOD),
        );
        let mut psi: Vec<f64> = Vec::with_capacity(len);
        for j in 0..len {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut value = self.ma_poly.get(j).copied().unwrap_or(0.0);
            for (i, a) in full_ar.iter().enumerate().skip(1).take(j) {
                value -= a * psi[j - i];
            }
            psi.push(value);
        }
        psi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn gaussian(rng: &mut StdRng) -> f64 {
        let u1: f64 = rng.gen_range(1e-12..1.0);
        let u2: f64 = rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn context<'a>(
        subset: &'a FeatureSubset,
        optimizer: &'a NelderMeadConfig,
        len: usize,
    ) -> FitContext<'a> {
        FitContext {
            subset,
            window: FitWindow::full(len),
            optimizer,
            timeout: None,
            collinearity_tolerance: 1e-8,
        }
    }

    #[test]
    fn aicc_penalizes_parameters() {
        assert!(aicc(-50.0, 2, 40).unwrap() < aicc(-50.0, 3, 40).unwrap());
        assert!(aicc(-50.0, 3, 4).is_none());
        assert!(aicc(f64::NAN, 1, 40).is_none());
    }

    #[test]
    fn recovers_regression_coefficient() {
        let mut rng = StdRng::seed_from_u64(7);
        let x: Vec<f64> = (0..60).map(|_| gaussian(&mut rng) * 3.0).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|v| 10.0 + 2.5 * v + 0.2 * gaussian(&mut rng))
            .collect();

        let subset = FeatureSubset::new(["x"]);
        let optimizer = NelderMeadConfig::default();
        let ctx = context(&subset, &optimizer, y.len());
        let order = ModelOrder::new(0, 0, 0).with_drift(true);
        let model = RegressionArima::estimate(&y, &[&x], order, &ctx).unwrap();

        assert_relative_eq!(model.coefficient("x").unwrap(), 2.5, epsilon = 0.05);
        assert_relative_eq!(model.constant().unwrap(), 10.0, epsilon = 0.1);
        assert_eq!(model.n_obs(), 60);
        assert_eq!(model.num_params(), 3);
        assert!(model.aicc() > model.aic());
        assert!(model.bic().is_finite());
    }

    #[test]
    fn recovers_ar_coefficient() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut y = vec![0.0; 240];
        for t in 1..y.len() {
            y[t] = 0.6 * y[t - 1] + gaussian(&mut rng);
        }

        let subset = FeatureSubset::empty();
        let optimizer = NelderMeadConfig::default();
        let ctx = context(&subset, &optimizer, y.len());
        let model = RegressionArima::estimate(&y, &[], ModelOrder::new(1, 0, 0), &ctx).unwrap();

        assert_relative_eq!(model.ar()[0], 0.6, epsilon = 0.12);
        assert!(model.ma().is_empty());
        assert_relative_eq!(model.sigma2(), 1.0, epsilon = 0.25);
    }

    #[test]
    fn constant_regressor_is_rank_deficient() {
        let y: Vec<f64> = (0..40).map(|i| (i as f64 * 0.4).sin()).collect();
        let flat = vec![1.0; 40];
        let varying: Vec<f64> = (0..40).map(|i| (i as f64 * 0.9).cos()).collect();

        let subset = FeatureSubset::new(["flat", "varying"]);
        let optimizer = NelderMeadConfig::default();
        let ctx = context(&subset, &optimizer, y.len());
        let err = RegressionArima::estimate(&y, &[&flat, &varying], ModelOrder::new(0, 0, 0), &ctx)
            .unwrap_err();
        assert_eq!(err.degenerate_features(), &["flat".to_string()]);
    }

    #[test]
    fn regressor_with_large_offset_is_estimable() {
        let mut rng = StdRng::seed_from_u64(23);
        let x: Vec<f64> = (0..72).map(|_| 1000.0 + rng.gen_range(-0.01..0.01)).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|v| 5.0 + 500.0 * (v - 1000.0) + 0.05 * gaussian(&mut rng))
            .collect();

        let subset = FeatureSubset::new(["x"]);
        let optimizer = NelderMeadConfig::default();
        let ctx = context(&subset, &optimizer, y.len());
        let order = ModelOrder::new(0, 0, 0).with_drift(true);
        let model = RegressionArima::estimate(&y, &[&x], order, &ctx).unwrap();

        assert_relative_eq!(model.coefficient("x").unwrap(), 500.0, epsilon = 10.0);
        assert!(model.sigma2() < 0.01);
    }

    #[test]
    fn fixed_month_dummy_is_rank_deficient_without_seasonal_differencing() {
        let mut rng = StdRng::seed_from_u64(29);
        let december: Vec<f64> = (0..72).map(|i| if i % 12 == 11 { 1.0 } else { 0.0 }).collect();
        let driver: Vec<f64> = (0..72).map(|_| rng.gen_range(0.0..3.0)).collect();
        let y: Vec<f64> = (0..72)
            .map(|i| 20.0 + 2.0 * driver[i] + 6.0 * december[i] + 0.1 * gaussian(&mut rng))
            .collect();

        let subset = FeatureSubset::new(["december", "driver"]);
        let optimizer = NelderMeadConfig::default();
        let ctx = context(&subset, &optimizer, y.len());
        for order in [
            ModelOrder::new(0, 0, 0).with_drift(true),
            ModelOrder::new(1, 1, 0),
            ModelOrder::new(0, 0, 0).seasonal(0, 1, 0),
        ] {
            let err = RegressionArima::estimate(&y, &[&december, &driver], order, &ctx)
                .unwrap_err();
            assert_eq!(err.degenerate_features(), &["december".to_string()], "{}", order);
        }

        // A dummy that changes month part-way is not purely seasonal.
        let moved: Vec<f64> = (0..72)
            .map(|i| {
                let active = if i < 48 { 11 } else { 10 };
                if i % 12 == active {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        let subset = FeatureSubset::new(["moved"]);
        let ctx = context(&subset, &optimizer, y.len());
        assert!(RegressionArima::estimate(&y, &[&moved], ModelOrder::new(0, 0, 0), &ctx).is_ok());
    }

    #[test]
    fn truncated_search_is_non_convergence() {
        let mut rng = StdRng::seed_from_u64(31);
        let mut y = vec![0.0; 120];
        let mut previous = 0.0;
        for t in 1..y.len() {
            let e = gaussian(&mut rng);
            y[t] = 0.5 * y[t - 1] + e + 0.3 * previous;
            previous = e;
        }

        let subset = FeatureSubset::empty();
        let optimizer = NelderMeadConfig::default().with_max_iter(1);
        let ctx = context(&subset, &optimizer, y.len());
        let order = ModelOrder::new(1, 0, 1);
        assert_eq!(
            RegressionArima::estimate(&y, &[], order, &ctx).unwrap_err(),
            ForecastError::NonConvergence {
                subset: "{}".to_string(),
                order: order.to_string(),
                iterations: 1
            }
        );

        // Without ARMA terms the optimizer is never run.
        assert!(RegressionArima::estimate(&y, &[], ModelOrder::new(0, 0, 0), &ctx).is_ok());
    }

    #[test]
    fn short_window_is_insufficient() {
        let y = vec![1.0, 2.0, 0.5, 1.5, 2.5, 1.0, 0.0, 3.0, 1.0, 2.0, 0.5, 1.0, 2.0, 1.0];
        let subset = FeatureSubset::empty();
        let optimizer = NelderMeadConfig::default();
        let ctx = context(&subset, &optimizer, y.len());
        let order = ModelOrder::new(0, 0, 0).seasonal(0, 1, 0);
        assert_eq!(
            RegressionArima::estimate(&y, &[], order, &ctx).unwrap_err(),
            ForecastError::InsufficientData { needed: 24, got: 14 }
        );
    }

    #[test]
    fn random_walk_forecast_is_flat_with_growing_spread() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut y = vec![5.0; 80];
        for t in 1..y.len() {
            y[t] = y[t - 1] + gaussian(&mut rng);
        }
        let subset = FeatureSubset::empty();
        let optimizer = NelderMeadConfig::default();
        let ctx = context(&subset, &optimizer, y.len());
        let model = RegressionArima::estimate(&y, &[], ModelOrder::new(0, 1, 0), &ctx).unwrap();

        let path = model.forecast(&[], 4).unwrap();
        let last = y[y.len() - 1];
        for (h, (point, se)) in path.iter().enumerate() {
            assert_relative_eq!(*point, last, epsilon = 1e-9);
            assert_relative_eq!(*se, (model.sigma2() * (h + 1) as f64).sqrt(), epsilon = 1e-9);
        }
    }

    #[test]
    fn forecast_adds_future_regression_effect() {
        let mut rng = StdRng::seed_from_u64(5);
        let x: Vec<f64> = (0..50).map(|i| (i % 5) as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 4.0 * v + 0.1 * gaussian(&mut rng)).collect();
        let subset = FeatureSubset::new(["x"]);
        let optimizer = NelderMeadConfig::default();
        let ctx = context(&subset, &optimizer, y.len());
        let order = ModelOrder::new(0, 0, 0).with_drift(true);
        let model = RegressionArima::estimate(&y, &[&x], order, &ctx).unwrap();

        let future = vec![0.0, 10.0];
        let path = model.forecast(&[&future], 2).unwrap();
        let beta = model.coefficient("x").unwrap();
        assert_relative_eq!(path[1].0 - path[0].0, 10.0 * beta, epsilon = 1e-9);

        assert!(matches!(
            model.forecast(&[&future], 3),
            Err(ForecastError::HorizonMismatch { requested: 3, available: 2 })
        ));
        assert!(matches!(
            model.forecast(&[], 2),
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn psi_weights_of_ar1() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut y = vec![0.0; 120];
        for t in 1..y.len() {
            y[t] = 0.5 * y[t - 1] + gaussian(&mut rng);
        }
        let subset = FeatureSubset::empty();
        let optimizer = NelderMeadConfig::default();
        let ctx = context(&subset, &optimizer, y.len());
        let model = RegressionArima::estimate(&y, &[], ModelOrder::new(1, 0, 0), &ctx).unwrap();

        let phi = model.ar()[0];
        let psi = model.psi_weights(4);
        for (j, w) in psi.iter().enumerate() {
            assert_relative_eq!(*w, phi.powi(j as i32), epsilon = 1e-12);
        }
    }

    #[test]
    fn seasonal_polynomials_expand_multiplicatively() {
        let order = ModelOrder::new(1, 0, 1).seasonal(1, 0, 1);
        let (ar, ma) = expand_polynomials(&order, &[0.5, 0.3, 0.4, -0.2]);
        assert_eq!(ar.len(), 14);
        assert_relative_eq!(ar[1], -0.5);
        assert_relative_eq!(ar[12], -0.4);
        assert_relative_eq!(ar[13], 0.2);
        assert_relative_eq!(ma[1], 0.3);
        assert_relative_eq!(ma[12], -0.2);
        assert_relative_eq!(ma[13], -0.06);
    }

    #[test]
    fn innovations_invert_an_ma1_filter() {
        let e: Vec<f64> = (0..20).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        let u: Vec<f64> = (0..20)
            .map(|t| e[t] + if t > 0 { 0.4 * e[t - 1] } else { 0.0 })
            .collect();
        let recovered = innovations(&u, &[1.0], &[1.0, 0.4]);
        for (a, b) in recovered.iter().zip(&e) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn expired_deadline_times_out() {
        let y: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin()).collect();
        let subset = FeatureSubset::empty();
        let optimizer = NelderMeadConfig::default().with_deadline(Some(Instant::now()));
        let mut ctx = context(&subset, &optimizer, y.len());
        ctx.timeout = Some(Duration::from_millis(1));
        assert_eq!(
            RegressionArima::estimate(&y, &[], ModelOrder::new(1, 0, 0), &ctx).unwrap_err(),
            ForecastError::FitTimeout {
                subset: "{}".to_string(),
                millis: 1
            }
        );
    }
}
