//! Automatic seasonal ARIMA order selection for regressions with ARIMA errors.
//!
//! Differencing is fixed first: the seasonal order from the strength of
//! seasonality, then the regular order from repeated KPSS tests, both on the
//! errors of a levels regression so the regressors do not masquerade as
//! trend. The ARMA orders and the drift flag are then searched by AICc,
//! stepwise from a handful of starting models or exhaustively.

use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{nsdiffs, seasonal_difference};
use crate::models::arima::model::{FitContext, Regression, RegressionArima};
use crate::models::arima::order::{ModelOrder, SEASONAL_PERIOD};
use crate::utils::ols::ols_fit;
use crate::validation::ndiffs;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Configuration for the automatic order search.
#[derive(Debug, Clone)]
pub struct AutoOrderConfig {
    /// Maximum non-seasonal AR order to consider.
    pub max_p: usize,
    /// Maximum non-seasonal MA order to consider.
    pub max_q: usize,
    /// Maximum non-seasonal differencing order.
    pub max_d: usize,
    /// Maximum seasonal AR order.
    pub max_cap_p: usize,
    /// Maximum seasonal MA order.
    pub max_cap_q: usize,
    /// Maximum seasonal differencing order.
    pub max_cap_d: usize,
    /// Bound on p + q + P + Q in exhaustive search.
    pub max_order: usize,
    /// Use stepwise search (faster) vs exhaustive.
    pub stepwise: bool,
    /// Stepwise budget of distinct orders fitted.
    pub max_models: usize,
    /// Significance level of the KPSS tests choosing d.
    pub kpss_alpha: f64,
    /// Variance ratio below which seasonal differencing is applied.
    pub seasonal_threshold: f64,
    /// Consider a mean/drift when the differencing allows one.
    pub allow_drift: bool,
}

impl Default for AutoOrderConfig {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_cap_p: 2,
            max_cap_q: 2,
            max_cap_d: 1,
            max_order: 5,
            stepwise: true,
            max_models: 94,
            kpss_alpha: 0.05,
            seasonal_threshold: 0.7,
            allow_drift: true,
        }
    }
}

impl AutoOrderConfig {
    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    /// Set maximum seasonal orders.
    pub fn with_seasonal_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_cap_p = max_p;
        self.max_cap_d = max_d;
        self.max_cap_q = max_q;
        self
    }

    /// Use exhaustive search instead of stepwise.
    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }

    pub fn with_max_models(mut self, max_models: usize) -> Self {
        self.max_models = max_models;
        self
    }

    pub fn with_drift(mut self, allow_drift: bool) -> Self {
        self.allow_drift = allow_drift;
        self
    }

    fn admits(&self, order: &ModelOrder) -> bool {
        order.p <= self.max_p
            && order.q <= self.max_q
            && order.cap_p <= self.max_cap_p
            && order.cap_q <= self.max_cap_q
    }
}

/// Result of an automatic order search.
#[derive(Debug, Clone)]
pub struct OrderSearch {
    /// Minimal-AICc model.
    pub best: RegressionArima,
    /// Every order that fitted, ascending by AICc.
    pub scores: Vec<(ModelOrder, f64)>,
}

/// Preference between two fitted models: lower AICc, then fewer parameters,
/// then fewer non-seasonal ARMA terms, then fewer seasonal ones.
pub fn compare_fits(a: &RegressionArima, b: &RegressionArima) -> Ordering {
    let (oa, ob) = (a.order(), b.order());
    a.aicc()
        .total_cmp(&b.aicc())
        .then_with(|| a.num_params().cmp(&b.num_params()))
        .then_with(|| (oa.p + oa.q).cmp(&(ob.p + ob.q)))
        .then_with(|| (oa.cap_p + oa.cap_q).cmp(&(ob.cap_p + ob.cap_q)))
        .then_with(|| oa.cmp(&ob))
}

/// Choose (d, D) for `y` given its regressors.
pub fn select_differencing(y: &[f64], columns: &[&[f64]], config: &AutoOrderConfig) -> (usize, usize) {
    let errors = if columns.is_empty() {
        y.to_vec()
    } else {
        let ones = vec![1.0; y.len()];
        let mut design: Vec<&[f64]> = vec![&ones];
        design.extend_from_slice(columns);
        ols_fit(y, &design)
            .map(|fit| fit.residuals)
            .unwrap_or_else(|_| y.to_vec())
    };

    let mut cap_d = nsdiffs(
        &errors,
        SEASONAL_PERIOD,
        config.max_cap_d,
        config.seasonal_threshold,
    );
    let mut d = ndiffs(
        &seasonal_difference(&errors, cap_d, SEASONAL_PERIOD),
        config.kpss_alpha,
        config.max_d,
    );

    while SEASONAL_PERIOD + d + SEASONAL_PERIOD * cap_d > y.len() {
        if cap_d > 0 {
            cap_d -= 1;
        } else if d > 0 {
            d -= 1;
        } else {
            break;
        }
    }
    (d, cap_d)
}

/// Search SARIMA orders for `y` with the regressors in `columns`.
pub fn search_order(
    y: &[f64],
    columns: &[&[f64]],
    config: &AutoOrderConfig,
    ctx: &FitContext<'_>,
) -> Result<OrderSearch> {
    let (d, cap_d) = select_differencing(y, columns, config);
    let base = ModelOrder::new(0, d, 0).seasonal(0, cap_d, 0);
    let drift_options: &[bool] = if config.allow_drift && base.drift_allowed() {
        &[true, false]
    } else {
        &[false]
    };

    let mut regressions = Vec::with_capacity(drift_options.len());
    for &drift in drift_options {
        let order = base.with_drift(drift);
        regressions.push((drift, Regression::prepare(y, columns, order, ctx)?));
    }

    let mut search = Search {
        regressions,
        ctx,
        tried: HashMap::new(),
        best: None,
        last_error: None,
    };

    if config.stepwise {
        search.stepwise(base, drift_options, config)?;
    } else {
        search.exhaustive(base, drift_options, config)?;
    }

    let mut scores: Vec<(ModelOrder, f64)> = search
        .tried
        .iter()
        .filter_map(|(order, aicc)| aicc.map(|a| (*order, a)))
        .collect();
    scores.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    match search.best {
        Some(best) => Ok(OrderSearch { best, scores }),
        None => Err(search.last_error.unwrap_or_else(|| {
            ForecastError::ComputationError(format!(
                "no order could be fitted for {} over {}",
                ctx.subset, ctx.window
            ))
        })),
    }
}

struct Search<'a, 'c> {
    regressions: Vec<(bool, Regression)>,
    ctx: &'a FitContext<'c>,
    tried: HashMap<ModelOrder, Option<f64>>,
    best: Option<RegressionArima>,
    last_error: Option<ForecastError>,
}

impl Search<'_, '_> {
    /// Fit `order` unless it was already tried. Only a timeout aborts the search.
    fn evaluate(&mut self, order: ModelOrder) -> Result<()> {
        if self.tried.contains_key(&order) {
            return Ok(());
        }
        if self.ctx.deadline_passed() {
            return Err(self.ctx.timeout_error());
        }
        let Some((_, regression)) = self.regressions.iter().find(|(d, _)| *d == order.drift)
        else {
            return Ok(());
        };

        match regression.fit_arma(order, self.ctx) {
            Ok(model) => {
                debug!(subset = %self.ctx.subset, order = %order, aicc = model.aicc(), "candidate order fitted");
                self.tried.insert(order, Some(model.aicc()));
                let improves = self
                    .best
                    .as_ref()
                    .map_or(true, |best| compare_fits(&model, best) == Ordering::Less);
                if improves {
                    self.best = Some(model);
                }
                Ok(())
            }
            Err(err @ ForecastError::FitTimeout { .. }) => Err(err),
            Err(err) => {
                debug!(subset = %self.ctx.subset, order = %order, error = %err, "candidate order failed");
                self.tried.insert(order, None);
                self.last_error = Some(err);
                Ok(())
            }
        }
    }

    fn best_order(&self) -> Option<ModelOrder> {
        self.best.as_ref().map(|m| m.order())
    }

    fn stepwise(
        &mut self,
        base: ModelOrder,
        drift_options: &[bool],
        config: &AutoOrderConfig,
    ) -> Result<()> {
        const STARTS: [(usize, usize, usize, usize); 4] =
            [(2, 2, 1, 1), (0, 0, 0, 0), (1, 0, 1, 0), (0, 1, 0, 1)];

        let drift = drift_options[0];
        for &(p, q, cap_p, cap_q) in &STARTS {
            let order = base
                .with_arma(
                    p.min(config.max_p),
                    q.min(config.max_q),
                    cap_p.min(config.max_cap_p),
                    cap_q.min(config.max_cap_q),
                )
                .with_drift(drift);
            self.evaluate(order)?;
        }

        while self.tried.len() < config.max_models {
            let Some(current) = self.best_order() else {
                break;
            };
            let mut moved = false;
            for candidate in neighbours(&current, drift_options, config) {
                if self.tried.len() >= config.max_models {
                    break;
                }
                self.evaluate(candidate)?;
                if self.best_order() != Some(current) {
                    moved = true;
                    break;
                }
            }
            if !moved {
                break;
            }
        }
        Ok(())
    }

    fn exhaustive(
        &mut self,
        base: ModelOrder,
        drift_options: &[bool],
        config: &AutoOrderConfig,
    ) -> Result<()> {
        for p in 0..=config.max_p {
            for q in 0..=config.max_q {
                for cap_p in 0..=config.max_cap_p {
                    for cap_q in 0..=config.max_cap_q {
                        if p + q + cap_p + cap_q > config.max_order {
                            continue;
                        }
                        for &drift in drift_options {
                            self.evaluate(base.with_arma(p, q, cap_p, cap_q).with_drift(drift))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Orders one step away from `order`: each ARMA order moved by one, p and q
/// together, P and Q together, and the drift flag toggled.
fn neighbours(order: &ModelOrder, drift_options: &[bool], config: &AutoOrderConfig) -> Vec<ModelOrder> {
    const STEPS: [(i64, i64, i64, i64); 12] = [
        (1, 0, 0, 0),
        (-1, 0, 0, 0),
        (0, 1, 0, 0),
        (0, -1, 0, 0),
        (0, 0, 1, 0),
        (0, 0, -1, 0),
        (0, 0, 0, 1),
        (0, 0, 0, -1),
        (1, 1, 0, 0),
        (-1, -1, 0, 0),
        (0, 0, 1, 1),
        (0, 0, -1, -1),
    ];
    let shift = |value: usize, by: i64| -> Option<usize> {
        usize::try_from(value as i64 + by).ok()
    };

    let mut out: Vec<ModelOrder> = STEPS
        .iter()
        .filter_map(|&(dp, dq, dcp, dcq)| {
            Some(order.with_arma(
                shift(order.p, dp)?,
                shift(order.q, dq)?,
                shift(order.cap_p, dcp)?,
                shift(order.cap_q, dcq)?,
            ))
        })
        .filter(|o| config.admits(o))
        .collect();
    if drift_options.len() > 1 {
        out.push(order.with_drift(!order.drift));
    }
    out
}
