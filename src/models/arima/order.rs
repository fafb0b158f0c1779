//! Seasonal ARIMA order specification.

use crate::core::MONTHS_PER_YEAR;
use crate::error::{ForecastError, Result};
use std::fmt;

/// Seasonal period of every model in this crate.
pub const SEASONAL_PERIOD: usize = MONTHS_PER_YEAR;

/// SARIMA(p, d, q)(P, D, Q)\[12\] order plus the drift flag.
///
/// With no differencing (`d + D == 0`) the flag includes a mean; with one
/// difference it includes a drift, a constant in the differenced series.
/// Drift is not defined for two or more differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelOrder {
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    /// Seasonal AR order.
    pub cap_p: usize,
    /// Seasonal differencing order.
    pub cap_d: usize,
    /// Seasonal MA order.
    pub cap_q: usize,
    /// Include a mean (undifferenced) or drift (differenced once).
    pub drift: bool,
}

impl ModelOrder {
    /// Non-seasonal ARIMA(p, d, q) without drift.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            cap_p: 0,
            cap_d: 0,
            cap_q: 0,
            drift: false,
        }
    }

    /// Set the seasonal (P, D, Q) part.
    pub fn seasonal(mut self, cap_p: usize, cap_d: usize, cap_q: usize) -> Self {
        self.cap_p = cap_p;
        self.cap_d = cap_d;
        self.cap_q = cap_q;
        self
    }

    pub fn with_drift(mut self, drift: bool) -> Self {
        self.drift = drift;
        self
    }

    /// Total differences, regular and seasonal.
    pub fn total_differences(&self) -> usize {
        self.d + self.cap_d
    }

    /// Whether a mean/drift may be included for this differencing.
    pub fn drift_allowed(&self) -> bool {
        self.total_differences() <= 1
    }

    /// Whether the model carries a constant term in the differenced series.
    pub fn has_constant(&self) -> bool {
        self.drift && self.drift_allowed()
    }

    /// Number of ARMA coefficients, seasonal included.
    pub fn arma_terms(&self) -> usize {
        self.p + self.q + self.cap_p + self.cap_q
    }

    /// Estimated parameters: regressors, ARMA terms, constant and the innovation variance.
    pub fn num_params(&self, regressors: usize) -> usize {
        regressors + self.arma_terms() + usize::from(self.has_constant()) + 1
    }

    /// Observations consumed by differencing.
    pub fn differencing_loss(&self) -> usize {
        self.d + SEASONAL_PERIOD * self.cap_d
    }

    /// Shortest window this order may be fitted on: one seasonal cycle
    /// left after differencing.
    pub fn min_observations(&self) -> usize {
        SEASONAL_PERIOD + self.differencing_loss()
    }

    /// Reject orders that cannot be estimated.
    pub fn validate(&self) -> Result<()> {
        if self.drift && !self.drift_allowed() {
            return Err(ForecastError::InvalidParameter(format!(
                "drift is not defined with {} differences",
                self.total_differences()
            )));
        }
        Ok(())
    }

    /// Same order with different (p, q, P, Q).
    pub(crate) fn with_arma(&self, p: usize, q: usize, cap_p: usize, cap_q: usize) -> Self {
        Self {
            p,
            q,
            cap_p,
            cap_q,
            ..*self
        }
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.cap_p + self.cap_d + self.cap_q > 0 {
            write!(
                f,
                "({},{},{})[{}]",
                self.cap_p, self.cap_d, self.cap_q, SEASONAL_PERIOD
            )?;
        }
        if self.has_constant() {
            let term = if self.total_differences() == 0 {
                "mean"
            } else {
                "drift"
            };
            write!(f, " with {}", term)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_counts() {
        let order = ModelOrder::new(1, 0, 1).seasonal(1, 1, 0).with_drift(true);
        assert_eq!(order.arma_terms(), 3);
        assert!(order.has_constant());
        // 2 regressors + 3 ARMA + drift + variance
        assert_eq!(order.num_params(2), 7);
        assert_eq!(order.differencing_loss(), 12);
        assert_eq!(order.min_observations(), 24);
    }

    #[test]
    fn drift_requires_at_most_one_difference() {
        let order = ModelOrder::new(0, 1, 0).seasonal(0, 1, 0).with_drift(true);
        assert!(!order.has_constant());
        assert!(matches!(
            order.validate(),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(order.with_drift(false).validate().is_ok());
    }

    #[test]
    fn display() {
        assert_eq!(ModelOrder::new(2, 1, 0).to_string(), "ARIMA(2,1,0)");
        assert_eq!(
            ModelOrder::new(1, 0, 0).seasonal(0, 1, 1).to_string(),
            "ARIMA(1,0,0)(0,1,1)[12]"
        );
        assert_eq!(
            ModelOrder::new(1, 0, 0).with_drift(true).to_string(),
            "ARIMA(1,0,0) with mean"
        );
        assert_eq!(
            ModelOrder::new(0, 1, 1).with_drift(true).to_string(),
            "ARIMA(0,1,1) with drift"
        );
    }
}
