//! Regression with seasonal ARIMA errors.
//!
//! This module provides:
//! - [`ModelOrder`]: SARIMA(p, d, q)(P, D, Q)\[12\] orders with a drift flag
//! - [`RegressionArima`]: a fitted regression with SARIMA errors and its forecasts
//! - [`search_order`]: automatic order selection by AICc

mod auto;
pub mod diff;
mod model;
mod order;

pub use auto::{compare_fits, search_order, select_differencing, AutoOrderConfig, OrderSearch};
pub use diff::{apply_differencing, difference, integrate, seasonal_difference};
pub use model::{aicc, degenerate_regressors, FitContext, RegressionArima};
pub use order::{ModelOrder, SEASONAL_PERIOD};
