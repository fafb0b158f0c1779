//! Numerical utilities shared by the fitter, the forecaster and the pipeline.

pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use metrics::{evaluate_forecast, HoldoutAccuracy};
pub use ols::{ols_fit, residual_ratios, OLSResult};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{mean, population_variance, quantile_normal};
