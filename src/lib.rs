//! # arimax-select
//!
//! Exhaustive exogenous-subset selection for monthly regression models with
//! seasonal ARIMA errors.
//!
//! Every non-empty subset of each candidate feature group is fitted over a
//! window and ranked by AICc. Group winners are combined and refined with a
//! secondary group, the winning specification is refitted on a training
//! prefix (dropping features that turn degenerate there), and the refit
//! produces interval forecasts for the held-out periods.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod models;
pub mod selection;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{
        FeatureGroup, FeatureMatrix, FeatureSubset, FitWindow, Forecast, SplitPoint, TimeSeries,
    };
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::arima::ModelOrder;
    pub use crate::selection::{
        Forecaster, ModelFitter, SelectionPipeline, SelectionPlan, SelectionRanker,
        SplitReconciler,
    };
    pub use crate::utils::{evaluate_forecast, HoldoutAccuracy};
}
