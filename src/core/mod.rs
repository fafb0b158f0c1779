//! Core data structures: the monthly series, its exogenous features and forecasts.

mod features;
mod forecast;
mod time_series;

pub use features::{FeatureGroup, FeatureMatrix, FeatureSubset};
pub use forecast::{Forecast, ForecastPoint};
pub use time_series::{month_at, FitWindow, SplitPoint, TimeSeries, MONTHS_PER_YEAR};
