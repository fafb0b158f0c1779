//! Forecast result structure for holding predictions.

use chrono::NaiveDate;

/// One forecast period: point estimate and prediction interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    /// Period offset from the series origin.
    pub period: usize,
    /// Calendar month of the period.
    pub date: NaiveDate,
    /// Point forecast.
    pub point: f64,
    /// Lower prediction bound.
    pub lower: f64,
    /// Upper prediction bound.
    pub upper: f64,
}

/// Out-of-sample forecast over a contiguous run of periods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    points: Vec<ForecastPoint>,
    /// Nominal coverage of the intervals, e.g. 0.95.
    level: f64,
}

impl Forecast {
    /// Create a forecast from its rows.
    pub fn new(points: Vec<ForecastPoint>, level: f64) -> Self {
        Self { points, level }
    }

    /// Number of forecast periods.
    pub fn horizon(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Interval coverage level.
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter()
    }

    /// Point forecasts.
    pub fn point_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.point).collect()
    }

    /// Lower bounds.
    pub fn lower_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.lower).collect()
    }

    /// Upper bounds.
    pub fn upper_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.upper).collect()
    }
}

impl<'a> IntoIterator for &'a Forecast {
    type Item = &'a ForecastPoint;
    type IntoIter = std::slice::Iter<'a, ForecastPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
