//! Monthly time series, fit windows and train/test split points.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate};
use std::fmt;

/// Seasonal period of a monthly series.
pub const MONTHS_PER_YEAR: usize = 12;

/// An immutable, gap-free monthly series.
///
/// Observations are addressed by their integer period offset from the
/// origin month: period 0 is the origin, period 12 the same month one year
/// later.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    origin: NaiveDate,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a monthly series starting at the month containing `origin`.
    ///
    /// Values must already be imputed: NaN or infinite values are rejected.
    pub fn monthly(origin: NaiveDate, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }
        let origin = origin.with_day(1).ok_or_else(|| {
            ForecastError::TimestampError(format!("cannot anchor {} to its month", origin))
        })?;

        Ok(Self { origin, values })
    }

    /// Create a monthly series whose first observation is `year`-`month`.
    pub fn from_year_month(year: i32, month: u32, values: Vec<f64>) -> Result<Self> {
        let origin = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            ForecastError::TimestampError(format!("invalid year/month {}-{}", year, month))
        })?;
        Self::monthly(origin, values)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First month of the series.
    pub fn origin(&self) -> NaiveDate {
        self.origin
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Values inside a window.
    pub fn window_values(&self, window: FitWindow) -> Result<&[f64]> {
        window.check_within(self.len())?;
        Ok(&self.values[window.start..window.end])
    }
}

/// The month `period` months after `origin`. Periods past the end of a
/// series are allowed so forecast rows can be dated.
pub fn month_at(origin: NaiveDate, period: usize) -> Result<NaiveDate> {
    let out_of_range =
        || ForecastError::TimestampError(format!("period {} out of calendar range", period));
    let months = u32::try_from(period).map_err(|_| out_of_range())?;
    origin
        .checked_add_months(Months::new(months))
        .ok_or_else(out_of_range)
}

/// Half-open period range `[start, end)` a model is fitted over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FitWindow {
    start: usize,
    end: usize,
}

impl FitWindow {
    /// Create a window; it must contain at least one period.
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if end <= start {
            return Err(ForecastError::InvalidParameter(format!(
                "window end {} must be after start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// The window covering every period of a series of length `len`.
    pub fn full(len: usize) -> Self {
        Self { start: 0, end: len }
    }

    /// First period inside the window.
    pub fn start(&self) -> usize {
        self.start
    }

    /// First period past the window.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail unless the window lies inside `0..len` and is non-empty.
    pub fn check_within(&self, len: usize) -> Result<()> {
        if self.is_empty() {
            return Err(ForecastError::InvalidParameter(format!(
                "empty window {}",
                self
            )));
        }
        if self.end > len {
            return Err(ForecastError::IndexOutOfBounds {
                index: self.end - 1,
                size: len,
            });
        }
        Ok(())
    }
}

impl fmt::Display for FitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Chronological boundary between the training prefix and the held-out suffix.
///
/// The index is the first held-out period, so it equals the training length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SplitPoint(usize);

impl SplitPoint {
    /// Split a series of `series_len` periods at `index`; both sides must be non-empty.
    pub fn new(index: usize, series_len: usize) -> Result<Self> {
        if index == 0 || index >= series_len {
            return Err(ForecastError::InvalidParameter(format!(
                "split point {} must fall strictly inside a series of {} periods",
                index, series_len
            )));
        }
        Ok(Self(index))
    }

    /// Hold out the last `holdout` periods.
    pub fn holdout(series_len: usize, holdout: usize) -> Result<Self> {
        Self::new(series_len.saturating_sub(holdout), series_len)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    /// Training prefix `[0, index)`.
    pub fn train_window(&self) -> FitWindow {
        FitWindow {
            start: 0,
            end: self.0,
        }
    }

    /// Held-out suffix `[index, series_len)`.
    pub fn test_window(&self, series_len: usize) -> Result<FitWindow> {
        FitWindow::new(self.0, series_len)
    }
}
