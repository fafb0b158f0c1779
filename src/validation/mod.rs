//! Stationarity testing used to pick the differencing order.
//!
//! # Example
//!
//! ```
//! use arimax_select::validation::{kpss_test, ndiffs};
//!
//! let trend: Vec<f64> = (0..100).map(|i| i as f64).collect();
//! assert!(kpss_test(&trend, None).rejects(0.05));
//! assert!(ndiffs(&trend, 0.05, 2) >= 1);
//! ```

pub mod stationarity;

pub use stationarity::{kpss_test, ndiffs, KpssResult};
