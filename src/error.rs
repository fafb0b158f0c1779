//! Error types for the arimax-select library.

use thiserror::Error;

/// Result type alias for selection and forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while fitting, selecting, reconciling or forecasting.
///
/// Variants raised by a single model fit (`RankDeficiency`, `NonConvergence`,
/// `InsufficientData`, `FitTimeout`) are contained by the selection ranker and
/// recorded against the subset that produced them. Reconciliation and
/// forecasting errors are fatal and propagate to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient observations for the requested window or order.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Calendar / period error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// A feature name is not present in the feature matrix.
    #[error("unknown feature '{0}'")]
    UnknownFeature(String),

    /// Regressor matrix is singular or near-singular for the window and order.
    ///
    /// `features` lists the degenerate regressors, most collinear first.
    #[error("rank-deficient regressors {features:?} for {order} over {window}")]
    RankDeficiency {
        features: Vec<String>,
        order: String,
        window: String,
    },

    /// Likelihood optimization did not converge within its iteration budget.
    #[error("optimizer did not converge for {order} on {subset} after {iterations} iterations")]
    NonConvergence {
        subset: String,
        order: String,
        iterations: usize,
    },

    /// A fit exceeded its wall-clock budget.
    #[error("fit of {subset} exceeded its {millis} ms budget")]
    FitTimeout { subset: String, millis: u128 },

    /// The reconciler dropped every feature without obtaining a fit.
    #[error("no viable model: dropped every feature of {subset} under {order} over {window}")]
    Exhaustion {
        subset: String,
        order: String,
        window: String,
    },

    /// A selection pass produced no successful fit.
    #[error("no candidate subset could be fitted over {window} ({attempted} attempted)")]
    NoViableModel { window: String, attempted: usize },

    /// Forecast requested for more periods than the future regressors cover.
    #[error("horizon mismatch: requested {requested} periods, future regressors cover {available}")]
    HorizonMismatch { requested: usize, available: usize },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl ForecastError {
    /// Whether this error is a rank deficiency the reconciler can recover from.
    pub fn is_rank_deficiency(&self) -> bool {
        matches!(self, ForecastError::RankDeficiency { .. })
    }

    /// Degenerate features named by a rank deficiency, most collinear first.
    pub fn degenerate_features(&self) -> &[String] {
        match self {
            ForecastError::RankDeficiency { features, .. } => features,
            _ => &[],
        }
    }
}
