//! Exogenous-subset selection: enumeration, fitting, ranking, reconciliation
//! and forecasting.
//!
//! The usual flow is [`SelectionRanker::refine`] over the full history,
//! [`SplitReconciler::reconcile`] of the winner at a holdout split, then
//! [`Forecaster::forecast`] of the held-out periods. [`SelectionPipeline`]
//! chains the three and scores the result.

pub mod fitter;
pub mod forecaster;
pub mod pipeline;
pub mod ranker;
pub mod reconciler;
pub mod subsets;

pub use fitter::{FitResult, FitterConfig, ModelFitter};
pub use forecaster::{ForecastConfig, Forecaster};
pub use pipeline::{PipelineConfig, PipelineOutcome, SelectionPipeline, SelectionPlan};
pub use ranker::{FitFailure, GroupRanking, RankedTable, RankerConfig, Refinement, SelectionRanker};
pub use reconciler::{DropOrder, DroppedFeature, ReconcileConfig, ReconciledFit, SplitReconciler};
pub use subsets::SubsetEnumerator;
