//! Selection, reconciliation, forecast and scoring in one run.

use crate::core::{FeatureGroup, FeatureMatrix, FitWindow, Forecast, SplitPoint, TimeSeries};
use crate::error::Result;
use crate::selection::forecaster::{ForecastConfig, Forecaster};
use crate::selection::ranker::{RankerConfig, Refinement, SelectionRanker};
use crate::selection::reconciler::{DropOrder, ReconcileConfig, ReconciledFit, SplitReconciler};
use crate::utils::metrics::{evaluate_forecast, HoldoutAccuracy};
use tracing::info;

/// Feature groups and the holdout split for a pipeline run.
#[derive(Debug, Clone)]
pub struct SelectionPlan {
    /// Groups ranked independently in the first pass.
    pub primary: Vec<FeatureGroup>,
    /// Group layered on the primary winners in the second pass.
    pub secondary: FeatureGroup,
    /// First held-out period.
    pub split: SplitPoint,
}

/// Configuration for [`SelectionPipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub ranker: RankerConfig,
    pub drop_order: DropOrder,
    pub forecast: ForecastConfig,
}

impl PipelineConfig {
    pub fn with_ranker(mut self, ranker: RankerConfig) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_drop_order(mut self, drop_order: DropOrder) -> Self {
        self.drop_order = drop_order;
        self
    }

    pub fn with_forecast(mut self, forecast: ForecastConfig) -> Self {
        self.forecast = forecast;
        self
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Both ranking passes over the full history.
    pub selection: Refinement,
    /// The winner refitted on the training prefix.
    pub reconciled: ReconciledFit,
    /// Forecast of the held-out periods.
    pub forecast: Forecast,
    /// Forecast scored against the held-out actuals.
    pub accuracy: HoldoutAccuracy,
}

/// Runs the whole selection workflow against a holdout split.
pub struct SelectionPipeline {
    ranker: SelectionRanker,
    reconciler: SplitReconciler,
    forecaster: Forecaster,
}

impl SelectionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let reconcile = ReconcileConfig::default()
            .with_fitter(config.ranker.fitter.clone())
            .with_drop_order(config.drop_order);
        Ok(Self {
            ranker: SelectionRanker::new(config.ranker)?,
            reconciler: SplitReconciler::new(reconcile),
            forecaster: Forecaster::new(config.forecast),
        })
    }

    pub fn ranker(&self) -> &SelectionRanker {
        &self.ranker
    }

    /// Select on the full history, refit the winner before `plan.split`,
    /// then forecast and score the periods from the split onwards.
    pub fn run(
        &self,
        series: &TimeSeries,
        features: &FeatureMatrix,
        plan: &SelectionPlan,
    ) -> Result<PipelineOutcome> {
        let full = FitWindow::full(series.len());
        let selection =
            self.ranker
                .refine(series, features, &plan.primary, &plan.secondary, full)?;

        let reconciled = self.reconciler.reconcile(
            series,
            features,
            selection.winner.subset(),
            selection.winner.order(),
            plan.split,
        )?;

        let test = plan.split.test_window(series.len())?;
        let future = features.slice(test)?;
        let forecast = self.forecaster.forecast(&reconciled, &future, test.len())?;

        let training = series.window_values(plan.split.train_window())?;
        let actual = series.window_values(test)?;
        let accuracy = evaluate_forecast(training, actual, &forecast)?;

        info!(
            subset = %reconciled.subset_used(),
            order = %reconciled.order(),
            dropped = reconciled.dropped().len(),
            rmse = accuracy.rmse,
            coverage = accuracy.coverage,
            "holdout evaluated"
        );

        Ok(PipelineOutcome {
            selection,
            reconciled,
            forecast,
            accuracy,
        })
    }
}
