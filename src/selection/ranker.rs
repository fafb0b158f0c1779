//! Ranks every subset of a feature group by AICc, in parallel.

use crate::core::{FeatureGroup, FeatureMatrix, FeatureSubset, FitWindow, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::selection::fitter::{FitResult, FitterConfig, ModelFitter};
use crate::selection::subsets::SubsetEnumerator;
use rayon::iter::{ParallelBridge, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeSet;
use std::iter;
use tracing::{debug, info, warn};

/// Configuration for [`SelectionRanker`].
#[derive(Debug, Clone, Default)]
pub struct RankerConfig {
    /// Settings of every fit in a pass.
    pub fitter: FitterConfig,
    /// Worker threads; defaults to the available cores.
    pub workers: Option<usize>,
}

impl RankerConfig {
    pub fn with_fitter(mut self, fitter: FitterConfig) -> Self {
        self.fitter = fitter;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
}

/// A subset whose fit failed, kept for audit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitFailure {
    pub subset: FeatureSubset,
    pub error: ForecastError,
}

/// Results of one ranking pass, ascending by AICc.
///
/// Ties are broken by parameter count, then by canonical subset order, so
/// the table is identical across runs whatever the thread schedule.
#[derive(Debug, Clone)]
pub struct RankedTable {
    window: FitWindow,
    entries: Vec<FitResult>,
    failures: Vec<FitFailure>,
}

impl RankedTable {
    fn from_outcomes(window: FitWindow, outcomes: Vec<(FeatureSubset, Result<FitResult>)>) -> Self {
        let mut entries = Vec::new();
        let mut failures = Vec::new();
        for (subset, outcome) in outcomes {
            match outcome {
                Ok(fit) => entries.push(fit),
                Err(error) => failures.push(FitFailure { subset, error }),
            }
        }
        entries.sort_by(|a, b| {
            a.aicc()
                .total_cmp(&b.aicc())
                .then_with(|| a.num_params().cmp(&b.num_params()))
                .then_with(|| a.subset().cmp(b.subset()))
        });
        failures.sort_by(|a, b| a.subset.cmp(&b.subset));
        Self {
            window,
            entries,
            failures,
        }
    }

    pub fn window(&self) -> FitWindow {
        self.window
    }

    /// Successful fits, best first.
    pub fn entries(&self) -> &[FitResult] {
        &self.entries
    }

    /// Failed subsets in canonical order.
    pub fn failures(&self) -> &[FitFailure] {
        &self.failures
    }

    /// Minimal-AICc fit.
    pub fn best(&self) -> Option<&FitResult> {
        self.entries.first()
    }

    /// The `n` best fits.
    pub fn top(&self, n: usize) -> &[FitResult] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Number of successful fits.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subsets attempted, successful or not.
    pub fn attempted(&self) -> usize {
        self.entries.len() + self.failures.len()
    }

    /// Rank of a subset among the successful fits, 0 for the best.
    pub fn position(&self, subset: &FeatureSubset) -> Option<usize> {
        self.entries.iter().position(|e| e.subset() == subset)
    }
}

/// Ranking of one primary group.
#[derive(Debug, Clone)]
pub struct GroupRanking {
    pub group: String,
    pub table: RankedTable,
}

/// Outcome of the two-phase refinement.
#[derive(Debug, Clone)]
pub struct Refinement {
    /// First pass: one table per primary group.
    pub primary: Vec<GroupRanking>,
    /// Union of the primary group winners.
    pub base: FeatureSubset,
    /// Second pass: the base alone and layered with each secondary subset.
    pub refinement: RankedTable,
    /// Best entry of the second pass.
    pub winner: FitResult,
}

/// Fits every candidate subset on a bounded worker pool and ranks the results.
pub struct SelectionRanker {
    fitter: ModelFitter,
    pool: ThreadPool,
}

impl SelectionRanker {
    /// Build a ranker and its worker pool.
    pub fn new(config: RankerConfig) -> Result<Self> {
        let workers = config.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("subset-fit-{}", i))
            .build()
            .map_err(|e| ForecastError::ComputationError(format!("worker pool: {}", e)))?;
        Ok(Self {
            fitter: ModelFitter::new(config.fitter),
            pool,
        })
    }

    pub fn fitter(&self) -> &ModelFitter {
        &self.fitter
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Fit and rank every non-empty subset of `group` over `window`.
    pub fn rank(
        &self,
        series: &TimeSeries,
        features: &FeatureMatrix,
        group: &FeatureGroup,
        window: FitWindow,
    ) -> Result<RankedTable> {
        let enumerator = SubsetEnumerator::for_group(group)?;
        debug!(group = group.name(), subsets = enumerator.len(), "ranking group");
        self.rank_subsets(series, features, enumerator, window)
    }

    /// Fit and rank an arbitrary stream of subsets over `window`.
    ///
    /// Inputs are validated up front; per-subset failures are recorded in
    /// the table instead of aborting the pass.
    pub fn rank_subsets<I>(
        &self,
        series: &TimeSeries,
        features: &FeatureMatrix,
        subsets: I,
        window: FitWindow,
    ) -> Result<RankedTable>
    where
        I: Iterator<Item = FeatureSubset> + Send,
    {
        window.check_within(series.len())?;
        if features.len() != series.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: series.len(),
                got: features.len(),
            });
        }

        let fitter = &self.fitter;
        let outcomes: Vec<(FeatureSubset, Result<FitResult>)> = self.pool.install(|| {
            subsets
                .par_bridge()
                .map(|subset| {
                    let outcome = fitter.fit(series, features, &subset, window, None);
                    if let Err(err) = &outcome {
                        debug!(subset = %subset, window = %window, error = %err, "subset failed");
                    }
                    (subset, outcome)
                })
                .collect()
        });

        let table = RankedTable::from_outcomes(window, outcomes);
        for failure in table.failures() {
            if let ForecastError::FitTimeout { millis, .. } = failure.error {
                warn!(subset = %failure.subset, millis = millis as u64, "fit timed out");
            }
        }
        Ok(table)
    }

    /// Two-phase refinement.
    ///
    /// Each primary group is ranked on its own and the winners are united
    /// into a base subset. The base alone and the base layered with every
    /// non-empty subset of `secondary` are then ranked together; the best
    /// of that pass is the winner.
    pub fn refine(
        &self,
        series: &TimeSeries,
        features: &FeatureMatrix,
        primary: &[FeatureGroup],
        secondary: &FeatureGroup,
        window: FitWindow,
    ) -> Result<Refinement> {
        let mut rankings = Vec::with_capacity(primary.len());
        let mut base = FeatureSubset::empty();
        for group in primary {
            let table = self.rank(series, features, group, window)?;
            match table.best() {
                Some(best) => {
                    info!(
                        group = group.name(),
                        subset = %best.subset(),
                        order = %best.order(),
                        aicc = best.aicc(),
                        "group winner"
                    );
                    base = base.union(best.subset());
                }
                None => warn!(
                    group = group.name(),
                    attempted = table.attempted(),
                    "no subset of the group could be fitted"
                ),
            }
            rankings.push(GroupRanking {
                group: group.name().to_string(),
                table,
            });
        }

        let layered: BTreeSet<FeatureSubset> = iter::once(base.clone())
            .chain(SubsetEnumerator::for_group(secondary)?.map(|s| base.union(&s)))
            .collect();
        let refinement = self.rank_subsets(series, features, layered.into_iter(), window)?;

        let winner = refinement
            .best()
            .cloned()
            .ok_or_else(|| ForecastError::NoViableModel {
                window: window.to_string(),
                attempted: refinement.attempted(),
            })?;
        info!(
            subset = %winner.subset(),
            order = %winner.order(),
            aicc = winner.aicc(),
            "refinement winner"
        );

        Ok(Refinement {
            primary: rankings,
            base,
            refinement,
            winner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arima::{AutoOrderConfig, ModelOrder};
    use crate::utils::optimization::NelderMeadConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::Duration;

    fn fixture(n: usize) -> (TimeSeries, FeatureMatrix) {
        let mut rng = StdRng::seed_from_u64(17);
        let price: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..5.0)).collect();
        let promo: Vec<f64> = (0..n).map(|i| if i % 7 == 3 { 1.0 } else { 0.0 }).collect();
        let noise_feature: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let values: Vec<f64> = (0..n)
            .map(|i| {
                200.0 - 6.0 * price[i]
                    + 4.0 * promo[i]
                    + 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).cos()
                    + rng.gen_range(-0.5..0.5)
            })
            .collect();
        let series = TimeSeries::from_year_month(2016, 1, values).unwrap();
        let features = FeatureMatrix::new(n)
            .with_feature("price", price)
            .unwrap()
            .with_feature("promo", promo)
            .unwrap()
            .with_feature("noise", noise_feature)
            .unwrap()
            .with_feature("constant", vec![2.0; n])
            .unwrap();
        (series, features)
    }

    fn ranker() -> SelectionRanker {
        let fitter = FitterConfig::default()
            .with_auto_config(AutoOrderConfig::default().with_max_models(20));
        SelectionRanker::new(RankerConfig::default().with_fitter(fitter).with_workers(2)).unwrap()
    }

    #[test]
    fn rank_orders_by_aicc_and_keeps_failures() {
        let (series, features) = fixture(72);
        let group = FeatureGroup::new("drivers", ["price", "constant"]).unwrap();
        let table = ranker()
            .rank(&series, &features, &group, FitWindow::full(72))
            .unwrap();

        assert_eq!(table.attempted(), 3);
        assert_eq!(table.len(), 1);
        assert_eq!(table.best().unwrap().subset(), &FeatureSubset::new(["price"]));
        assert_eq!(table.failures().len(), 2);
        assert!(table.failures().iter().all(|f| f.error.is_rank_deficiency()));
        assert!(table.failures()[0].subset < table.failures()[1].subset);
    }

    #[test]
    fn ranking_is_deterministic() {
        let (series, features) = fixture(72);
        let group = FeatureGroup::new("drivers", ["price", "promo", "noise"]).unwrap();
        let ranker = ranker();
        let first = ranker
            .rank(&series, &features, &group, FitWindow::full(72))
            .unwrap();
        let second = ranker
            .rank(&series, &features, &group, FitWindow::full(72))
            .unwrap();

        let summary = |t: &RankedTable| -> Vec<(FeatureSubset, f64)> {
            t.entries()
                .iter()
                .map(|e| (e.subset().clone(), e.aicc()))
                .collect()
        };
        assert_eq!(summary(&first), summary(&second));
        assert!(first
            .entries()
            .windows(2)
            .all(|w| w[0].aicc() <= w[1].aicc()));
        assert_eq!(first.top(2).len(), 2.min(first.len()));
        assert_eq!(first.position(first.best().unwrap().subset()), Some(0));
    }

    #[test]
    fn refine_layers_secondary_group_on_primary_winners() {
        let (series, features) = fixture(72);
        let primary = vec![
            FeatureGroup::new("pricing", ["price"]).unwrap(),
            FeatureGroup::new("broken", ["constant"]).unwrap(),
        ];
        let secondary = FeatureGroup::new("events", ["promo", "noise"]).unwrap();
        let outcome = ranker()
            .refine(&series, &features, &primary, &secondary, FitWindow::full(72))
            .unwrap();

        assert_eq!(outcome.primary.len(), 2);
        assert!(outcome.primary[1].table.is_empty());
        assert_eq!(outcome.base, FeatureSubset::new(["price"]));
        // base alone plus three layered subsets
        assert_eq!(outcome.refinement.attempted(), 4);
        assert!(outcome.winner.subset().contains("price"));
        assert_eq!(
            outcome.winner.aicc(),
            outcome.refinement.best().unwrap().aicc()
        );
    }

    #[test]
    fn refine_falls_back_to_no_regressors() {
        let (series, features) = fixture(72);
        let primary = vec![FeatureGroup::new("broken", ["constant"]).unwrap()];
        let secondary = FeatureGroup::new("more", ["constant"]).unwrap();
        let ranker = ranker();
        let outcome = ranker.refine(&series, &features, &primary, &secondary, FitWindow::full(72));
        // The empty base is fitted without regressors, so only the constant layer fails.
        let outcome = outcome.unwrap();
        assert!(outcome.base.is_empty());
        assert!(outcome.winner.subset().is_empty());

        let short = FitWindow::new(0, 10).unwrap();
        assert!(matches!(
            ranker.refine(&series, &features, &primary, &secondary, short),
            Err(ForecastError::NoViableModel { .. })
        ));
    }

    #[test]
    fn timed_out_fits_are_recorded_not_ranked() {
        let (series, features) = fixture(72);
        let fitter = FitterConfig::default().with_timeout(Some(Duration::ZERO));
        let ranker =
            SelectionRanker::new(RankerConfig::default().with_fitter(fitter).with_workers(2))
                .unwrap();
        let group = FeatureGroup::new("drivers", ["price", "promo"]).unwrap();
        let table = ranker
            .rank(&series, &features, &group, FitWindow::full(72))
            .unwrap();

        assert!(table.is_empty());
        assert!(table.best().is_none());
        assert_eq!(table.attempted(), 3);
        assert_eq!(table.failures().len(), 3);
        assert!(table
            .failures()
            .iter()
            .all(|f| matches!(f.error, ForecastError::FitTimeout { .. })));

        let secondary = FeatureGroup::new("events", ["noise"]).unwrap();
        assert_eq!(
            ranker
                .refine(&series, &features, &[group], &secondary, FitWindow::full(72))
                .unwrap_err(),
            ForecastError::NoViableModel {
                window: "[0, 72)".to_string(),
                attempted: 2
            }
        );
    }

    #[test]
    fn non_converged_orders_never_reach_the_table() {
        let (series, features) = fixture(72);
        let fitter = FitterConfig::default()
            .with_auto_config(AutoOrderConfig::default().with_max_models(20))
            .with_optimizer(NelderMeadConfig::default().with_max_iter(1));
        let ranker =
            SelectionRanker::new(RankerConfig::default().with_fitter(fitter).with_workers(2))
                .unwrap();
        let group = FeatureGroup::new("drivers", ["price", "promo"]).unwrap();
        let table = ranker
            .rank(&series, &features, &group, FitWindow::full(72))
            .unwrap();

        // Only orders that skip the optimizer can be fitted.
        assert_eq!(table.attempted(), 3);
        assert_eq!(table.len(), 3);
        assert!(table.entries().iter().all(|e| e.order().arma_terms() == 0));

        // A pinned order with ARMA terms fails and names the iteration cap.
        let pinned = ModelOrder::new(1, 0, 1).seasonal(0, 1, 0);
        let subset = FeatureSubset::new(["price"]);
        assert!(matches!(
            ranker
                .fitter()
                .fit(&series, &features, &subset, FitWindow::full(72), Some(pinned)),
            Err(ForecastError::NonConvergence { iterations: 1, .. })
        ));
    }

    #[test]
    fn invalid_inputs_abort_the_pass() {
        let (series, features) = fixture(72);
        let group = FeatureGroup::new("drivers", ["price"]).unwrap();
        assert!(ranker()
            .rank(&series, &features, &group, FitWindow::new(0, 100).unwrap())
            .is_err());
    }
}
