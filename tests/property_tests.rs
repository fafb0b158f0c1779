//! Property-based tests for the enumerator, the information criterion and
//! the forecaster.

use arimax_select::core::{FeatureMatrix, FeatureSubset, SplitPoint, TimeSeries};
use arimax_select::models::arima::{aicc, ModelOrder};
use arimax_select::selection::{Forecaster, SplitReconciler, SubsetEnumerator};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Reference power set built from bit masks.
fn power_set(names: &[String]) -> BTreeSet<FeatureSubset> {
    (1u32..(1 << names.len()))
        .map(|mask| {
            names
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, name)| name.as_str())
                .collect()
        })
        .collect()
}

fn distinct_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,6}", 0..=max)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

// =============================================================================
// Property: the enumerator yields exactly the non-empty power set
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn enumerator_matches_power_set(names in distinct_names(12)) {
        let enumerator = SubsetEnumerator::new(names.clone()).unwrap();
        prop_assert_eq!(enumerator.len(), (1usize << names.len()) - 1);

        let produced: Vec<FeatureSubset> = enumerator.collect();
        let distinct: BTreeSet<FeatureSubset> = produced.iter().cloned().collect();
        prop_assert_eq!(distinct.len(), produced.len());
        prop_assert_eq!(distinct, power_set(&names));

        // Canonical order: by size, then lexicographically.
        prop_assert!(produced.windows(2).all(|w| w[0] < w[1]));
    }
}

// =============================================================================
// Property: AICc penalizes every extra parameter
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn aicc_increases_with_parameter_count(
        loglik in -1e4..1e4_f64,
        k in 1usize..20,
        extra in 20usize..200,
    ) {
        let n = k + extra;
        let fewer = aicc(loglik, k, n).unwrap();
        let more = aicc(loglik, k + 1, n).unwrap();
        prop_assert!(more > fewer);
    }

    #[test]
    fn aicc_undefined_without_spare_observations(loglik in -1e4..1e4_f64, k in 1usize..20) {
        prop_assert!(aicc(loglik, k, k + 1).is_none());
        prop_assert!(aicc(f64::NAN, k, k + 10).is_none());
    }
}

// =============================================================================
// Property: a forecast has one row per requested period
// =============================================================================

fn fixture(seed: u64) -> (TimeSeries, FeatureMatrix) {
    let n = 72;
    let driver: Vec<f64> = (0..n)
        .map(|i| 3.0 * (0.7 * i as f64 + seed as f64).sin() + (1.3 * i as f64).cos())
        .collect();
    let values: Vec<f64> = (0..n)
        .map(|i| {
            80.0 + 1.5 * driver[i]
                + 4.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin()
                + ((i * 13 % 7) as f64) * 0.1
        })
        .collect();
    let series = TimeSeries::from_year_month(2018, 1, values).unwrap();
    let features = FeatureMatrix::new(n).with_feature("driver", driver).unwrap();
    (series, features)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn forecast_length_matches_horizon(
        seed in 0u64..50,
        train in 36usize..60,
        horizon in 1usize..12,
    ) {
        let (series, features) = fixture(seed);
        let split = SplitPoint::new(train, series.len()).unwrap();
        let reconciled = SplitReconciler::default()
            .reconcile(
                &series,
                &features,
                &FeatureSubset::new(["driver"]),
                ModelOrder::new(1, 0, 0).seasonal(0, 1, 0),
                split,
            )
            .unwrap();
        let future = features.slice(split.test_window(series.len()).unwrap()).unwrap();

        let forecast = Forecaster::default().forecast(&reconciled, &future, horizon).unwrap();
        prop_assert_eq!(forecast.horizon(), horizon);
        for (h, point) in forecast.iter().enumerate() {
            prop_assert_eq!(point.period, train + h);
            prop_assert!(point.point.is_finite());
            prop_assert!(point.lower <= point.upper);
        }
    }
}
