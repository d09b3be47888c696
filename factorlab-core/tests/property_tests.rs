//! Property tests for combinator laws and primitive invariants.
//!
//! Uses proptest to verify:
//! 1. Composition: compose(f, g)(x) == g(f(x)); freeze(f, opts)(x) == f(x, opts)
//! 2. Lag: output at t equals input at t-k; the first k rows are missing
//! 3. Hold: an origin value stays in effect for the whole holding window
//! 4. Selection: quantiles(0, 1) keeps every available asset; quantiles(q, q) keeps none
//! 5. Weighting: equal weights are 1/n and sum to one per invested row
//! 6. Evaluation: all-zero weights earn exactly zero

use chrono::NaiveDate;
use proptest::prelude::*;

use factorlab_core::matrix::Matrix;
use factorlab_core::pipeline::{compose, freeze, steps, Step};
use factorlab_core::transforms::{self, Aggregation};
use factorlab_core::Cell;

const ASSETS: [&str; 5] = ["A", "B", "C", "D", "E"];

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        1 => Just(None),
        6 => (1.0..500.0_f64).prop_map(|v| Some((v * 100.0).round() / 100.0)),
    ]
}

/// A matrix of 1..30 rows over a fixed five-asset universe.
fn arb_matrix() -> impl Strategy<Value = Matrix> {
    (1usize..30)
        .prop_flat_map(|n| prop::collection::vec(prop::collection::vec(arb_cell(), ASSETS.len()), n))
        .prop_map(|rows| {
            let base = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
            let times = (0..rows.len())
                .map(|i| base + chrono::Duration::days(7 * i as i64))
                .collect();
            Matrix::new(times, ASSETS.iter().map(|s| s.to_string()).collect(), rows).unwrap()
        })
}

fn arb_period() -> impl Strategy<Value = usize> {
    1usize..8
}

// ── 1. Composition ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn compose_applies_left_to_right(m in arb_matrix(), period in arb_period()) {
        let f = steps::look_back(period, Aggregation::Pct).unwrap();
        let g = steps::lag(1);
        let composed = compose([f.clone(), g.clone()]).apply(&m).unwrap();
        let manual = g.apply(&f.apply(&m).unwrap()).unwrap();
        prop_assert_eq!(composed, manual);
    }

    #[test]
    fn compose_is_associative(m in arb_matrix()) {
        let f = steps::look_back(2, Aggregation::Mean).unwrap();
        let g = steps::lag(1);
        let h = steps::quantiles(0.25, 0.75).unwrap();
        let left = compose([compose([f.clone(), g.clone()]), h.clone()]);
        let right = compose([f, compose([g, h])]);
        prop_assert_eq!(left.apply(&m).unwrap(), right.apply(&m).unwrap());
    }

    #[test]
    fn freeze_equals_direct_call(m in arb_matrix(), lo in 0.0..0.5_f64, width in 0.0..0.5_f64) {
        let hi = lo + width;
        let step: Step = freeze(
            "quantiles",
            |m: &Matrix, &(lo, hi): &(f64, f64)| transforms::quantiles(m, lo, hi),
            (lo, hi),
        );
        prop_assert_eq!(step.apply(&m).unwrap(), transforms::quantiles(&m, lo, hi).unwrap());
        // referentially transparent: a second call gives the same answer
        prop_assert_eq!(step.apply(&m).unwrap(), step.apply(&m).unwrap());
    }
}

// ── 2. Lag ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn lag_shifts_rows(m in arb_matrix(), k in 0usize..10) {
        let out = transforms::lag(&m, k);
        prop_assert_eq!(out.shape(), m.shape());
        for t in 0..m.n_times() {
            if t < k {
                prop_assert!(out.row(t).iter().all(Option::is_none));
            } else {
                prop_assert_eq!(out.row(t), m.row(t - k));
            }
        }
    }

    #[test]
    fn pct_look_back_matches_direct_change(m in arb_matrix()) {
        let out = transforms::look_back(&m, 1, Aggregation::Pct).unwrap();
        prop_assert!(out.row(0).iter().all(Option::is_none));
        for t in 1..m.n_times() {
            for a in 0..m.n_assets() {
                let expected = match (m.get(t, a), m.get(t - 1, a)) {
                    (Some(now), Some(then)) => Some(now / then - 1.0),
                    _ => None,
                };
                prop_assert_eq!(out.get(t, a), expected);
            }
        }
    }
}

// ── 3. Hold ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn hold_keeps_origin_value_for_period(m in arb_matrix(), k in arb_period()) {
        let out = transforms::hold(&m, k).unwrap();
        for origin in (0..m.n_times()).step_by(k) {
            for t in origin..(origin + k).min(m.n_times()) {
                prop_assert_eq!(out.row(t), m.row(origin));
            }
        }
    }
}

// ── 4. Selection ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn full_quantile_band_selects_all_available(m in arb_matrix()) {
        let out = transforms::quantiles(&m, 0.0, 1.0).unwrap();
        for t in 0..m.n_times() {
            let available = m.row(t).iter().filter(|c| c.is_some()).count();
            for (input, selected) in m.row(t).iter().zip(out.row(t)) {
                match input {
                    None => prop_assert_eq!(*selected, None),
                    Some(_) if available >= 2 => prop_assert_eq!(*selected, Some(1.0)),
                    Some(_) => prop_assert_eq!(*selected, Some(0.0)),
                }
            }
        }
    }

    #[test]
    fn empty_quantile_band_selects_nothing(m in arb_matrix(), q in 0.0..=1.0_f64) {
        let out = transforms::quantiles(&m, q, q).unwrap();
        prop_assert!(out.values().iter().all(|c| *c != Some(1.0)));
    }

    #[test]
    fn complementary_bands_partition_rows(m in arb_matrix(), split in 0.05..0.95_f64) {
        let low = transforms::quantiles(&m, 0.0, split).unwrap();
        let high = transforms::quantiles(&m, split, 1.0).unwrap();
        for t in 0..m.n_times() {
            if m.row(t).iter().filter(|c| c.is_some()).count() < 2 {
                continue;
            }
            for a in 0..m.n_assets() {
                if m.get(t, a).is_some() {
                    let total = low.get(t, a).unwrap() + high.get(t, a).unwrap();
                    prop_assert_eq!(total, 1.0);
                }
            }
        }
    }
}

// ── 5. Weighting ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn equal_weights_are_one_over_n(m in arb_matrix(), k in 1usize..5) {
        let signals = transforms::top(&m, k).unwrap();
        let weights = transforms::ew(&signals);
        for t in 0..m.n_times() {
            let n = signals.row(t).iter().filter(|c| **c == Some(1.0)).count();
            let sum: f64 = weights.row(t).iter().map(|c| c.unwrap_or(0.0)).sum();
            if n == 0 {
                prop_assert_eq!(sum, 0.0);
            } else {
                prop_assert!((sum - 1.0).abs() < 1e-9);
                for (s, w) in signals.row(t).iter().zip(weights.row(t)) {
                    if *s == Some(1.0) {
                        prop_assert_eq!(*w, Some(1.0 / n as f64));
                    }
                }
            }
        }
    }
}

// ── 6. Evaluation ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn zero_weights_earn_nothing(m in arb_matrix()) {
        let returns = transforms::to_returns(&m);
        let zeros = m.map(|_| Some(0.0)).fill_missing(0.0);
        let portfolio = transforms::evaluate(&zeros, &returns).unwrap();
        prop_assert!(portfolio.values().iter().all(|v| *v == 0.0));
    }
}
