//! Look-ahead contamination tests for every primitive.
//!
//! No output row at time t may depend on input data from t+1 or later.
//!
//! Method: compute on a truncated history (rows 0..40) and on the full history
//! (rows 0..80). The first 40 rows must be identical. Any difference means a primitive
//! is leaking future data into past rows.

use chrono::NaiveDate;
use factorlab_core::matrix::Matrix;
use factorlab_core::transforms::{self, Aggregation, HoldPolicy};
use factorlab_core::Cell;

const FULL: usize = 80;
const TRUNCATED: usize = 40;
const ASSETS: [&str; 6] = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];

/// Deterministic price grid with some missing cells.
fn make_prices(n: usize) -> Matrix {
    let base = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
    let times = (0..n)
        .map(|i| base + chrono::Duration::days(30 * i as i64))
        .collect();

    let rows = (0..n)
        .map(|t| {
            (0..ASSETS.len())
                .map(|a| {
                    // Deterministic pseudo-random walk using a simple LCG
                    let seed = ((t * 31 + a * 7) as u64)
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    if seed % 17 == 0 {
                        None
                    } else {
                        let wiggle = ((seed >> 33) % 200) as f64 / 100.0 - 1.0;
                        Some(50.0 + 10.0 * a as f64 + t as f64 * 0.2 + wiggle * 5.0)
                    }
                })
                .collect::<Vec<Cell>>()
        })
        .collect();

    Matrix::new(times, ASSETS.iter().map(|s| s.to_string()).collect(), rows).unwrap()
}

/// Assert `op` yields the same first `TRUNCATED` rows on truncated and full input.
fn assert_no_lookahead(name: &str, op: impl Fn(&Matrix) -> Matrix) {
    let full = make_prices(FULL);
    let truncated = full.head(TRUNCATED);

    let full_out = op(&full);
    let truncated_out = op(&truncated);

    assert_eq!(truncated_out.n_times(), TRUNCATED, "{name}: truncated length");
    assert_eq!(full_out.n_times(), FULL, "{name}: full length");

    for t in 0..TRUNCATED {
        assert_eq!(
            truncated_out.row(t),
            full_out.row(t),
            "{name}: LOOK-AHEAD at row {t}"
        );
    }
}

#[test]
fn look_back_all_aggregations() {
    for agg in Aggregation::ALL {
        for period in [1, 3, 12] {
            assert_no_lookahead(&format!("look_back({period}, {agg})"), |m| {
                transforms::look_back(m, period, agg).unwrap()
            });
        }
    }
}

#[test]
fn look_back_custom_reducer() {
    assert_no_lookahead("look_back_by(range)", |m| {
        transforms::look_back_by(m, 6, |w| {
            let hi = w.iter().copied().fold(f64::MIN, f64::max);
            let lo = w.iter().copied().fold(f64::MAX, f64::min);
            Some(hi - lo)
        })
        .unwrap()
    });
}

#[test]
fn lag_no_lookahead() {
    for period in [0, 1, 5] {
        assert_no_lookahead(&format!("lag({period})"), |m| transforms::lag(m, period));
    }
}

#[test]
fn hold_no_lookahead() {
    for policy in [HoldPolicy::LastWriteWins, HoldPolicy::Additive] {
        for period in [1, 3, 7] {
            assert_no_lookahead(&format!("hold({period}, {policy:?})"), |m| {
                transforms::hold_with(m, period, policy).unwrap()
            });
        }
    }
}

#[test]
fn cross_sectional_selectors_no_lookahead() {
    assert_no_lookahead("quantiles(0.2, 0.8)", |m| {
        transforms::quantiles(m, 0.2, 0.8).unwrap()
    });
    assert_no_lookahead("top(2)", |m| transforms::top(m, 2).unwrap());
    assert_no_lookahead("bottom(2)", |m| transforms::bottom(m, 2).unwrap());
    assert_no_lookahead("thresholds(60, 80)", |m| {
        transforms::thresholds(m, 60.0, 80.0).unwrap()
    });
    assert_no_lookahead("filter(price > 65)", |m| {
        transforms::filter(m, &m.gt(65.0)).unwrap()
    });
}

#[test]
fn allocation_no_lookahead() {
    assert_no_lookahead("ew(top(3))", |m| {
        transforms::ew(&transforms::top(m, 3).unwrap())
    });
    assert_no_lookahead("allocate(top(3), price)", |m| {
        transforms::allocate(&transforms::top(m, 3).unwrap(), m).unwrap()
    });
    assert_no_lookahead("limit(ew, 0.5, 0.8)", |m| {
        let w = transforms::ew(&transforms::top(m, 3).unwrap());
        transforms::limit(&w, 0.5, 0.8).unwrap()
    });
}

#[test]
fn returns_and_evaluation_no_lookahead() {
    assert_no_lookahead("to_returns", transforms::to_returns);

    let full = make_prices(FULL);
    let truncated = full.head(TRUNCATED);
    let portfolio = |m: &Matrix| {
        let weights = transforms::ew(&transforms::lag(&transforms::top(m, 2).unwrap(), 1));
        transforms::evaluate(&weights, &transforms::to_returns(m)).unwrap()
    };

    let full_out = portfolio(&full);
    let truncated_out = portfolio(&truncated);
    assert_eq!(truncated_out.values(), &full_out.values()[..TRUNCATED]);
}
