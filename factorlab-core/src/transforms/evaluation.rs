//! Portfolio evaluation and the price-to-returns helper.

use crate::error::Result;
use crate::matrix::cell;
use crate::matrix::{Matrix, Series};

/// Portfolio return per period: `Σ weight[t] · return[t]` over assets.
///
/// A cell where either operand is missing contributes nothing. No normalisation is done,
/// so leverage and net exposure are exactly what the weights say. Weights are applied to
/// the same period's returns; delaying them is the job of an upstream `lag`.
pub fn evaluate(weights: &Matrix, universe_returns: &Matrix) -> Result<Series> {
    weights.check_aligned(universe_returns)?;
    let values = weights
        .rows()
        .zip(universe_returns.rows())
        .map(|(w, r)| {
            w.iter()
                .zip(r)
                .map(|(&w, &r)| cell::or_zero(cell::mul(w, r)))
                .sum::<f64>()
        })
        .map(|v| if v.is_finite() { v } else { 0.0 })
        .collect();
    Series::new(weights.times().clone(), values)
}

/// Period-over-period percent change of prices: `p[t] / p[t-1] - 1`.
///
/// The first row, and any cell whose current or previous price is missing or whose
/// previous price is zero, is missing.
pub fn to_returns(prices: &Matrix) -> Matrix {
    let (n_t, n_a) = prices.shape();
    let mut values = vec![None; n_t * n_a];
    for t in 1..n_t {
        for a in 0..n_a {
            values[t * n_a + a] =
                cell::ratio(prices.get(t, a), prices.get(t - 1, a)).map(|r| r - 1.0);
        }
    }
    prices.with_values(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::matrix::test_support::{assert_approx, matrix, EPS};

    #[test]
    fn weighted_sum_per_period() {
        let w = matrix(
            &["A", "B"],
            vec![vec![Some(0.5), Some(0.5)], vec![Some(1.0), Some(-1.0)]],
        );
        let r = matrix(
            &["A", "B"],
            vec![vec![Some(0.1), Some(0.3)], vec![Some(0.2), Some(0.05)]],
        );
        let s = evaluate(&w, &r).unwrap();
        assert_approx(s.values()[0], 0.2, EPS);
        assert_approx(s.values()[1], 0.15, EPS);
    }

    #[test]
    fn missing_operands_contribute_zero() {
        let w = matrix(&["A", "B"], vec![vec![Some(1.0), None]]);
        let r = matrix(&["A", "B"], vec![vec![None, Some(0.5)]]);
        assert_eq!(evaluate(&w, &r).unwrap().values(), &[0.0]);
    }

    #[test]
    fn zero_weights_give_zero_returns() {
        let w = matrix(&["A", "B"], vec![vec![Some(0.0), Some(0.0)]; 3]);
        let r = matrix(&["A", "B"], vec![vec![Some(0.4), Some(-0.2)]; 3]);
        assert_eq!(evaluate(&w, &r).unwrap().values(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn evaluate_requires_alignment() {
        let w = matrix(&["A"], vec![vec![Some(1.0)]]);
        let r = matrix(&["B"], vec![vec![Some(0.1)]]);
        assert!(matches!(
            evaluate(&w, &r),
            Err(PipelineError::Alignment { .. })
        ));
    }

    #[test]
    fn returns_from_prices() {
        let p = matrix(
            &["A", "B"],
            vec![
                vec![Some(10.0), Some(5.0)],
                vec![Some(11.0), None],
                vec![Some(9.9), Some(6.0)],
            ],
        );
        let r = to_returns(&p);
        assert_eq!(r.row(0), &[None, None]);
        assert_approx(r.get(1, 0).unwrap(), 0.1, EPS);
        assert_eq!(r.get(1, 1), None);
        assert_approx(r.get(2, 0).unwrap(), -0.1, 1e-12);
        assert_eq!(r.get(2, 1), None);
    }
}
