//! Turning signals into portfolio weights.
//!
//! Every function works row by row. No sign constraint is imposed: long-short books are
//! built upstream by subtracting one weight matrix from another.

use crate::error::{PipelineError, Result};
use crate::matrix::cell::{self, Cell};
use crate::matrix::{Matrix, Series};

/// Equal weights: each selected asset gets `1 / n` where `n` is the number of selected
/// assets in that row. Unselected cells are `0`, missing cells stay missing, and a row
/// without selections is all zero.
pub fn ew(signals: &Matrix) -> Matrix {
    let n_a = signals.n_assets();
    let mut values = Vec::with_capacity(signals.values().len());
    let mut empty_rows = 0usize;

    for row in signals.rows() {
        let n = row.iter().filter(|c| cell::is_selected(**c)).count();
        if n == 0 {
            empty_rows += 1;
        }
        let w = if n == 0 { 0.0 } else { 1.0 / n as f64 };
        values.extend(
            row.iter()
                .map(|c| c.map(|v| if v != 0.0 { w } else { 0.0 })),
        );
    }
    debug_assert_eq!(values.len(), signals.n_times() * n_a);

    if empty_rows > 0 {
        tracing::debug!(empty_rows, "ew: rows without selections carry zero weight");
    }
    signals.with_values(values)
}

/// Weight selected assets by `weights` (e.g. market capitalisation), normalising each row
/// so it sums to one.
///
/// A selected cell whose weight is missing gets zero exposure. A row that has selections
/// but a zero or missing weight total cannot be normalised and fails with
/// [`PipelineError::EmptyInput`].
pub fn allocate(signals: &Matrix, weights: &Matrix) -> Result<Matrix> {
    signals.check_aligned(weights)?;
    let n_a = signals.n_assets();
    let mut values = Vec::with_capacity(signals.values().len());

    for t in 0..signals.n_times() {
        let sig = signals.row(t);
        let raw: Vec<Cell> = sig
            .iter()
            .zip(weights.row(t))
            .map(|(&s, &w)| match s {
                None => None,
                Some(_) if cell::is_selected(s) => Some(w.unwrap_or(0.0)),
                Some(_) => Some(0.0),
            })
            .collect();

        let any_selected = sig.iter().any(|c| cell::is_selected(*c));
        let norm: f64 = raw.iter().map(|c| cell::or_zero(*c)).sum();

        if any_selected && norm == 0.0 {
            let date = signals
                .times()
                .get(t)
                .map(|d| d.to_string())
                .unwrap_or_default();
            return Err(PipelineError::empty_input(
                "allocate",
                format!("selected weights on {date} sum to zero; cannot normalise"),
            ));
        }

        if any_selected {
            values.extend(raw.iter().map(|c| c.and_then(|v| cell::finite(v / norm))));
        } else {
            values.extend(raw);
        }
    }
    debug_assert_eq!(values.len(), signals.n_times() * n_a);

    Ok(signals.with_values(values))
}

/// Multiply each row by the leverage of that period. The series must share the
/// matrix's time axis.
pub fn scale(holdings: &Matrix, leverage: &Series) -> Result<Matrix> {
    holdings.times().check_same(leverage.index())?;
    let n_a = holdings.n_assets();
    let values = holdings
        .values()
        .iter()
        .enumerate()
        .map(|(i, c)| c.and_then(|v| cell::finite(v * leverage.values()[i / n_a.max(1)])))
        .collect();
    Ok(holdings.with_values(values))
}

pub(crate) fn check_leverage_bounds(min_leverage: f64, max_leverage: f64) -> Result<()> {
    if min_leverage.is_nan() || max_leverage.is_nan() {
        return Err(PipelineError::configuration(
            "min_leverage",
            "leverage bounds must be numbers",
        ));
    }
    if min_leverage > max_leverage {
        return Err(PipelineError::configuration(
            "min_leverage",
            format!("must not exceed max_leverage ({min_leverage} > {max_leverage})"),
        ));
    }
    Ok(())
}

/// Rescale rows whose total exposure falls outside `[min_leverage, max_leverage]` so it
/// lands on the nearest bound. Rows with zero total exposure are left as they are.
pub fn limit(holdings: &Matrix, min_leverage: f64, max_leverage: f64) -> Result<Matrix> {
    check_leverage_bounds(min_leverage, max_leverage)?;
    let correction: Vec<f64> = holdings
        .rows()
        .map(|row| {
            let total: f64 = row.iter().map(|c| cell::or_zero(*c)).sum();
            let factor = if total == 0.0 {
                1.0
            } else if total < min_leverage {
                min_leverage / total
            } else if total > max_leverage {
                max_leverage / total
            } else {
                1.0
            };
            // a near-zero total overflows the correction; leave such rows unscaled
            if factor.is_finite() {
                factor
            } else {
                1.0
            }
        })
        .collect();
    let leverage = Series::new(holdings.times().clone(), correction)?;
    scale(holdings, &leverage)
}
