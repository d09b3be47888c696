//! Time-series transforms: rolling look-back aggregation, lag and hold.
//!
//! All three work column by column and only ever read rows at or before the row being
//! computed. Leading rows without enough history are missing; the time axis itself is
//! never shortened.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::matrix::cell::{self, Cell};
use crate::matrix::Matrix;

// ─── Aggregation ─────────────────────────────────────────────────────

/// Aggregation applied by [`look_back`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Rate of change between the window endpoints: `v[t] / v[t - period] - 1`.
    Pct,
    Mean,
    Sum,
    Median,
    Min,
    Max,
    /// Sample standard deviation (volatility) over the window.
    Std,
}

type Reducer = fn(&[f64]) -> Cell;

impl Aggregation {
    pub const ALL: [Aggregation; 7] = [
        Self::Pct,
        Self::Mean,
        Self::Sum,
        Self::Median,
        Self::Min,
        Self::Max,
        Self::Std,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Pct => "pct",
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Std => "std",
        }
    }

    /// Window reducer for this aggregation. `Pct` is endpoint-based and has none.
    fn reducer(self) -> Option<Reducer> {
        match self {
            Self::Pct => None,
            Self::Mean => Some(mean),
            Self::Sum => Some(sum),
            Self::Median => Some(median),
            Self::Min => Some(min),
            Self::Max => Some(max),
            Self::Std => Some(std),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        let key = match key.as_str() {
            "volatility" | "vol" => "std",
            "average" => "mean",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|agg| agg.name() == key)
            .ok_or_else(|| {
                PipelineError::configuration(
                    "agg",
                    format!(
                        "unknown aggregation '{s}' (expected one of: pct, mean, sum, median, min, max, std)"
                    ),
                )
            })
    }
}

fn mean(w: &[f64]) -> Cell {
    sum(w).map(|s| s / w.len() as f64)
}

fn sum(w: &[f64]) -> Cell {
    Some(w.iter().sum())
}

fn median(w: &[f64]) -> Cell {
    let mut sorted = w.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn min(w: &[f64]) -> Cell {
    w.iter().copied().reduce(f64::min)
}

fn max(w: &[f64]) -> Cell {
    w.iter().copied().reduce(f64::max)
}

fn std(w: &[f64]) -> Cell {
    if w.len() < 2 {
        return None;
    }
    let m = w.iter().sum::<f64>() / w.len() as f64;
    let var = w.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (w.len() - 1) as f64;
    Some(var.sqrt())
}

// ─── Parameter checks ────────────────────────────────────────────────

pub(crate) fn check_period(parameter: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(PipelineError::configuration(parameter, "must be >= 1"));
    }
    Ok(())
}

// ─── look_back ───────────────────────────────────────────────────────

/// Aggregate each asset's history over `period` rows.
///
/// Rows `0..period` are missing. For window reducers, missing cells inside the window
/// are skipped and the result is missing only when the whole window is missing.
pub fn look_back(matrix: &Matrix, period: usize, agg: Aggregation) -> Result<Matrix> {
    check_period("period", period)?;
    match agg.reducer() {
        None => Ok(pct_change(matrix, period)),
        Some(reduce) => Ok(rolling(matrix, period, reduce)),
    }
}

/// [`look_back`] with a caller-supplied window reducer.
///
/// The reducer sees only the non-missing values of the window, in time order, and is
/// never called with an empty slice. A non-finite result is stored as missing.
pub fn look_back_by<F>(matrix: &Matrix, period: usize, reducer: F) -> Result<Matrix>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    check_period("period", period)?;
    Ok(rolling(matrix, period, reducer))
}

fn pct_change(matrix: &Matrix, period: usize) -> Matrix {
    let (n_t, n_a) = matrix.shape();
    let mut values = vec![None; n_t * n_a];
    for t in period..n_t {
        for a in 0..n_a {
            values[t * n_a + a] =
                cell::ratio(matrix.get(t, a), matrix.get(t - period, a)).map(|r| r - 1.0);
        }
    }
    matrix.with_values(values)
}

fn rolling<F>(matrix: &Matrix, period: usize, reduce: F) -> Matrix
where
    F: Fn(&[f64]) -> Cell,
{
    let (n_t, n_a) = matrix.shape();
    let mut values = vec![None; n_t * n_a];
    let mut window = Vec::with_capacity(period);

    for a in 0..n_a {
        for t in period..n_t {
            window.clear();
            window.extend((t + 1 - period..=t).filter_map(|i| matrix.get(i, a)));
            if !window.is_empty() {
                values[t * n_a + a] = reduce(&window).and_then(cell::finite);
            }
        }
    }

    matrix.with_values(values)
}

// ─── lag ─────────────────────────────────────────────────────────────

/// Shift every column forward by `period` rows: `out[t] = in[t - period]`.
///
/// This is the point-in-time guard of a pipeline: a signal computed from data known at
/// `t - period` is acted on at `t`. `period = 0` returns an equal copy.
pub fn lag(matrix: &Matrix, period: usize) -> Matrix {
    let (n_t, n_a) = matrix.shape();
    let shift = period.min(n_t);
    let mut values = vec![None; shift * n_a];
    values.extend_from_slice(&matrix.values()[..(n_t - shift) * n_a]);
    matrix.with_values(values)
}

// ─── hold ────────────────────────────────────────────────────────────

/// How overlapping hold windows combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldPolicy {
    /// Rebalance every `period` rows; the value at the latest rebalance row is in effect.
    #[default]
    LastWriteWins,
    /// Every row opens a `period`-long tranche; overlapping tranches are summed.
    Additive,
}

/// Keep values in effect for `period` rows with the default [`HoldPolicy::LastWriteWins`].
pub fn hold(matrix: &Matrix, period: usize) -> Result<Matrix> {
    hold_with(matrix, period, HoldPolicy::default())
}

/// Keep values in effect for `period` rows.
///
/// With `LastWriteWins`, rows `0, period, 2·period, …` are rebalance points and every
/// row reports the value of the latest rebalance row at or before it. A missing cell at
/// a rebalance row stays missing for the whole holding window.
///
/// With `Additive`, each row's non-missing value contributes to itself and the next
/// `period - 1` rows; a row with no contributions is missing.
pub fn hold_with(matrix: &Matrix, period: usize, policy: HoldPolicy) -> Result<Matrix> {
    check_period("period", period)?;
    let (n_t, n_a) = matrix.shape();
    let mut values = Vec::with_capacity(n_t * n_a);

    match policy {
        HoldPolicy::LastWriteWins => {
            for t in 0..n_t {
                let origin = (t / period) * period;
                values.extend_from_slice(matrix.row(origin));
            }
        }
        HoldPolicy::Additive => {
            for t in 0..n_t {
                let first = (t + 1).saturating_sub(period);
                for a in 0..n_a {
                    let total = (first..=t)
                        .filter_map(|s| matrix.get(s, a))
                        .fold(None, |acc: Cell, v| Some(acc.unwrap_or(0.0) + v));
                    values.push(total.and_then(cell::finite));
                }
            }
        }
    }

    Ok(matrix.with_values(values))
}
