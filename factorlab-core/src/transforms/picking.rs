//! Cross-sectional selection: universe filtering, quantile bands, top/bottom-k and
//! fixed thresholds.
//!
//! Selection outputs are signal matrices: `1.0` selected, `0.0` available but not
//! selected, missing where the input was missing. Each row is processed on its own,
//! over the assets actually available in that row.

use crate::error::{PipelineError, Result};
use crate::matrix::cell::{self, Cell};
use crate::matrix::Matrix;

/// Mask `matrix` with a boolean `universe`: cells where the universe is zero or missing
/// become missing, all other cells pass through unchanged.
pub fn filter(matrix: &Matrix, universe: &Matrix) -> Result<Matrix> {
    universe.check_aligned(matrix)?;
    Ok(matrix.with_values(
        matrix
            .values()
            .iter()
            .zip(universe.values())
            .map(|(&v, &u)| if cell::is_selected(u) { v } else { None })
            .collect(),
    ))
}

// ─── quantiles ───────────────────────────────────────────────────────

pub(crate) fn check_quantile_bounds(min_q: f64, max_q: f64) -> Result<()> {
    let in_unit = |q: f64| (0.0..=1.0).contains(&q);
    if !in_unit(min_q) {
        return Err(PipelineError::configuration(
            "min_q",
            format!("must be within [0, 1], got {min_q}"),
        ));
    }
    if !in_unit(max_q) {
        return Err(PipelineError::configuration(
            "max_q",
            format!("must be within [0, 1], got {max_q}"),
        ));
    }
    if min_q > max_q {
        return Err(PipelineError::configuration(
            "min_q",
            format!("must not exceed max_q ({min_q} > {max_q})"),
        ));
    }
    Ok(())
}

/// Select assets whose percentile position within the row lies in `[min_q, max_q)`.
///
/// Percentile is `rank / (n - 1)` over the `n` non-missing values of the row, ranked
/// ascending with ties sharing the lowest rank. The band is closed at the top when
/// `max_q == 1`, so `quantiles(0, 1)` keeps every available asset, while
/// `min_q == max_q` is empty. Rows with fewer than two available assets select nothing.
pub fn quantiles(matrix: &Matrix, min_q: f64, max_q: f64) -> Result<Matrix> {
    check_quantile_bounds(min_q, max_q)?;
    let in_band = |p: f64| min_q < max_q && p >= min_q && (p < max_q || max_q == 1.0);

    Ok(map_rows(matrix, |row, out| {
        let ranked = ranks(row);
        let n = ranked.len();
        for (a, rank) in ranked {
            let selected = n >= 2 && in_band(rank as f64 / (n - 1) as f64);
            out[a] = cell::flag(selected);
        }
    }))
}

/// (column, rank) for each present cell of `row`; equal values share the lowest rank.
fn ranks(row: &[Cell]) -> Vec<(usize, usize)> {
    let mut present: Vec<(usize, f64)> = row
        .iter()
        .enumerate()
        .filter_map(|(a, c)| c.map(|v| (a, v)))
        .collect();
    present.sort_by(|x, y| x.1.total_cmp(&y.1));

    let mut out = Vec::with_capacity(present.len());
    let mut rank = 0;
    for (i, &(a, v)) in present.iter().enumerate() {
        if i > 0 && v != present[i - 1].1 {
            rank = i;
        }
        out.push((a, rank));
    }
    out
}

// ─── top / bottom / thresholds ───────────────────────────────────────

pub(crate) fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(PipelineError::configuration("k", "must be >= 1"));
    }
    Ok(())
}

/// Select values at or above the `k`-th largest distinct value of each row.
/// Rows with fewer than `k` distinct values select every available asset.
pub fn top(matrix: &Matrix, k: usize) -> Result<Matrix> {
    check_k(k)?;
    Ok(select_by_cutoff(matrix, |distinct| {
        let i = distinct.len().saturating_sub(k);
        (distinct[i], true)
    }))
}

/// Select values at or below the `k`-th smallest distinct value of each row.
/// Rows with fewer than `k` distinct values select every available asset.
pub fn bottom(matrix: &Matrix, k: usize) -> Result<Matrix> {
    check_k(k)?;
    Ok(select_by_cutoff(matrix, |distinct| {
        let i = k.min(distinct.len()) - 1;
        (distinct[i], false)
    }))
}

/// `cutoff` receives the sorted distinct values of a non-empty row and returns the
/// threshold plus whether selection is `>=` (true) or `<=` (false).
fn select_by_cutoff<F>(matrix: &Matrix, cutoff: F) -> Matrix
where
    F: Fn(&[f64]) -> (f64, bool),
{
    map_rows(matrix, |row, out| {
        let mut distinct: Vec<f64> = row.iter().flatten().copied().collect();
        if distinct.is_empty() {
            return;
        }
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        let (threshold, above) = cutoff(&distinct);
        for (a, c) in row.iter().enumerate() {
            if let Some(v) = c {
                out[a] = cell::flag(if above { *v >= threshold } else { *v <= threshold });
            }
        }
    })
}

pub(crate) fn check_thresholds(min_t: f64, max_t: f64) -> Result<()> {
    if min_t.is_nan() || max_t.is_nan() {
        return Err(PipelineError::configuration("min_t", "thresholds must be numbers"));
    }
    if min_t > max_t {
        return Err(PipelineError::configuration(
            "min_t",
            format!("must not exceed max_t ({min_t} > {max_t})"),
        ));
    }
    Ok(())
}

/// Select values inside the closed range `[min_t, max_t]`.
pub fn thresholds(matrix: &Matrix, min_t: f64, max_t: f64) -> Result<Matrix> {
    check_thresholds(min_t, max_t)?;
    Ok(matrix.with_values(
        matrix
            .values()
            .iter()
            .map(|c| c.and_then(|v| cell::flag(min_t <= v && v <= max_t)))
            .collect(),
    ))
}

/// Run `f` on each row. `out` starts all-missing and has one slot per asset.
fn map_rows<F>(matrix: &Matrix, mut f: F) -> Matrix
where
    F: FnMut(&[Cell], &mut [Cell]),
{
    let n_a = matrix.n_assets();
    let mut values = vec![None; matrix.values().len()];
    for (t, row) in matrix.rows().enumerate() {
        f(row, &mut values[t * n_a..(t + 1) * n_a]);
    }
    matrix.with_values(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::test_support::matrix;

    const ABCD: [&str; 4] = ["A", "B", "C", "D"];

    fn row(values: &[Cell]) -> Matrix {
        matrix(&ABCD, vec![values.to_vec()])
    }

    #[test]
    fn filter_masks_false_and_missing() {
        let m = row(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        let u = row(&[Some(1.0), Some(0.0), None, Some(1.0)]);
        let out = filter(&m, &u).unwrap();
        assert_eq!(out.row(0), &[Some(1.0), None, None, Some(4.0)]);
    }

    #[test]
    fn filter_requires_alignment() {
        let m = row(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        let u = matrix(&["A", "B"], vec![vec![Some(1.0), Some(1.0)]]);
        assert!(matches!(
            filter(&m, &u),
            Err(PipelineError::Alignment { .. })
        ));
    }

    #[test]
    fn quantile_bands_partition_the_row() {
        let m = row(&[Some(4.0), Some(1.0), Some(3.0), Some(2.0)]);
        // percentiles: B=0, D=1/3, C=2/3, A=1
        let low = quantiles(&m, 0.0, 0.5).unwrap();
        let high = quantiles(&m, 0.5, 1.0).unwrap();
        assert_eq!(low.row(0), &[Some(0.0), Some(1.0), Some(0.0), Some(1.0)]);
        assert_eq!(high.row(0), &[Some(1.0), Some(0.0), Some(1.0), Some(0.0)]);
    }

    #[test]
    fn quantiles_rank_only_available_assets() {
        let m = row(&[Some(10.0), None, Some(30.0), Some(20.0)]);
        let out = quantiles(&m, 0.5, 1.0).unwrap();
        // available: A=0, D=0.5, C=1
        assert_eq!(out.row(0), &[Some(0.0), None, Some(1.0), Some(1.0)]);
    }

    #[test]
    fn quantiles_full_and_empty_bands() {
        let m = row(&[Some(1.0), Some(5.0), None, Some(3.0)]);
        let all = quantiles(&m, 0.0, 1.0).unwrap();
        assert_eq!(all.row(0), &[Some(1.0), Some(1.0), None, Some(1.0)]);
        let none = quantiles(&m, 0.4, 0.4).unwrap();
        assert_eq!(none.row(0), &[Some(0.0), Some(0.0), None, Some(0.0)]);
    }

    #[test]
    fn quantiles_need_two_assets() {
        let m = row(&[Some(1.0), None, None, None]);
        let out = quantiles(&m, 0.0, 1.0).unwrap();
        assert_eq!(out.row(0), &[Some(0.0), None, None, None]);

        let empty = row(&[None, None, None, None]);
        assert_eq!(quantiles(&empty, 0.0, 1.0).unwrap().count_present(), 0);
    }

    #[test]
    fn quantile_ties_share_rank() {
        let m = row(&[Some(1.0), Some(1.0), Some(2.0), Some(3.0)]);
        let out = quantiles(&m, 0.0, 0.1).unwrap();
        assert_eq!(out.row(0), &[Some(1.0), Some(1.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn quantile_bounds_validated() {
        let m = row(&[Some(1.0), Some(2.0), None, None]);
        assert!(quantiles(&m, -0.1, 0.5).is_err());
        assert!(quantiles(&m, 0.0, 1.5).is_err());
        assert!(quantiles(&m, 0.7, 0.3).is_err());
        assert!(quantiles(&m, f64::NAN, 0.3).is_err());
    }

    #[test]
    fn top_and_bottom_k() {
        let m = row(&[Some(4.0), Some(1.0), Some(3.0), Some(2.0)]);
        assert_eq!(
            top(&m, 2).unwrap().row(0),
            &[Some(1.0), Some(0.0), Some(1.0), Some(0.0)]
        );
        assert_eq!(
            bottom(&m, 1).unwrap().row(0),
            &[Some(0.0), Some(1.0), Some(0.0), Some(0.0)]
        );
    }

    #[test]
    fn top_with_few_distinct_values_selects_all() {
        let m = row(&[Some(2.0), Some(2.0), None, Some(1.0)]);
        assert_eq!(
            top(&m, 5).unwrap().row(0),
            &[Some(1.0), Some(1.0), None, Some(1.0)]
        );
        assert!(top(&m, 0).is_err());
    }

    #[test]
    fn thresholds_are_inclusive() {
        let m = row(&[Some(1.0), Some(2.0), Some(3.0), None]);
        assert_eq!(
            thresholds(&m, 2.0, 3.0).unwrap().row(0),
            &[Some(0.0), Some(1.0), Some(1.0), None]
        );
        assert!(thresholds(&m, 3.0, 2.0).is_err());
    }
}
