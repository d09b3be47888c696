//! Time × asset matrix with an explicit missing sentinel.
//!
//! A `Matrix` is immutable once built. Every transform allocates a fresh value buffer;
//! the axes are shared behind `Arc` because they never change.
//!
//! Binary operations (`zip_with` and the helpers built on it) verify that both operands
//! carry the same time and asset axes and fail with [`PipelineError::Alignment`]
//! otherwise. Use [`Matrix::reindex`] to bring a matrix onto a wider axis explicitly.

pub mod axis;
pub mod cell;
pub mod series;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{PipelineError, Result};

pub use axis::{AssetAxis, TimeAxis};
pub use cell::Cell;
pub use series::Series;

/// Time-indexed, asset-indexed grid of optional floats, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    times: Arc<TimeAxis>,
    assets: Arc<AssetAxis>,
    values: Vec<Cell>,
}

impl Matrix {
    /// Build a matrix from rows of cells. `assets` may be given in any order; columns are
    /// reordered to the canonical (sorted) asset order. Non-finite values become missing.
    pub fn new(times: Vec<NaiveDate>, assets: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let times = TimeAxis::new(times)?;
        if rows.len() != times.len() {
            return Err(PipelineError::InvalidMatrix(format!(
                "{} rows supplied for {} time points",
                rows.len(),
                times.len()
            )));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != assets.len()) {
            return Err(PipelineError::InvalidMatrix(format!(
                "row {i} has {} cells, expected {}",
                row.len(),
                assets.len()
            )));
        }

        let axis = AssetAxis::new(assets.iter().cloned())?;
        // source column for each canonical column; names are unique once the axis exists
        let mut order: Vec<usize> = (0..assets.len()).collect();
        order.sort_unstable_by(|&i, &j| assets[i].cmp(&assets[j]));

        let mut values = Vec::with_capacity(times.len() * axis.len());
        for row in &rows {
            values.extend(order.iter().map(|&src| row[src].and_then(cell::finite)));
        }

        Ok(Self {
            times: Arc::new(times),
            assets: Arc::new(axis),
            values,
        })
    }

    /// Build a matrix from plain floats, treating NaN as missing.
    pub fn from_f64(times: Vec<NaiveDate>, assets: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(cell::finite).collect())
            .collect();
        Self::new(times, assets, rows)
    }

    /// Build a matrix from named columns.
    pub fn from_columns<I, S>(times: Vec<NaiveDate>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Cell>)>,
        S: Into<String>,
    {
        let (assets, cols): (Vec<String>, Vec<Vec<Cell>>) =
            columns.into_iter().map(|(a, c)| (a.into(), c)).unzip();
        if let Some((a, c)) = assets.iter().zip(&cols).find(|(_, c)| c.len() != times.len()) {
            return Err(PipelineError::InvalidMatrix(format!(
                "column '{a}' has {} cells, expected {}",
                c.len(),
                times.len()
            )));
        }
        let rows = (0..times.len())
            .map(|t| cols.iter().map(|c| c[t]).collect())
            .collect();
        Self::new(times, assets, rows)
    }

    /// A matrix of a single constant value over the given axes.
    pub fn filled(times: &TimeAxis, assets: &AssetAxis, value: Cell) -> Self {
        Self {
            times: Arc::new(times.clone()),
            assets: Arc::new(assets.clone()),
            values: vec![value.and_then(cell::finite); times.len() * assets.len()],
        }
    }

    /// New matrix sharing this matrix's axes. `values` must be row-major and full-size.
    pub(crate) fn with_values(&self, values: Vec<Cell>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            times: Arc::clone(&self.times),
            assets: Arc::clone(&self.assets),
            values,
        }
    }

    // ── Shape and access ──

    pub fn times(&self) -> &TimeAxis {
        &self.times
    }

    pub fn assets(&self) -> &AssetAxis {
        &self.assets
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// (time points, assets)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_times(), self.n_assets())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cell at positional (time, asset) index. Out of range is missing.
    pub fn get(&self, t: usize, a: usize) -> Cell {
        if t >= self.n_times() || a >= self.n_assets() {
            return None;
        }
        self.values[t * self.n_assets() + a]
    }

    /// Cell at a labelled (date, asset) position. Unknown labels are missing.
    pub fn value(&self, date: NaiveDate, asset: &str) -> Cell {
        let t = self.times.position(date)?;
        let a = self.assets.position(asset)?;
        self.get(t, a)
    }

    pub fn row(&self, t: usize) -> &[Cell] {
        let n = self.n_assets();
        &self.values[t * n..(t + 1) * n]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        (0..self.n_times()).map(move |t| self.row(t))
    }

    pub fn column(&self, a: usize) -> Vec<Cell> {
        (0..self.n_times()).map(|t| self.get(t, a)).collect()
    }

    pub fn column_by_name(&self, asset: &str) -> Option<Vec<Cell>> {
        self.assets.position(asset).map(|a| self.column(a))
    }

    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Number of non-missing cells.
    pub fn count_present(&self) -> usize {
        self.values.iter().filter(|c| c.is_some()).count()
    }

    /// The first `n` time points, all assets.
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.n_times());
        Self {
            times: Arc::new(self.times.head(n)),
            assets: Arc::clone(&self.assets),
            values: self.values[..n * self.n_assets()].to_vec(),
        }
    }

    // ── Elementwise helpers ──

    /// Apply `f` to every present cell; missing cells stay missing.
    pub fn map(&self, f: impl Fn(f64) -> Cell) -> Self {
        self.with_values(
            self.values
                .iter()
                .map(|c| c.and_then(&f).and_then(cell::finite))
                .collect(),
        )
    }

    /// Combine two aligned matrices cell by cell.
    pub fn zip_with(&self, other: &Matrix, f: impl Fn(Cell, Cell) -> Cell) -> Result<Self> {
        self.check_aligned(other)?;
        Ok(self.with_values(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| f(a, b).and_then(cell::finite))
                .collect(),
        ))
    }

    pub fn add(&self, other: &Matrix) -> Result<Self> {
        self.zip_with(other, cell::add)
    }

    /// Cellwise difference, e.g. long leg minus short leg.
    pub fn sub(&self, other: &Matrix) -> Result<Self> {
        self.zip_with(other, cell::sub)
    }

    pub fn mul(&self, other: &Matrix) -> Result<Self> {
        self.zip_with(other, cell::mul)
    }

    pub fn ratio(&self, other: &Matrix) -> Result<Self> {
        self.zip_with(other, cell::ratio)
    }

    /// Boolean mask `value > threshold`; missing stays missing.
    pub fn gt(&self, threshold: f64) -> Self {
        self.with_values(
            self.values
                .iter()
                .map(|c| c.and_then(|v| cell::flag(v > threshold)))
                .collect(),
        )
    }

    /// Boolean mask `value < threshold`; missing stays missing.
    pub fn lt(&self, threshold: f64) -> Self {
        self.with_values(
            self.values
                .iter()
                .map(|c| c.and_then(|v| cell::flag(v < threshold)))
                .collect(),
        )
    }

    /// Replace missing cells with `value`.
    pub fn fill_missing(&self, value: f64) -> Self {
        let fill = cell::finite(value);
        self.with_values(self.values.iter().map(|c| c.or(fill)).collect())
    }

    // ── Alignment ──

    /// Fail unless both matrices share the same time and asset axes.
    pub fn check_aligned(&self, other: &Matrix) -> Result<()> {
        if Arc::ptr_eq(&self.times, &other.times) && Arc::ptr_eq(&self.assets, &other.assets) {
            return Ok(());
        }
        self.times.check_same(&other.times)?;
        self.assets.check_same(&other.assets)
    }

    /// Project onto new axes. Cells absent from this matrix become missing.
    pub fn reindex(&self, times: &TimeAxis, assets: &AssetAxis) -> Self {
        let t_map: Vec<Option<usize>> = times.iter().map(|d| self.times.position(d)).collect();
        let a_map: Vec<Option<usize>> = assets.iter().map(|a| self.assets.position(a)).collect();

        let mut values = Vec::with_capacity(times.len() * assets.len());
        for src_t in &t_map {
            for src_a in &a_map {
                values.push(match (src_t, src_a) {
                    (Some(t), Some(a)) => self.get(*t, *a),
                    _ => None,
                });
            }
        }

        Self {
            times: Arc::new(times.clone()),
            assets: Arc::new(assets.clone()),
            values,
        }
    }
}

/// Bring two matrices onto the sorted union of their axes, filling absent cells with
/// missing. Callers opt into this explicitly; primitives never align implicitly.
pub fn outer_align(left: &Matrix, right: &Matrix) -> (Matrix, Matrix) {
    let times = left.times().union(right.times());
    let assets = left.assets().union(right.assets());
    (left.reindex(&times, &assets), right.reindex(&times, &assets))
}
