//! Missing-value arithmetic for a single matrix cell.
//!
//! A cell is `Option<f64>`; `None` is the missing sentinel. NaN and infinities are never
//! stored: [`finite`] turns them into `None` at every boundary where a float is produced.

/// One matrix cell. `None` means the value is missing or unavailable.
pub type Cell = Option<f64>;

/// Wrap a float as a cell, treating non-finite values as missing.
#[inline]
pub fn finite(value: f64) -> Cell {
    value.is_finite().then_some(value)
}

/// missing + x = missing.
#[inline]
pub fn add(a: Cell, b: Cell) -> Cell {
    Some(a? + b?)
}

/// missing - x = missing.
#[inline]
pub fn sub(a: Cell, b: Cell) -> Cell {
    Some(a? - b?)
}

/// missing * x = missing.
#[inline]
pub fn mul(a: Cell, b: Cell) -> Cell {
    Some(a? * b?)
}

/// Division that never yields an infinity: a zero denominator is missing.
#[inline]
pub fn ratio(a: Cell, b: Cell) -> Cell {
    let (a, b) = (a?, b?);
    if b == 0.0 {
        None
    } else {
        finite(a / b)
    }
}

/// A cell counts as selected when it is present and nonzero.
#[inline]
pub fn is_selected(c: Cell) -> bool {
    matches!(c, Some(v) if v != 0.0)
}

/// Boolean cell: `1.0` for true, `0.0` for false.
#[inline]
pub fn flag(value: bool) -> Cell {
    Some(if value { 1.0 } else { 0.0 })
}

/// Contribution of a cell to a sum where missing means "nothing", e.g. exposure.
#[inline]
pub fn or_zero(c: Cell) -> f64 {
    c.unwrap_or(0.0)
}
