//! Ready-made steps: each primitive frozen with its options.
//!
//! Constructors that take numeric options validate them here, so a bad parameter fails
//! when the pipeline is built rather than when it first runs. Matrices passed in
//! (universes, weights, returns) are captured by value; applying the step never
//! mutates them.

use crate::error::Result;
use crate::matrix::{Matrix, Series};
use crate::transforms::{self, allocation, factor, picking, Aggregation, HoldPolicy};

use super::step::{freeze, Step};

/// Mask the input with a boolean universe.
pub fn filter(universe: Matrix) -> Step {
    freeze("filter", |m: &Matrix, u: &Matrix| transforms::filter(m, u), universe)
}

pub fn look_back(period: usize, agg: Aggregation) -> Result<Step> {
    factor::check_period("period", period)?;
    Ok(freeze(
        format!("look_back({period}, {agg})"),
        |m: &Matrix, &(period, agg): &(usize, Aggregation)| transforms::look_back(m, period, agg),
        (period, agg),
    ))
}

/// Rolling window with a custom reducer; `name` only labels the step.
pub fn look_back_by<F>(name: &str, period: usize, reducer: F) -> Result<Step>
where
    F: Fn(&[f64]) -> Option<f64> + Send + Sync + 'static,
{
    factor::check_period("period", period)?;
    Ok(Step::new(format!("look_back({period}, {name})"), move |m: &Matrix| {
        transforms::look_back_by(m, period, &reducer)
    }))
}

pub fn lag(period: usize) -> Step {
    freeze(
        format!("lag({period})"),
        |m: &Matrix, &period: &usize| Ok(transforms::lag(m, period)),
        period,
    )
}

pub fn hold(period: usize) -> Result<Step> {
    hold_with(period, HoldPolicy::default())
}

pub fn hold_with(period: usize, policy: HoldPolicy) -> Result<Step> {
    factor::check_period("period", period)?;
    Ok(freeze(
        format!("hold({period}, {policy:?})"),
        |m: &Matrix, &(period, policy): &(usize, HoldPolicy)| {
            transforms::hold_with(m, period, policy)
        },
        (period, policy),
    ))
}

pub fn quantiles(min_q: f64, max_q: f64) -> Result<Step> {
    picking::check_quantile_bounds(min_q, max_q)?;
    Ok(freeze(
        format!("quantiles({min_q}, {max_q})"),
        |m: &Matrix, &(lo, hi): &(f64, f64)| transforms::quantiles(m, lo, hi),
        (min_q, max_q),
    ))
}

pub fn top(k: usize) -> Result<Step> {
    picking::check_k(k)?;
    Ok(freeze(
        format!("top({k})"),
        |m: &Matrix, &k: &usize| transforms::top(m, k),
        k,
    ))
}

pub fn bottom(k: usize) -> Result<Step> {
    picking::check_k(k)?;
    Ok(freeze(
        format!("bottom({k})"),
        |m: &Matrix, &k: &usize| transforms::bottom(m, k),
        k,
    ))
}

pub fn thresholds(min_t: f64, max_t: f64) -> Result<Step> {
    picking::check_thresholds(min_t, max_t)?;
    Ok(freeze(
        format!("thresholds({min_t}, {max_t})"),
        |m: &Matrix, &(lo, hi): &(f64, f64)| transforms::thresholds(m, lo, hi),
        (min_t, max_t),
    ))
}

pub fn ew() -> Step {
    Step::new("ew", |m: &Matrix| Ok(transforms::ew(m)))
}

/// Weight selections by `weights`, e.g. market capitalisation.
pub fn allocate(weights: Matrix) -> Step {
    freeze("allocate", |m: &Matrix, w: &Matrix| transforms::allocate(m, w), weights)
}

pub fn scale(leverage: Series) -> Step {
    freeze("scale", |m: &Matrix, l: &Series| transforms::scale(m, l), leverage)
}

pub fn limit(min_leverage: f64, max_leverage: f64) -> Result<Step> {
    allocation::check_leverage_bounds(min_leverage, max_leverage)?;
    Ok(freeze(
        format!("limit({min_leverage}, {max_leverage})"),
        |m: &Matrix, &(lo, hi): &(f64, f64)| transforms::limit(m, lo, hi),
        (min_leverage, max_leverage),
    ))
}

/// Terminal step: portfolio returns of the incoming weights.
pub fn evaluate(universe_returns: Matrix) -> Step<Matrix, Series> {
    freeze(
        "evaluate",
        |w: &Matrix, r: &Matrix| transforms::evaluate(w, r),
        universe_returns,
    )
}
