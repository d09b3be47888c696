//! Transformation primitives.
//!
//! Each primitive is a pure function from one or more matrices to a freshly allocated
//! matrix (or, for `evaluate`, a series). None of them reads a row later than the row it
//! is computing; binary primitives check alignment before touching any cell.
//!
//! - `factor`: look_back, lag, hold
//! - `picking`: filter, quantiles, top, bottom, thresholds
//! - `allocation`: ew, allocate, scale, limit
//! - `evaluation`: evaluate, to_returns

pub mod allocation;
pub mod evaluation;
pub mod factor;
pub mod picking;

pub use allocation::{allocate, ew, limit, scale};
pub use evaluation::{evaluate, to_returns};
pub use factor::{hold, hold_with, lag, look_back, look_back_by, Aggregation, HoldPolicy};
pub use picking::{bottom, filter, quantiles, thresholds, top};
