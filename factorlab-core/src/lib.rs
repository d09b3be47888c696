//! FactorLab Core: matrix type, point-in-time transforms, pipeline combinators.
//!
//! This crate contains everything needed to express and run a factor strategy:
//! - `Matrix`: time × asset values with explicit missing cells and shared axes
//! - Transforms: look_back, lag, hold, filter, quantiles, top/bottom, thresholds
//! - Allocation: equal weighting, weighted allocation, scaling and leverage limits
//! - Evaluation: per-period portfolio returns from weights and asset returns
//! - Pipelines: `freeze` binds options to a primitive, `compose` chains steps
//!
//! No transform reads a row later than the one it computes. Any look-ahead a strategy
//! has comes from how its steps are arranged (for example a missing `lag`).

pub mod error;
pub mod matrix;
pub mod pipeline;
pub mod transforms;

pub use error::{Axis, PipelineError, Result};
pub use matrix::{Cell, Matrix, Series};
pub use pipeline::{compose, freeze, Step};
