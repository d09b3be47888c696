//! Pipeline combinators and pre-built steps.
//!
//! ```text
//! prices ─▶ look_back ─▶ lag ─▶ quantiles ─▶ filter ─▶ ew ─▶ evaluate ─▶ returns
//! ```
//!
//! Each arrow is a [`Step`]. Steps are built once (validating their options), then
//! applied any number of times; they hold no mutable state and can be shared across
//! threads.

pub mod step;
pub mod steps;

pub use step::{compose, freeze, Step};
