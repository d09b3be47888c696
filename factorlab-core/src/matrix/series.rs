//! One scalar per time point: portfolio returns and per-period leverage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::axis::TimeAxis;
use crate::error::{PipelineError, Result};

/// Time-indexed scalar series. Values are always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    index: TimeAxis,
    values: Vec<f64>,
}

impl Series {
    pub fn new(index: TimeAxis, values: Vec<f64>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(PipelineError::InvalidMatrix(format!(
                "series has {} values for {} time points",
                values.len(),
                index.len()
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidMatrix(format!(
                "series value at position {pos} is not finite"
            )));
        }
        Ok(Self { index, values })
    }

    /// Same value at every time point.
    pub fn constant(index: &TimeAxis, value: f64) -> Result<Self> {
        Self::new(index.clone(), vec![value; index.len()])
    }

    pub fn index(&self) -> &TimeAxis {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.index.position(date).map(|i| self.values[i])
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.index.iter().zip(self.values.iter().copied())
    }
}
