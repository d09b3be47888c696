//! Error type shared by every matrix operation, transform and pipeline stage.

use std::fmt;

/// Which axis of a matrix an alignment failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Time,
    Asset,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Time => f.write_str("time"),
            Axis::Asset => f.write_str("asset"),
        }
    }
}

/// Errors raised while building or running a pipeline.
///
/// Every error is raised synchronously by the offending operation and unwinds the
/// whole pipeline invocation. `compose` wraps stage failures in [`PipelineError::Stage`]
/// so the caller can tell which step failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{axis} axes are not aligned (missing: {missing:?}, extra: {extra:?})")]
    Alignment {
        axis: Axis,
        /// Keys present on the left operand but absent on the right.
        missing: Vec<String>,
        /// Keys present on the right operand but absent on the left.
        extra: Vec<String>,
    },

    #[error("invalid parameter `{parameter}`: {reason}")]
    Configuration { parameter: String, reason: String },

    #[error("{operation}: {reason}")]
    EmptyInput { operation: String, reason: String },

    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    #[error("stage {index} ({stage}) failed: {source}")]
    Stage {
        index: usize,
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn configuration(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn empty_input(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EmptyInput {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// The innermost error, with any `Stage` wrappers removed.
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
