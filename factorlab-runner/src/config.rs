//! Serializable pipeline configuration.
//!
//! A pipeline is described in TOML:
//!
//! ```toml
//! name = "12-1 momentum"
//!
//! [universe]
//! type = "PRICE_ABOVE"
//! threshold = 5.0
//!
//! [[steps]]
//! type = "LOOK_BACK"
//! period = 12
//! agg = "pct"
//!
//! [[steps]]
//! type = "LAG"
//! period = 1
//!
//! [[steps]]
//! type = "QUANTILES"
//! min_q = 0.8
//! max_q = 1.0
//!
//! [[steps]]
//! type = "FILTER"
//!
//! [[steps]]
//! type = "EW"
//! ```
//!
//! Parameters are checked when the steps are built, so `validate()` catches every bad
//! value before any data is touched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use factorlab_core::matrix::cell;
use factorlab_core::matrix::{AssetAxis, Matrix, TimeAxis};
use factorlab_core::pipeline::{steps, Step};
use factorlab_core::transforms::{Aggregation, HoldPolicy};
use factorlab_core::PipelineError;

/// Content-addressable identifier of a pipeline configuration.
pub type PipelineId = String;

/// Errors from reading or validating a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("pipeline has no steps")]
    NoSteps,

    #[error("step {index} ({step}): {source}")]
    InvalidStep {
        index: usize,
        step: &'static str,
        #[source]
        source: PipelineError,
    },
}

/// A complete pipeline: universe rule plus an ordered list of steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Human-readable label, carried into results.
    #[serde(default)]
    pub name: Option<String>,

    /// Rule used to build the universe mask for `FILTER` steps.
    #[serde(default)]
    pub universe: UniverseConfig,

    /// Steps applied in order to the price matrix; `evaluate` is appended by the runner.
    pub steps: Vec<StepConfig>,
}

/// Universe rule (serializable enum).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UniverseConfig {
    /// Every asset with a price in that period.
    #[default]
    All,

    /// Assets priced strictly above `threshold`.
    PriceAbove { threshold: f64 },

    /// Assets priced strictly below `threshold`.
    PriceBelow { threshold: f64 },

    /// Assets priced in each of the last `periods` periods, the current one included.
    /// Rows before `periods - 1` have no complete window and are excluded.
    MinHistory { periods: usize },
}

/// One pipeline step (serializable enum).
///
/// Periods are signed so that negative values are reported as configuration errors
/// instead of TOML type errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepConfig {
    /// Rolling aggregation over `period` rows.
    LookBack { period: i64, agg: String },

    /// Delay values by `period` rows.
    Lag { period: i64 },

    /// Rebalance every `period` rows.
    Hold {
        period: i64,
        #[serde(default)]
        policy: HoldPolicy,
    },

    /// Select a percentile band per row.
    Quantiles { min_q: f64, max_q: f64 },

    /// Select the `k` largest values per row.
    Top { k: usize },

    /// Select the `k` smallest values per row.
    Bottom { k: usize },

    /// Select values inside `[min_t, max_t]`.
    Thresholds { min_t: f64, max_t: f64 },

    /// Mask with the configured universe.
    Filter,

    /// Equal weights over selected assets.
    Ew,

    /// Clip total exposure per row.
    Limit { min_leverage: f64, max_leverage: f64 },
}

impl PipelineConfig {
    /// Load a pipeline configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a pipeline configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two configurations that serialize identically share an ID.
    pub fn pipeline_id(&self) -> Result<PipelineId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Check every parameter without touching any price data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.universe.validate()?;
        let placeholder = Matrix::filled(&TimeAxis::default(), &AssetAxis::default(), None);
        self.build_steps(&placeholder).map(|_| ())
    }

    /// Build the configured steps, binding `universe` into every `FILTER` step.
    pub fn build_steps(&self, universe: &Matrix) -> Result<Vec<Step>, ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| step.build(index, universe))
            .collect()
    }
}

impl UniverseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::All => Ok(()),
            Self::PriceAbove { threshold } | Self::PriceBelow { threshold } => {
                if threshold.is_finite() {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidValue {
                        field: "universe.threshold".into(),
                        reason: format!("must be a finite number, got {threshold}"),
                    })
                }
            }
            Self::MinHistory { periods } => {
                if periods == 0 {
                    Err(ConfigError::InvalidValue {
                        field: "universe.periods".into(),
                        reason: "must be >= 1".into(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Boolean universe mask over `prices`: `1` in, `0` out, missing where the price is.
    pub fn mask(&self, prices: &Matrix) -> Result<Matrix, ConfigError> {
        self.validate()?;
        let mask = match *self {
            Self::All => prices.map(|_| Some(1.0)),
            Self::PriceAbove { threshold } => prices.gt(threshold),
            Self::PriceBelow { threshold } => prices.lt(threshold),
            Self::MinHistory { periods } => {
                let priced = |t: usize, a: usize| prices.get(t, a).is_some();
                let rows = (0..prices.n_times())
                    .map(|t| {
                        (0..prices.n_assets())
                            .map(|a| {
                                prices.get(t, a)?;
                                let complete = t + 1 >= periods
                                    && (t + 1 - periods..=t).all(|i| priced(i, a));
                                cell::flag(complete)
                            })
                            .collect()
                    })
                    .collect();
                Matrix::new(
                    prices.times().as_slice().to_vec(),
                    prices.assets().as_slice().to_vec(),
                    rows,
                )
                .map_err(|source| ConfigError::InvalidStep {
                    index: 0,
                    step: "universe",
                    source,
                })?
            }
        };
        Ok(mask)
    }
}

impl StepConfig {
    /// The `type` tag of this step.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LookBack { .. } => "LOOK_BACK",
            Self::Lag { .. } => "LAG",
            Self::Hold { .. } => "HOLD",
            Self::Quantiles { .. } => "QUANTILES",
            Self::Top { .. } => "TOP",
            Self::Bottom { .. } => "BOTTOM",
            Self::Thresholds { .. } => "THRESHOLDS",
            Self::Filter => "FILTER",
            Self::Ew => "EW",
            Self::Limit { .. } => "LIMIT",
        }
    }

    fn build(&self, index: usize, universe: &Matrix) -> Result<Step, ConfigError> {
        let invalid = |source| ConfigError::InvalidStep {
            index,
            step: self.kind(),
            source,
        };

        let step = match self {
            Self::LookBack { period, agg } => {
                let agg: Aggregation = agg.parse().map_err(invalid)?;
                steps::look_back(non_negative(index, "period", *period)?, agg)
            }
            Self::Lag { period } => Ok(steps::lag(non_negative(index, "period", *period)?)),
            Self::Hold { period, policy } => {
                steps::hold_with(non_negative(index, "period", *period)?, *policy)
            }
            Self::Quantiles { min_q, max_q } => steps::quantiles(*min_q, *max_q),
            Self::Top { k } => steps::top(*k),
            Self::Bottom { k } => steps::bottom(*k),
            Self::Thresholds { min_t, max_t } => steps::thresholds(*min_t, *max_t),
            Self::Filter => Ok(steps::filter(universe.clone())),
            Self::Ew => Ok(steps::ew()),
            Self::Limit {
                min_leverage,
                max_leverage,
            } => steps::limit(*min_leverage, *max_leverage),
        };
        step.map_err(invalid)
    }
}

fn non_negative(index: usize, field: &str, value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|_| ConfigError::InvalidValue {
        field: format!("steps[{index}].{field}"),
        reason: format!("must be non-negative, got {value}"),
    })
}
