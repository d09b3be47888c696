//! Pipeline runner: wires together configuration, prices and evaluation.
//!
//! Two entry points:
//! - `run_pipeline()`: one configuration over one price set. Used by the CLI.
//! - `run_batch()`: several configurations over the same prices, in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use factorlab_core::matrix::Series;
use factorlab_core::pipeline::{compose, steps};
use factorlab_core::transforms;
use factorlab_core::PipelineError;

use crate::config::{ConfigError, PipelineConfig};
use crate::data_loader::{LoadError, LoadedPrices};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub pipeline_id: String,
    pub dataset_hash: String,
    pub name: Option<String>,
    /// Portfolio return per period.
    pub returns: Series,
    /// Compounded return over the whole run.
    pub total_return: f64,
    /// Periods with a non-zero portfolio return.
    pub active_periods: usize,
    pub has_synthetic: bool,
    pub period_count: usize,
    pub asset_count: usize,
    pub data_quality_warnings: Vec<String>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one pipeline configuration over `data`.
///
/// The universe mask and per-period returns are derived from the prices; the configured
/// steps are composed and followed by `evaluate`.
pub fn run_pipeline(config: &PipelineConfig, data: &LoadedPrices) -> Result<RunResult, RunError> {
    let prices = &data.prices;
    let pipeline_id = config.pipeline_id()?;
    tracing::info!(
        pipeline = config.name.as_deref().unwrap_or("unnamed"),
        id = &pipeline_id[..12],
        periods = prices.n_times(),
        assets = prices.n_assets(),
        "running pipeline"
    );

    let universe = config.universe.mask(prices)?;
    let universe_returns = transforms::to_returns(prices);
    let pipeline = compose(config.build_steps(&universe)?).then(steps::evaluate(universe_returns));
    let returns = pipeline.apply(prices)?;

    let warnings = data_quality_warnings(data);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    let total_return = returns.values().iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
    let active_periods = returns.values().iter().filter(|r| **r != 0.0).count();
    tracing::info!(total_return, active_periods, "pipeline finished");

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        pipeline_id,
        dataset_hash: data.dataset_hash.clone(),
        name: config.name.clone(),
        returns,
        total_return,
        active_periods,
        has_synthetic: data.has_synthetic,
        period_count: prices.n_times(),
        asset_count: prices.n_assets(),
        data_quality_warnings: warnings,
    })
}

/// Run several configurations over the same prices in parallel.
///
/// Results are returned in input order. One failing configuration does not stop the
/// others.
pub fn run_batch(configs: &[PipelineConfig], data: &LoadedPrices) -> Vec<Result<RunResult, RunError>> {
    configs
        .par_iter()
        .map(|config| run_pipeline(config, data))
        .collect()
}

fn data_quality_warnings(data: &LoadedPrices) -> Vec<String> {
    let prices = &data.prices;
    let mut warnings = Vec::new();

    if data.has_synthetic {
        warnings.push("prices are synthetic".to_string());
    }

    let empty_periods = prices
        .rows()
        .filter(|row| row.iter().all(Option::is_none))
        .count();
    if empty_periods > 0 {
        warnings.push(format!("{empty_periods} period(s) have no prices"));
    }

    for (a, asset) in prices.assets().iter().enumerate() {
        if prices.column(a).iter().all(Option::is_none) {
            warnings.push(format!("asset '{asset}' has no prices"));
        }
    }

    warnings
}
