//! FactorLab Runner: pipeline configuration, price loading, run orchestration.
//!
//! This crate builds on `factorlab-core` to provide:
//! - TOML pipeline configuration with content-addressed pipeline IDs
//! - Wide-CSV price loading and result writing
//! - Deterministic synthetic prices (tagged) for development
//! - Single and batch pipeline runs with data-quality warnings

pub mod config;
pub mod data_loader;
pub mod runner;

pub use config::{ConfigError, PipelineConfig, PipelineId, StepConfig, UniverseConfig};
pub use data_loader::{
    dataset_hash, load_prices_csv, read_prices, synthetic_prices, write_matrix_csv,
    write_series_csv, LoadError, LoadedPrices,
};
pub use runner::{run_batch, run_pipeline, RunError, RunResult, SCHEMA_VERSION};
