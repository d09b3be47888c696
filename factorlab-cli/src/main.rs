//! FactorLab CLI: run and validate factor pipelines.
//!
//! Commands:
//! - `run`: execute a pipeline from a TOML config over a price CSV or synthetic prices
//! - `validate`: parse a pipeline config and build every step without running it

use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use factorlab_runner::{
    load_prices_csv, run_pipeline, synthetic_prices, write_series_csv, PipelineConfig, RunResult,
};

#[derive(Parser)]
#[command(
    name = "factorlab",
    about = "FactorLab CLI: point-in-time factor strategy pipelines"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline from a TOML config file.
    Run {
        /// Path to a TOML pipeline config.
        #[arg(long)]
        config: PathBuf,

        /// Wide price CSV: a `date` column then one column per asset.
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Generate synthetic prices for these assets instead (comma-separated).
        #[arg(long, value_delimiter = ',')]
        synthetic: Vec<String>,

        /// Number of monthly periods of synthetic prices.
        #[arg(long, default_value_t = 120)]
        periods: usize,

        /// Seed for synthetic prices.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First date of synthetic prices (YYYY-MM-DD).
        #[arg(long, default_value = "2010-01-31")]
        start: String,

        /// Write the portfolio return series to this CSV file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the full run result as JSON to this file.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Parse a config and build its steps without running.
    Validate {
        /// Path to a TOML pipeline config.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            config,
            prices,
            synthetic,
            periods,
            seed,
            start,
            output,
            json,
        } => run_cmd(config, prices, synthetic, periods, seed, &start, output, json),
        Commands::Validate { config } => validate_cmd(config),
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_cmd(
    config_path: PathBuf,
    prices_path: Option<PathBuf>,
    synthetic: Vec<String>,
    periods: usize,
    seed: u64,
    start: &str,
    output: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<()> {
    // Validate mutually exclusive options
    if prices_path.is_some() && !synthetic.is_empty() {
        bail!("--prices and --synthetic are mutually exclusive");
    }

    let config = PipelineConfig::from_file(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let data = match prices_path {
        Some(path) => load_prices_csv(&path)?,
        None if !synthetic.is_empty() => {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
                .with_context(|| format!("invalid --start date '{start}'"))?;
            let assets: Vec<&str> = synthetic.iter().map(|s| s.trim()).collect();
            synthetic_prices(&assets, start, periods, seed)?
        }
        None => bail!("one of --prices or --synthetic is required"),
    };

    let result = run_pipeline(&config, &data)?;
    print_summary(&result);

    if let Some(path) = output {
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        write_series_csv(file, &result.returns)?;
        println!("Returns written to: {}", path.display());
    }
    if let Some(path) = json {
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &result)?;
        println!("Result written to: {}", path.display());
    }

    Ok(())
}

fn validate_cmd(config_path: PathBuf) -> Result<()> {
    let config = PipelineConfig::from_file(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    config.validate()?;

    println!(
        "{}: {} step(s), universe {:?}",
        config.name.as_deref().unwrap_or("unnamed pipeline"),
        config.steps.len(),
        config.universe
    );
    for (i, step) in config.steps.iter().enumerate() {
        println!("  {i}: {}", step.kind());
    }
    println!("Pipeline ID: {}", config.pipeline_id()?);
    Ok(())
}

fn print_summary(result: &RunResult) {
    println!();
    println!(
        "=== {} ===",
        result.name.as_deref().unwrap_or("unnamed pipeline")
    );
    if result.has_synthetic {
        println!("  [SYNTHETIC DATA]");
    }
    println!("Pipeline ID:    {}", result.pipeline_id);
    println!("Dataset hash:   {}", result.dataset_hash);
    println!(
        "Data:           {} periods x {} assets",
        result.period_count, result.asset_count
    );
    println!("Active periods: {}", result.active_periods);
    println!("Total return:   {:.2}%", result.total_return * 100.0);

    let mean = if result.returns.is_empty() {
        0.0
    } else {
        result.returns.values().iter().sum::<f64>() / result.returns.len() as f64
    };
    println!("Mean return:    {:.4}%", mean * 100.0);

    for warning in &result.data_quality_warnings {
        println!("  WARNING: {warning}");
    }
}
