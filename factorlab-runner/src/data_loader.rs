//! Price loading and result writing for the runner.
//!
//! Prices come from one of two places:
//! 1. A wide CSV file: a `date` column (`YYYY-MM-DD`) then one column per asset
//! 2. A synthetic random walk (`--synthetic`), tagged so results can be told apart
//!
//! Synthetic data is a developer-only debug mode.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{Months, NaiveDate};
use thiserror::Error;

use factorlab_core::matrix::{Cell, Matrix, Series};
use factorlab_core::PipelineError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("first CSV column must be `date`, found '{found}'")]
    MissingDateColumn { found: String },

    #[error("line {line}: invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { line: u64, value: String },

    #[error("no price rows found")]
    Empty,

    #[error("invalid price data: {0}")]
    Matrix(#[from] PipelineError),

    #[error("synthetic date range overflows the calendar")]
    DateOverflow,
}

/// Prices ready for a run, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedPrices {
    pub prices: Matrix,
    /// BLAKE3 over dates, assets and values.
    pub dataset_hash: String,
    /// Whether the prices were generated rather than loaded.
    pub has_synthetic: bool,
}

impl LoadedPrices {
    pub fn new(prices: Matrix, has_synthetic: bool) -> Self {
        let dataset_hash = dataset_hash(&prices);
        Self {
            prices,
            dataset_hash,
            has_synthetic,
        }
    }
}

/// Load a wide price CSV from disk.
pub fn load_prices_csv(path: &Path) -> Result<LoadedPrices, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let prices = read_prices(file)?;
    tracing::info!(
        path = %path.display(),
        periods = prices.n_times(),
        assets = prices.n_assets(),
        "loaded prices"
    );
    Ok(LoadedPrices::new(prices, false))
}

/// Parse a wide price CSV.
///
/// Rows may appear in any date order; a repeated date or asset is an error. Empty cells
/// and cells that do not parse as a finite number are missing.
pub fn read_prices<R: Read>(reader: R) -> Result<Matrix, LoadError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let first = headers.get(0).unwrap_or_default();
    if !first.eq_ignore_ascii_case("date") {
        return Err(LoadError::MissingDateColumn {
            found: first.to_string(),
        });
    }
    let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut rows: Vec<(NaiveDate, Vec<Cell>)> = Vec::new();
    let mut unparsable = 0usize;
    for record in csv.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|_| {
            LoadError::InvalidDate {
                line,
                value: raw_date.to_string(),
            }
        })?;

        let cells = record
            .iter()
            .skip(1)
            .map(|field| {
                if field.is_empty() {
                    return None;
                }
                let parsed = field.parse::<f64>().ok().filter(|v| v.is_finite());
                if parsed.is_none() {
                    unparsable += 1;
                }
                parsed
            })
            .collect();
        rows.push((date, cells));
    }

    if rows.is_empty() {
        return Err(LoadError::Empty);
    }
    if unparsable > 0 {
        tracing::warn!(cells = unparsable, "unparsable price cells treated as missing");
    }

    rows.sort_by_key(|(date, _)| *date);
    let (times, values): (Vec<NaiveDate>, Vec<Vec<Cell>>) = rows.into_iter().unzip();
    Ok(Matrix::new(times, assets, values)?)
}

/// Write a return series as `date,return` CSV.
pub fn write_series_csv<W: Write>(writer: W, series: &Series) -> Result<(), LoadError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["date", "return"])?;
    for (date, value) in series.iter() {
        csv.write_record([date.format(DATE_FORMAT).to_string(), value.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write a matrix in the same wide layout `read_prices` accepts. Missing cells are empty.
pub fn write_matrix_csv<W: Write>(writer: W, matrix: &Matrix) -> Result<(), LoadError> {
    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec!["date".to_string()];
    header.extend(matrix.assets().iter().map(str::to_string));
    csv.write_record(&header)?;

    for (date, row) in matrix.times().iter().zip(matrix.rows()) {
        let mut record = vec![date.format(DATE_FORMAT).to_string()];
        record.extend(row.iter().map(|c| c.map(|v| v.to_string()).unwrap_or_default()));
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Generate month-end-spaced synthetic prices for development.
///
/// Each asset follows its own random walk from 100.0, seeded from the asset name and
/// `seed`, so the same inputs always give the same prices.
pub fn synthetic_prices(
    assets: &[&str],
    start: NaiveDate,
    periods: usize,
    seed: u64,
) -> Result<LoadedPrices, LoadError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    if periods == 0 || assets.is_empty() {
        return Err(LoadError::Empty);
    }
    tracing::warn!(
        assets = assets.len(),
        periods,
        "generating synthetic prices; results will be tagged as synthetic"
    );

    let times = (0..periods)
        .map(|i| {
            u32::try_from(i)
                .ok()
                .and_then(|i| start.checked_add_months(Months::new(i)))
                .ok_or(LoadError::DateOverflow)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let columns = assets.iter().map(|asset| {
        // Deterministic seed from asset name and run seed
        let mut hasher = blake3::Hasher::new();
        hasher.update(asset.as_bytes());
        hasher.update(&seed.to_le_bytes());
        let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

        let mut price = 100.0_f64;
        let column: Vec<Cell> = (0..periods)
            .map(|_| {
                let current = price;
                let monthly_return: f64 = rng.gen_range(-0.08..0.08);
                price *= 1.0 + monthly_return;
                Some(current)
            })
            .collect();
        (asset.to_string(), column)
    });

    let prices = Matrix::from_columns(times, columns)?;
    Ok(LoadedPrices::new(prices, true))
}

/// Compute a deterministic BLAKE3 hash over a matrix.
///
/// The hash covers dates, asset identifiers and every cell in canonical order; a missing
/// cell hashes differently from any number.
pub fn dataset_hash(matrix: &Matrix) -> String {
    let mut hasher = blake3::Hasher::new();

    for date in matrix.times().iter() {
        hasher.update(date.to_string().as_bytes());
    }
    for asset in matrix.assets().iter() {
        hasher.update(asset.as_bytes());
        hasher.update(&[0]);
    }
    for cell in matrix.values() {
        match cell {
            Some(v) => {
                hasher.update(&[1]);
                hasher.update(&v.to_le_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
    }

    hasher.finalize().to_hex().to_string()
}
