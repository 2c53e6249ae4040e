//! Bar loading for the runner.
//!
//! Two sources:
//! 1. CSV file with a timestamp column and OHLC(V) columns
//! 2. Synthetic random walk (`--synthetic`), seeded and reproducible
//!
//! Synthetic data is a developer-only debug mode. Results produced on
//! synthetic data are tagged as such.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use goldx_core::domain::{check_timeline, Bar};
use goldx_core::fingerprint::{dataset_hash, Fingerprint};
use goldx_core::InputError;

/// Accepted names for the timestamp column (case-insensitive).
const TIMESTAMP_COLUMNS: [&str; 4] = ["date", "datetime", "timestamp", "time"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: unparseable timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: column '{column}' is not a number: '{value}'")]
    BadNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid bar series: {0}")]
    Input(#[from] InputError),
}

/// Where a bar series came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic { seed: u64 },
}

/// Result of loading bars, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over every timestamp and OHLCV value.
    pub dataset_hash: Fingerprint,
    /// Rows discarded because an OHLC field was empty, NaN or inconsistent.
    pub dropped_rows: usize,
}

impl LoadedBars {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic { .. })
    }
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| find(name).ok_or_else(|| LoadError::MissingColumn(name.into()));

        let timestamp = TIMESTAMP_COLUMNS
            .iter()
            .find_map(|&name| find(name))
            .ok_or_else(|| LoadError::MissingColumn("date".into()))?;

        Ok(Self {
            timestamp,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
        })
    }
}

/// Load bars from a CSV file.
pub fn load_csv(path: &Path) -> Result<LoadedBars, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (bars, dropped_rows) = read_bars(file)?;
    debug!("loaded {} bars from {}", bars.len(), path.display());
    Ok(LoadedBars {
        dataset_hash: dataset_hash(&bars),
        bars,
        source: DataSource::Csv(path.to_path_buf()),
        dropped_rows,
    })
}

/// Parse bars from CSV text.
///
/// Rows whose open, high, low or close is empty or NaN are dropped with a
/// warning, as are rows with non-positive prices or a high/low range that
/// does not contain open and close. Any other unparseable field is an error. The surviving bars
/// must have strictly increasing timestamps. Returns the bars and the number
/// of dropped rows.
pub fn read_bars<R: Read>(reader: R) -> Result<(Vec<Bar>, usize), LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::resolve(rdr.headers()?)?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // 1-based data row numbers, header excluded.
        let row = i + 1;

        let raw_ts = record.get(columns.timestamp).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        let ohlc = [
            ("open", columns.open),
            ("high", columns.high),
            ("low", columns.low),
            ("close", columns.close),
        ];
        let mut values = [0.0_f64; 4];
        let mut missing = false;
        for (slot, (name, idx)) in values.iter_mut().zip(ohlc) {
            match parse_number(record.get(idx).unwrap_or(""), row, name)? {
                Some(v) => *slot = v,
                None => missing = true,
            }
        }
        if missing {
            warn!("row {row} ({timestamp}): missing OHLC value, dropped");
            dropped += 1;
            continue;
        }

        let volume = match columns.volume {
            Some(idx) => parse_number(record.get(idx).unwrap_or(""), row, "volume")?.unwrap_or(0.0),
            None => 0.0,
        };

        let [open, high, low, close] = values;
        let bar = Bar::new(timestamp, open, high, low, close, volume);
        if !bar.is_well_formed() {
            warn!("row {row} ({timestamp}): malformed OHLC {open}/{high}/{low}/{close}, dropped");
            dropped += 1;
            continue;
        }
        bars.push(bar);
    }

    if dropped > 0 {
        warn!("dropped {dropped} row(s) with missing or malformed OHLC values");
    }
    check_timeline(&bars, 2)?;
    Ok((bars, dropped))
}

/// Empty, `NaN` and `null` read as missing.
fn parse_number(raw: &str, row: usize, column: &str) -> Result<Option<f64>, LoadError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(LoadError::BadNumber {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Dates become midnight; date-times may use `T` or a space, and RFC 3339
/// offsets are converted to UTC.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Synthetic weekday bars for offline demos and tests.
///
/// A multiplicative random walk from 100.0 starting 2020-01-02. The same
/// seed always yields the same bars.
pub fn synthetic_bars(n: usize, seed: u64) -> LoadedBars {
    let bars = generate_synthetic_bars(n, seed);
    LoadedBars {
        dataset_hash: dataset_hash(&bars),
        bars,
        source: DataSource::Synthetic { seed },
        dropped_rows: 0,
    }
}

fn generate_synthetic_bars(n: usize, seed: u64) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0_f64;
    let mut current = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default();

    while bars.len() < n {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.02..0.021);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;

        bars.push(Bar::new(
            current.and_time(chrono::NaiveTime::default()),
            open,
            high,
            low,
            close,
            volume,
        ));

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
