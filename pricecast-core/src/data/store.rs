//! Raw price CSV reading/writing and the on-disk raw store.
//!
//! Sources disagree on column naming, so reading normalizes headers
//! case-insensitively. The close column is resolved in priority order:
//! `Close`, then `Adj Close` (or `adj_close`/`adjclose`), then `Price`.
//! Open/high/low default to the close when absent and volume to zero.

use chrono::NaiveDate;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::provider::DataError;
use crate::domain::{safe_ticker, Bar, PriceSeries};

const CLOSE_ALIASES: [&[&str]; 3] = [&["close"], &["adj close", "adj_close", "adjclose"], &["price"]];

fn normalize_header(h: &str) -> String {
    h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h.as_str()))
}

/// Parse a date cell. Accepts `YYYY-MM-DD` with an optional time/offset
/// suffix, as written by most exporters.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    let head = cell.get(..10).unwrap_or(cell);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_number(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Read a daily price CSV into a [`PriceSeries`].
///
/// Rows whose date or close cannot be parsed are dropped. A missing date or
/// close column is an error.
pub fn read_price_csv<R: Read>(ticker: &str, reader: R) -> Result<PriceSeries, DataError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();

    let date_idx = find_column(&headers, &["date", "datetime", "timestamp"]).ok_or_else(|| {
        DataError::MissingColumn {
            column: "date".into(),
        }
    })?;
    let close_idx = CLOSE_ALIASES
        .iter()
        .find_map(|names| find_column(&headers, names))
        .ok_or_else(|| DataError::MissingColumn {
            column: "close".into(),
        })?;
    let open_idx = find_column(&headers, &["open"]);
    let high_idx = find_column(&headers, &["high"]);
    let low_idx = find_column(&headers, &["low"]);
    let volume_idx = find_column(&headers, &["volume"]);

    let mut bars = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let Some(date) = record.get(date_idx).and_then(parse_date) else {
            continue;
        };
        let Some(close) = parse_number(record.get(close_idx)) else {
            continue;
        };
        let field = |idx: Option<usize>| idx.and_then(|i| parse_number(record.get(i)));
        bars.push(Bar {
            date,
            open: field(open_idx).unwrap_or(close),
            high: field(high_idx).unwrap_or(close),
            low: field(low_idx).unwrap_or(close),
            close,
            volume: field(volume_idx).unwrap_or(0.0),
        });
    }
    Ok(PriceSeries::new(ticker, bars))
}

/// Write a series as `Date,Open,High,Low,Close,Volume`.
pub fn write_price_csv<W: Write>(series: &PriceSeries, writer: W) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Date", "Open", "High", "Low", "Close", "Volume"])?;
    for bar in series.bars() {
        wtr.write_record([
            bar.date.to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so
/// readers never observe a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

/// `data/raw/{TICKER}.csv` files, one per ticker.
#[derive(Debug, Clone)]
pub struct RawStore {
    dir: PathBuf,
}

impl RawStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", safe_ticker(ticker)))
    }

    pub fn exists(&self, ticker: &str) -> bool {
        self.path_for(ticker).is_file()
    }

    /// True when the stored file exists and was written less than `ttl` ago.
    pub fn is_fresh(&self, ticker: &str, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }
        fs::metadata(self.path_for(ticker))
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age < ttl)
    }

    pub fn load(&self, ticker: &str) -> Result<PriceSeries, DataError> {
        let path = self.path_for(ticker);
        if !path.is_file() {
            return Err(DataError::NoCachedData {
                symbol: ticker.to_string(),
            });
        }
        let file = fs::File::open(&path)?;
        read_price_csv(ticker, file)
    }

    pub fn save(&self, series: &PriceSeries) -> Result<PathBuf, DataError> {
        let path = self.path_for(series.ticker());
        let mut buf = Vec::new();
        write_price_csv(series, &mut buf)?;
        write_atomic(&path, &buf)?;
        Ok(path)
    }
}
