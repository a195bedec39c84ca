//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price sources (Stooq, Yahoo Finance,
//! a local CSV) so the fetch stage can walk a fallback list and tests can
//! substitute in-memory providers.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::period::LookbackPeriod;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} from {provider}")]
    HttpStatus { provider: String, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("missing column '{column}' in price data")]
    MissingColumn { column: String },

    #[error("invalid period '{0}' (expected e.g. 30d, 6mo, 2y, max)")]
    InvalidPeriod(String),

    #[error("no cached data for '{symbol}', run `fetch {symbol}` first")]
    NoCachedData { symbol: String },

    #[error("all sources failed for '{symbol}': {}", tried.join(", "))]
    AllSourcesFailed { symbol: String, tried: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Transient failures worth another attempt against the same source.
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::NetworkUnreachable(_) | DataError::RateLimited { .. } => true,
            DataError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result of a successful data fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Stooq,
    YahooFinance,
    LocalCsv,
    Cache,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataSource::Stooq => "stooq",
            DataSource::YahooFinance => "yahoo",
            DataSource::LocalCsv => "local",
            DataSource::Cache => "cache",
        };
        f.write_str(s)
    }
}

/// A source of daily OHLCV history.
///
/// Providers return whatever history the source has for the period; cropping,
/// caching and persistence happen above this trait.
pub trait DataProvider: Send + Sync {
    /// Short name used in config and logs (`stooq`, `yahoo`, `local`).
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str, period: LookbackPeriod) -> Result<FetchResult, DataError>;
}
