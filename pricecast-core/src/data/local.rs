//! Local CSV provider, the last-resort source when the network ones fail.

use super::period::LookbackPeriod;
use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use super::store::read_price_csv;
use crate::domain::safe_ticker;
use std::fs;
use std::path::PathBuf;

/// Reads `{dir}/{TICKER}.csv`, typically the previously fetched raw file.
pub struct LocalCsvProvider {
    dir: PathBuf,
}

impl LocalCsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DataProvider for LocalCsvProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn fetch(&self, symbol: &str, _period: LookbackPeriod) -> Result<FetchResult, DataError> {
        let path = self.dir.join(format!("{}.csv", safe_ticker(symbol)));
        if !path.is_file() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }
        let series = read_price_csv(symbol, fs::File::open(&path)?)?;
        if series.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars: series.into_bars(),
            source: DataSource::LocalCsv,
        })
    }
}
