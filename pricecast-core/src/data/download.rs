//! Fetch orchestrator: cache check, source fallback, crop, persist.

use super::period::LookbackPeriod;
use super::provider::{DataError, DataProvider, DataSource};
use super::store::RawStore;
use crate::domain::PriceSeries;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of fetching one ticker.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub series: PriceSeries,
    pub source: DataSource,
    pub path: PathBuf,
}

/// Walks an ordered list of providers and stores the first usable answer.
pub struct Fetcher {
    providers: Vec<Box<dyn DataProvider>>,
    store: RawStore,
    ttl: Duration,
}

impl Fetcher {
    pub fn new(providers: Vec<Box<dyn DataProvider>>, store: RawStore, ttl: Duration) -> Self {
        Self {
            providers,
            store,
            ttl,
        }
    }

    pub fn store(&self) -> &RawStore {
        &self.store
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Fetch one ticker.
    ///
    /// A stored file younger than the TTL is returned as-is. Otherwise each
    /// provider is tried in order; the first non-empty answer is cropped to
    /// `period` (relative to its last bar) and written to the raw store.
    /// A local-file answer is cropped but never written back.
    pub fn fetch(&self, ticker: &str, period: LookbackPeriod) -> Result<FetchOutcome, DataError> {
        if self.store.is_fresh(ticker, self.ttl) {
            let series = self.store.load(ticker)?;
            if !series.is_empty() {
                info!(%ticker, rows = series.len(), "using cached raw data");
                return Ok(FetchOutcome {
                    path: self.store.path_for(ticker),
                    series: series.crop_last_days(period.days()),
                    source: DataSource::Cache,
                });
            }
        }

        let mut tried = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            tried.push(provider.name().to_string());
            match provider.fetch(ticker, period) {
                Ok(result) if !result.bars.is_empty() => {
                    let series =
                        PriceSeries::new(ticker, result.bars).crop_last_days(period.days());
                    // The local source reads the raw file itself; writing the
                    // crop back would truncate it.
                    let path = match result.source {
                        DataSource::LocalCsv => self.store.path_for(ticker),
                        _ => self.store.save(&series)?,
                    };
                    info!(
                        %ticker,
                        source = provider.name(),
                        rows = series.len(),
                        path = %path.display(),
                        "fetched"
                    );
                    return Ok(FetchOutcome {
                        series,
                        source: result.source,
                        path,
                    });
                }
                Ok(_) => warn!(%ticker, source = provider.name(), "source returned no rows"),
                Err(e) => warn!(%ticker, source = provider.name(), error = %e, "source failed"),
            }
        }

        Err(DataError::AllSourcesFailed {
            symbol: ticker.to_string(),
            tried,
        })
    }

    /// Fetch several tickers, collecting failures instead of stopping.
    pub fn fetch_many(&self, tickers: &[String], period: LookbackPeriod) -> DownloadSummary {
        let mut summary = DownloadSummary {
            total: tickers.len(),
            ..DownloadSummary::default()
        };
        for ticker in tickers {
            match self.fetch(ticker, period) {
                Ok(outcome) => summary.fetched.push((ticker.clone(), outcome)),
                Err(e) => summary.errors.push((ticker.clone(), e)),
            }
        }
        summary
    }
}

/// Summary of a batch fetch.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub total: usize,
    pub fetched: Vec<(String, FetchOutcome)>,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}
