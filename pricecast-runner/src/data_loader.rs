//! Price loading for the runner.
//!
//! Builds the configured providers in fallback order and resolves a ticker
//! to a price series:
//! 1. A raw file younger than the cache TTL is reused
//! 2. Otherwise each source is tried in order (default stooq → yahoo → local)
//! 3. The first non-empty answer is cropped to the lookback period and
//!    written to the raw store, unless it came from the raw file itself
//! 4. If every source fails the ticker's run fails

use crate::config::PipelineConfig;
use crate::error::StageError;
use pricecast_core::data::{
    DataError, DataProvider, FetchOutcome, Fetcher, LocalCsvProvider, LookbackPeriod, RawStore,
    StooqProvider, YahooProvider,
};
use pricecast_core::domain::PriceSeries;
use tracing::debug;

/// Instantiate one provider by its configured name.
pub fn build_provider(
    name: &str,
    config: &PipelineConfig,
) -> Result<Box<dyn DataProvider>, StageError> {
    let provider: Box<dyn DataProvider> = match name {
        "stooq" => Box::new(StooqProvider::new(config.retry_policy())?),
        "yahoo" => Box::new(YahooProvider::new(config.retry_policy())?),
        "local" => Box::new(LocalCsvProvider::new(config.raw_dir())),
        other => {
            return Err(DataError::Other(format!("unknown data source '{other}'")).into());
        }
    };
    Ok(provider)
}

pub fn build_fetcher(config: &PipelineConfig) -> Result<Fetcher, StageError> {
    let providers = config
        .fetch
        .sources
        .iter()
        .map(|name| build_provider(name, config))
        .collect::<Result<Vec<_>, _>>()?;
    let fetcher = Fetcher::new(providers, RawStore::new(config.raw_dir()), config.cache_ttl());
    debug!(sources = ?fetcher.provider_names(), "fetcher ready");
    Ok(fetcher)
}

/// Fetch `ticker` through the fallback chain and persist the raw CSV.
pub fn fetch_ticker(
    config: &PipelineConfig,
    ticker: &str,
    period: LookbackPeriod,
) -> Result<FetchOutcome, StageError> {
    Ok(build_fetcher(config)?.fetch(ticker, period)?)
}

/// The stored raw series for `ticker`, without touching the network.
pub fn load_raw(config: &PipelineConfig, ticker: &str) -> Result<PriceSeries, StageError> {
    Ok(RawStore::new(config.raw_dir()).load(ticker)?)
}
