//! Stooq daily CSV provider.
//!
//! Stooq serves full daily history as CSV without authentication. Plain US
//! tickers need a `.US` suffix and a couple of index symbols are spelled
//! differently than on Yahoo.

use super::period::LookbackPeriod;
use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use super::retry::RetryPolicy;
use super::store::read_price_csv;
use std::time::Duration;
use tracing::debug;

/// Map a Yahoo-style ticker onto Stooq's symbol namespace.
pub fn stooq_symbol(ticker: &str) -> String {
    let upper = ticker.trim().to_ascii_uppercase();
    match upper.as_str() {
        "^GSPC" => "^SPX".to_string(),
        "^IXIC" => "^NDQ".to_string(),
        _ if upper.starts_with('^') || upper.contains('.') => upper,
        _ => format!("{upper}.US"),
    }
}

pub struct StooqProvider {
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
}

impl StooqProvider {
    pub fn new(retry: RetryPolicy) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, retry })
    }

    fn csv_url(symbol: &str) -> String {
        format!(
            "https://stooq.com/q/d/l/?s={}&i=d",
            symbol.to_ascii_lowercase()
        )
    }

    fn fetch_once(&self, ticker: &str, url: &str) -> Result<String, DataError> {
        let resp = self.client.get(url).send().map_err(|e| {
            DataError::NetworkUnreachable(format!("stooq request for {ticker} failed: {e}"))
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                provider: "stooq".into(),
                status: status.as_u16(),
            });
        }
        resp.text()
            .map_err(|e| DataError::NetworkUnreachable(format!("stooq body for {ticker}: {e}")))
    }

    /// Stooq answers unknown symbols with `No data` (or an HTML page) and a
    /// 200 status, so the body is checked before CSV parsing.
    fn parse_body(ticker: &str, body: &str) -> Result<FetchResult, DataError> {
        let trimmed = body.trim_start();
        if trimmed.is_empty() || trimmed.starts_with("No data") {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        if trimmed.starts_with('<') {
            return Err(DataError::ResponseFormatChanged(
                "stooq returned HTML instead of CSV".into(),
            ));
        }
        let series = read_price_csv(ticker, trimmed.as_bytes())?;
        if series.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        Ok(FetchResult {
            symbol: ticker.to_string(),
            bars: series.into_bars(),
            source: DataSource::Stooq,
        })
    }
}

impl DataProvider for StooqProvider {
    fn name(&self) -> &str {
        "stooq"
    }

    fn fetch(&self, symbol: &str, _period: LookbackPeriod) -> Result<FetchResult, DataError> {
        let url = Self::csv_url(&stooq_symbol(symbol));
        debug!(%symbol, %url, "stooq fetch");
        let body = self.retry.run("stooq", |_| self.fetch_once(symbol, &url))?;
        Self::parse_body(symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_mapping() {
        assert_eq!(stooq_symbol("aapl"), "AAPL.US");
        assert_eq!(stooq_symbol("^GSPC"), "^SPX");
        assert_eq!(stooq_symbol("^IXIC"), "^NDQ");
        assert_eq!(stooq_symbol("^DJI"), "^DJI");
        assert_eq!(stooq_symbol("BMW.DE"), "BMW.DE");
    }

    #[test]
    fn url_is_lowercase() {
        assert_eq!(
            StooqProvider::csv_url("AAPL.US"),
            "https://stooq.com/q/d/l/?s=aapl.us&i=d"
        );
    }

    #[test]
    fn parses_csv_body() {
        let body = "Date,Open,High,Low,Close,Volume\n2024-01-02,1,2,0.5,1.5,100\n";
        let res = StooqProvider::parse_body("AAPL", body).unwrap();
        assert_eq!(res.bars.len(), 1);
        assert_eq!(res.source, DataSource::Stooq);
    }

    #[test]
    fn no_data_body_is_symbol_not_found() {
        assert!(matches!(
            StooqProvider::parse_body("NOPE", "No data"),
            Err(DataError::SymbolNotFound { .. })
        ));
        assert!(matches!(
            StooqProvider::parse_body("NOPE", "<html></html>"),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }
}
