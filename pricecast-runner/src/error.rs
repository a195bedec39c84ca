//! Errors surfaced by pipeline stages.

use crate::config::ConfigError;
use pricecast_core::data::DataError;
use pricecast_core::error::ForecastError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no usable forecast for {ticker}: every model was skipped")]
    NoUsableForecast { ticker: String },
}

impl StageError {
    /// Conditions the orchestrator logs and skips instead of aborting.
    pub fn is_skippable(&self) -> bool {
        matches!(self, StageError::Forecast(e) if e.is_skippable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forecast_skips_are_skippable() {
        let skip: StageError = ForecastError::ConvergenceError("singular".into()).into();
        assert!(skip.is_skippable());
        let fatal: StageError = ForecastError::MissingColumn {
            column: "close".into(),
        }
        .into();
        assert!(!fatal.is_skippable());
        let none = StageError::NoUsableForecast {
            ticker: "AAPL".into(),
        };
        assert!(!none.is_skippable());
        assert!(none.to_string().contains("AAPL"));
    }
}
