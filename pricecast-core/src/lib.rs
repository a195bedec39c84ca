//! PriceCast Core: price series, features, models, forecasters, ensembler.
//!
//! This crate holds everything between a raw OHLCV table and a final
//! forecast table:
//! - Domain types (bars, price series, forecast rows, trading calendar)
//! - Data providers with fallback, retry and a raw CSV store
//! - Close-price indicators and the feature engine
//! - Model adapters (gradient-boosted trees, seasonal ARIMA, LSTM) and
//!   their persisted bundles
//! - Recursive and direct forecasters, plus pattern adjustment
//! - The ensembler and its blend history

pub mod data;
pub mod domain;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod forecast;
pub mod indicators;
pub mod models;

pub use error::ForecastError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: shared types are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();
        require_send::<domain::ForecastRow>();
        require_sync::<domain::ForecastRow>();
        require_send::<domain::EnsembleRow>();
        require_sync::<domain::EnsembleRow>();
        require_send::<domain::TradingCalendar>();
        require_sync::<domain::TradingCalendar>();

        require_send::<features::FeatureTable>();
        require_sync::<features::FeatureTable>();
        require_send::<features::FeatureEngine>();
        require_sync::<features::FeatureEngine>();

        require_send::<models::TrainedModel>();
        require_sync::<models::TrainedModel>();
        require_send::<models::ModelStore>();
        require_sync::<models::ModelStore>();

        require_send::<forecast::RecursiveForecaster>();
        require_sync::<forecast::RecursiveForecaster>();
        require_send::<forecast::DirectForecaster>();
        require_sync::<forecast::DirectForecaster>();

        require_send::<ensemble::Ensembler>();
        require_sync::<ensemble::Ensembler>();
        require_send::<ensemble::BlendHistory>();
        require_sync::<ensemble::BlendHistory>();

        require_send::<data::Fetcher>();
        require_sync::<data::Fetcher>();
        require_send::<ForecastError>();
        require_sync::<ForecastError>();
    }

    /// Architecture contract: a recursive forecast only ever sees a model
    /// through the `Predictor` trait, so any point predictor plugs in.
    #[test]
    fn recursive_forecaster_accepts_trait_objects() {
        fn _check(
            forecaster: &forecast::RecursiveForecaster,
            model: &dyn models::Predictor,
            seed: &domain::PriceSeries,
        ) -> Result<Vec<domain::ForecastRow>, ForecastError> {
            forecaster.forecast(model, seed, 1)
        }
    }
}
