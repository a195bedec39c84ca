//! PriceCast Runner: configuration and pipeline stages on top of
//! `pricecast-core`.
//!
//! - Layered configuration (defaults, TOML file, environment)
//! - Fetch with source fallback and raw-file cache
//! - Feature preprocessing with a chronological train/eval split
//! - Model training, hold-out evaluation and persisted bundles
//! - Per-model forecasts, ensemble blending and CSV/JSON export
//! - A per-ticker orchestrator that degrades stage by stage

pub mod config;
pub mod data_loader;
pub mod ensemble;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod forecast;
pub mod pipeline;
pub mod preprocess;
pub mod train;

pub use config::{ConfigError, PipelineConfig};
pub use data_loader::{build_fetcher, fetch_ticker, load_raw};
pub use ensemble::{ensemble, EnsembleOutput};
pub use error::StageError;
pub use evaluate::{evaluate, EvaluationMetrics};
pub use forecast::{forecast, ForecastBatch};
pub use pipeline::{Pipeline, PipelineReport};
pub use preprocess::{preprocess, PreprocessOutput};
pub use train::{train, TrainReport};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn stage_outputs_are_send_sync() {
        assert_send::<PipelineReport>();
        assert_sync::<PipelineReport>();
        assert_send::<EvaluationMetrics>();
        assert_sync::<EvaluationMetrics>();
    }

    #[test]
    fn stage_error_is_send_sync() {
        assert_send::<StageError>();
        assert_sync::<StageError>();
    }
}
