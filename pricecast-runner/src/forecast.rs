//! Forecast stage: one table per model family, written to
//! `results/{TICKER}_{model}_{h}d.csv`.
//!
//! - gbm: recursive one-step loop over the stored bundle, optionally
//!   pattern-adjusted
//! - seasonal: refit on the full business-day close history with the stored
//!   bundle's parameters (configured parameters when no bundle exists)
//! - lstm: direct multi-output forecast from the stored bundle
//!
//! A model that cannot forecast (short history, failed fit) is skipped. A
//! missing bundle for an enabled model fails the stage.

use std::collections::BTreeMap;
use std::path::PathBuf;

use pricecast_core::domain::{ForecastRow, PriceSeries};
use pricecast_core::features::FeatureEngine;
use pricecast_core::forecast::{DirectForecaster, RecursiveForecaster};
use pricecast_core::models::{ModelKind, ModelStore};
use pricecast_core::ForecastError;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::data_loader::load_raw;
use crate::error::StageError;
use crate::export::{forecast_path, save_forecast};
use crate::train::model_store;

#[derive(Debug, Clone, Default)]
pub struct ForecastBatch {
    /// Keyed by model tag (`gbm`, `seasonal`, `lstm`).
    pub tables: BTreeMap<String, Vec<ForecastRow>>,
    pub paths: Vec<PathBuf>,
    pub skipped: Vec<(ModelKind, String)>,
}

impl ForecastBatch {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Model families the configuration enables, in forecast order.
pub fn enabled_models(config: &PipelineConfig) -> Vec<ModelKind> {
    ModelKind::ALL
        .into_iter()
        .filter(|kind| match kind {
            ModelKind::GradientBoosted => !config.models.skip_gbm,
            ModelKind::Seasonal => true,
            ModelKind::Sequence => config.models.use_lstm,
        })
        .collect()
}

fn forecast_gbm(
    config: &PipelineConfig,
    store: &ModelStore,
    series: &PriceSeries,
    horizon: usize,
) -> Result<Vec<ForecastRow>, ForecastError> {
    let model = store.load(series.ticker(), ModelKind::GradientBoosted)?;
    let engine = FeatureEngine::new(model.feature_config.clone())?;
    let forecaster = RecursiveForecaster::new(engine, config.calendar());
    let mut rows = forecaster.forecast(&model, series, horizon)?;
    if config.forecast.pattern_adjust {
        let adjusted = config
            .pattern_adjuster()
            .adjust(&series.closes(), &mut rows);
        debug!(ticker = series.ticker(), adjusted, "pattern adjustment");
    }
    Ok(rows)
}

fn forecast_one(
    config: &PipelineConfig,
    store: &ModelStore,
    kind: ModelKind,
    series: &PriceSeries,
    horizon: usize,
) -> Result<Vec<ForecastRow>, ForecastError> {
    let direct = DirectForecaster::new(config.calendar(), config.seasonal_params());
    match kind {
        ModelKind::GradientBoosted => forecast_gbm(config, store, series, horizon),
        ModelKind::Seasonal if store.exists(series.ticker(), ModelKind::Seasonal) => {
            let model = store.load(series.ticker(), ModelKind::Seasonal)?;
            direct.forecast_with(&model, series, horizon)
        }
        ModelKind::Seasonal => direct.forecast_seasonal(series, horizon),
        ModelKind::Sequence => {
            let model = store.load(series.ticker(), ModelKind::Sequence)?;
            direct.forecast_with(&model, series, horizon)
        }
    }
}

/// Forecast `horizon` trading days for each of `kinds` from `series`.
pub fn forecast_series(
    config: &PipelineConfig,
    series: &PriceSeries,
    horizon: usize,
    kinds: &[ModelKind],
) -> Result<ForecastBatch, StageError> {
    let store = model_store(config);
    let ticker = series.ticker();
    let mut batch = ForecastBatch::default();
    for &kind in kinds {
        match forecast_one(config, &store, kind, series, horizon) {
            Ok(rows) if rows.is_empty() => {
                warn!(%ticker, model = %kind, "model produced no rows");
                batch.skipped.push((kind, "empty forecast".to_string()));
            }
            Ok(rows) => {
                let path = forecast_path(config, ticker, kind.as_str(), horizon);
                save_forecast(&path, &rows)?;
                batch.paths.push(path);
                batch.tables.insert(kind.as_str().to_string(), rows);
            }
            Err(e) if e.is_skippable() => {
                warn!(%ticker, model = %kind, error = %e, "forecast skipped");
                batch.skipped.push((kind, e.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(
        %ticker,
        horizon,
        models = batch.tables.len(),
        skipped = batch.skipped.len(),
        "forecasts written"
    );
    Ok(batch)
}

/// Forecast every enabled model from the stored raw series.
pub fn forecast(
    config: &PipelineConfig,
    ticker: &str,
    horizon: usize,
) -> Result<ForecastBatch, StageError> {
    let series = load_raw(config, ticker)?;
    forecast_series(config, &series, horizon, &enabled_models(config))
}
