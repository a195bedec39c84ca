//! Ensemble stage: combine per-model tables, keep the blend history current.

use std::collections::BTreeMap;
use std::path::PathBuf;

use pricecast_core::domain::{EnsembleRow, ForecastRow, PriceSeries};
use pricecast_core::ensemble::BlendHistory;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::data_loader::load_raw;
use crate::error::StageError;
use crate::export::{ensemble_path, forecast_path, history_path, load_forecast, save_ensemble};
use crate::forecast::enabled_models;

#[derive(Debug, Clone)]
pub struct EnsembleOutput {
    pub rows: Vec<EnsembleRow>,
    pub path: PathBuf,
    /// History rows whose realized close was filled in this run.
    pub reconciled: usize,
}

/// Read back the per-model forecast files written for `horizon`. Missing
/// files are left out.
pub fn load_forecast_tables(
    config: &PipelineConfig,
    ticker: &str,
    horizon: usize,
) -> Result<BTreeMap<String, Vec<ForecastRow>>, StageError> {
    let mut tables = BTreeMap::new();
    for kind in enabled_models(config) {
        let path = forecast_path(config, ticker, kind.as_str(), horizon);
        if !path.is_file() {
            debug!(%ticker, model = %kind, path = %path.display(), "no forecast file");
            continue;
        }
        tables.insert(kind.as_str().to_string(), load_forecast(&path)?);
    }
    Ok(tables)
}

/// Blend `tables`, then record them in the history for future blends.
pub fn ensemble_tables(
    config: &PipelineConfig,
    realized: &PriceSeries,
    tables: &BTreeMap<String, Vec<ForecastRow>>,
    horizon: usize,
) -> Result<EnsembleOutput, StageError> {
    let ticker = realized.ticker();
    let hist_path = history_path(config, ticker);
    let mut history = BlendHistory::load(&hist_path)?;
    let reconciled = history.reconcile(realized);

    let rows = config.models.ensemble.combine(ticker, tables, Some(&history));

    history.record(tables);
    history.save(&hist_path)?;

    let path = ensemble_path(config, ticker, horizon);
    save_ensemble(&path, &rows)?;
    info!(
        %ticker,
        rows = rows.len(),
        reconciled,
        history = history.len(),
        "ensemble written"
    );
    Ok(EnsembleOutput {
        rows,
        path,
        reconciled,
    })
}

/// Standalone stage: combine the forecast files already on disk.
pub fn ensemble(
    config: &PipelineConfig,
    ticker: &str,
    horizon: usize,
) -> Result<EnsembleOutput, StageError> {
    let tables = load_forecast_tables(config, ticker, horizon)?;
    if tables.is_empty() {
        return Err(StageError::NoUsableForecast {
            ticker: ticker.to_string(),
        });
    }
    let realized = load_raw(config, ticker)?;
    ensemble_tables(config, &realized, &tables, horizon)
}
