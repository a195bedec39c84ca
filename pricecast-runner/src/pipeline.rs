//! Pipeline orchestrator: fetch → preprocess → train → evaluate → forecast
//! → ensemble for one ticker at a time.
//!
//! Stage-local failures degrade instead of aborting:
//! - short history at preprocess skips training, the seasonal model still
//!   refits from the raw series
//! - a failed evaluation is logged and the run continues
//! - models skipped in training are not forecast
//!
//! The run fails when the fetch fails, on a fatal forecast error such as a
//! missing bundle, or when no model produced a usable forecast.

use pricecast_core::data::{DataSource, LookbackPeriod};
use pricecast_core::models::ModelKind;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::data_loader::fetch_ticker;
use crate::ensemble::{ensemble_tables, EnsembleOutput};
use crate::error::StageError;
use crate::evaluate::{evaluate, EvaluationMetrics};
use crate::forecast::{enabled_models, forecast_series, ForecastBatch};
use crate::preprocess::{preprocess_series, PreprocessOutput};
use crate::train::{train, TrainReport};

/// Everything one ticker's run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub ticker: String,
    pub source: DataSource,
    pub raw_rows: usize,
    pub preprocess: Option<PreprocessOutput>,
    pub training: TrainReport,
    pub evaluation: Option<EvaluationMetrics>,
    pub forecasts: ForecastBatch,
    pub ensemble: EnsembleOutput,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Models worth forecasting after `training`: seasonal always refits,
    /// stored-bundle models only when their bundle was saved this run.
    fn forecastable(&self, training: &TrainReport) -> Vec<ModelKind> {
        enabled_models(&self.config)
            .into_iter()
            .filter(|kind| {
                *kind == ModelKind::Seasonal || training.saved.iter().any(|(k, _)| k == kind)
            })
            .collect()
    }

    pub fn run(
        &self,
        ticker: &str,
        period: LookbackPeriod,
        horizon: usize,
    ) -> Result<PipelineReport, StageError> {
        let config = &self.config;
        info!(%ticker, %period, horizon, "pipeline start");

        let fetched = fetch_ticker(config, ticker, period)?;
        let series = fetched.series;

        let preprocess = match preprocess_series(config, &series) {
            Ok(out) => Some(out),
            Err(e) if e.is_skippable() => {
                warn!(%ticker, error = %e, "preprocess skipped; training disabled");
                None
            }
            Err(e) => return Err(e),
        };

        let training = match preprocess {
            Some(_) => train(config, ticker, horizon)?,
            None => TrainReport::default(),
        };

        let evaluation = if training
            .saved
            .iter()
            .any(|(k, _)| *k == ModelKind::GradientBoosted)
        {
            match evaluate(config, ticker) {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    warn!(%ticker, error = %e, "evaluation skipped");
                    None
                }
            }
        } else {
            None
        };

        let forecasts = forecast_series(config, &series, horizon, &self.forecastable(&training))?;
        if forecasts.is_empty() {
            return Err(StageError::NoUsableForecast {
                ticker: ticker.to_string(),
            });
        }

        let ensemble = ensemble_tables(config, &series, &forecasts.tables, horizon)?;
        info!(
            %ticker,
            models = forecasts.tables.len(),
            rows = ensemble.rows.len(),
            "pipeline done"
        );

        Ok(PipelineReport {
            ticker: ticker.to_string(),
            source: fetched.source,
            raw_rows: series.len(),
            preprocess,
            training,
            evaluation,
            forecasts,
            ensemble,
        })
    }

    /// Run each ticker independently; one ticker's failure does not stop
    /// the others.
    pub fn run_many(
        &self,
        tickers: &[String],
        period: LookbackPeriod,
        horizon: usize,
    ) -> Vec<(String, Result<PipelineReport, StageError>)> {
        tickers
            .iter()
            .map(|ticker| {
                let result = self.run(ticker, period, horizon);
                if let Err(e) = &result {
                    warn!(%ticker, error = %e, "pipeline failed");
                }
                (ticker.clone(), result)
            })
            .collect()
    }
}
