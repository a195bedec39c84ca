//! Hold-out evaluation of the gradient-boosted model on the eval split.

use pricecast_core::features::FeatureTable;
use pricecast_core::models::{ModelKind, TrainedModel};
use pricecast_core::ForecastError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::StageError;
use crate::export::{eval_path, save_json};
use crate::preprocess::{load_split, Split};
use crate::train::model_store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub ticker: String,
    pub mse: f64,
    pub mae: f64,
    pub n_samples: usize,
}

/// Mean squared and mean absolute error. `None` when there is nothing to
/// compare.
pub fn error_metrics(predicted: &[f64], actual: &[f64]) -> Option<(f64, f64)> {
    let n = predicted.len().min(actual.len());
    if n == 0 {
        return None;
    }
    let (sq, abs) = predicted
        .iter()
        .zip(actual)
        .fold((0.0, 0.0), |(sq, abs), (p, a)| {
            let e = p - a;
            (sq + e * e, abs + e.abs())
        });
    Some((sq / n as f64, abs / n as f64))
}

pub fn evaluate_table(
    model: &TrainedModel,
    table: &FeatureTable,
) -> Result<EvaluationMetrics, StageError> {
    let predicted = model.predict_table(table)?;
    let (mse, mae) = error_metrics(&predicted, table.close()).ok_or(
        ForecastError::InsufficientHistory {
            required: 1,
            available: 0,
        },
    )?;
    Ok(EvaluationMetrics {
        ticker: model.ticker.clone(),
        mse,
        mae,
        n_samples: predicted.len(),
    })
}

/// Score the stored GBM bundle on `{TICKER}_eval.csv` and write
/// `{TICKER}_eval_results.json`.
pub fn evaluate(config: &PipelineConfig, ticker: &str) -> Result<EvaluationMetrics, StageError> {
    let model = model_store(config).load(ticker, ModelKind::GradientBoosted)?;
    let table = load_split(config, ticker, Split::Eval)?;
    let metrics = evaluate_table(&model, &table)?;
    save_json(&eval_path(config, ticker), &metrics)?;
    info!(
        %ticker,
        n = metrics.n_samples,
        mse = metrics.mse,
        mae = metrics.mae,
        "evaluation written"
    );
    Ok(metrics)
}
