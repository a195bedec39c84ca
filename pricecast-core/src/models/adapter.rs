//! Training side of the three model families.

use super::bundle::{FittedModel, TrainedModel, TrainingInfo, MODEL_SCHEMA_VERSION};
use super::gbm::{recency_weights, GbmParams, GbmRegressor};
use super::scaler::StandardScaler;
use super::seasonal::{SeasonalModel, SeasonalParams};
use super::sequence::{SequenceModel, SequenceParams};
use super::ModelKind;
use crate::error::ForecastError;
use crate::features::{FeatureConfig, FeatureTable};
use chrono::Utc;
use tracing::info;

/// `train(features) -> artifact` for one model family.
pub trait ModelAdapter {
    fn kind(&self) -> ModelKind;

    fn train(&self, ticker: &str, features: &FeatureTable) -> Result<TrainedModel, ForecastError>;
}

fn bundle(
    ticker: &str,
    features: &FeatureTable,
    feature_config: &FeatureConfig,
    feature_columns: Vec<String>,
    scaler: Option<StandardScaler>,
    model: FittedModel,
) -> TrainedModel {
    let trained = TrainedModel {
        schema_version: MODEL_SCHEMA_VERSION,
        ticker: ticker.to_string(),
        feature_columns,
        feature_config: feature_config.clone(),
        scaler,
        model,
        training: TrainingInfo::from_table(features),
        created_at: Utc::now(),
    };
    info!(
        %ticker,
        kind = %trained.kind(),
        rows = trained.training.rows,
        "model trained"
    );
    trained
}

/// Gradient-boosted trees on every feature column, target = close.
#[derive(Debug, Clone, Default)]
pub struct GbmTrainer {
    pub params: GbmParams,
    pub feature_config: FeatureConfig,
}

impl GbmTrainer {
    pub fn new(params: GbmParams, feature_config: FeatureConfig) -> Self {
        Self {
            params,
            feature_config,
        }
    }
}

impl ModelAdapter for GbmTrainer {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoosted
    }

    fn train(&self, ticker: &str, features: &FeatureTable) -> Result<TrainedModel, ForecastError> {
        if features.is_empty() {
            return Err(ForecastError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        }
        let columns = features.feature_names();
        let x = features.matrix(&columns)?;
        let weights = if self.params.recency_weighting {
            recency_weights(features.dates())
        } else {
            vec![1.0; features.len()]
        };
        let gbm = GbmRegressor::fit(&x, features.close(), &weights, self.params.clone())?;
        Ok(bundle(
            ticker,
            features,
            &self.feature_config,
            columns,
            None,
            FittedModel::GradientBoosted(gbm),
        ))
    }
}

/// Seasonal ARIMA on the close column alone.
#[derive(Debug, Clone, Default)]
pub struct SeasonalTrainer {
    pub params: SeasonalParams,
    pub feature_config: FeatureConfig,
}

impl SeasonalTrainer {
    pub fn new(params: SeasonalParams, feature_config: FeatureConfig) -> Self {
        Self {
            params,
            feature_config,
        }
    }
}

impl ModelAdapter for SeasonalTrainer {
    fn kind(&self) -> ModelKind {
        ModelKind::Seasonal
    }

    fn train(&self, ticker: &str, features: &FeatureTable) -> Result<TrainedModel, ForecastError> {
        let model = SeasonalModel::fit(features.close(), self.params.clone())?;
        Ok(bundle(
            ticker,
            features,
            &self.feature_config,
            Vec::new(),
            None,
            FittedModel::Seasonal(model),
        ))
    }
}

/// LSTM sequence model over standardized feature windows.
#[derive(Debug, Clone)]
pub struct SequenceTrainer {
    pub params: SequenceParams,
    pub feature_config: FeatureConfig,
    pub horizon: usize,
}

impl SequenceTrainer {
    pub fn new(params: SequenceParams, feature_config: FeatureConfig, horizon: usize) -> Self {
        Self {
            params,
            feature_config,
            horizon,
        }
    }
}

impl ModelAdapter for SequenceTrainer {
    fn kind(&self) -> ModelKind {
        ModelKind::Sequence
    }

    fn train(&self, ticker: &str, features: &FeatureTable) -> Result<TrainedModel, ForecastError> {
        if features.len() < 2 {
            return Err(ForecastError::InsufficientHistory {
                required: self.horizon + 6,
                available: features.len(),
            });
        }
        let columns = features.feature_names();
        let x = features.matrix(&columns)?;
        let scaler = StandardScaler::fit(&x)?;
        let scaled = scaler.transform(&x)?;
        let model =
            SequenceModel::fit(&scaled, features.close(), self.horizon, self.params.clone())?;
        Ok(bundle(
            ticker,
            features,
            &self.feature_config,
            columns,
            Some(scaler),
            FittedModel::Sequence(model),
        ))
    }
}
