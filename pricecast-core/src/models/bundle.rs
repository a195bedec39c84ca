//! TrainedModel: the persisted artifact of a training run.

use super::gbm::GbmRegressor;
use super::scaler::StandardScaler;
use super::seasonal::SeasonalModel;
use super::sequence::SequenceModel;
use super::{HorizonForecast, HorizonModel, ModelKind, Predictor};
use crate::domain::PriceSeries;
use crate::error::ForecastError;
use crate::features::{FeatureConfig, FeatureEngine, FeatureTable};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Bump when the bundle layout changes incompatibly.
pub const MODEL_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    MODEL_SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "model", rename_all = "snake_case")]
pub enum FittedModel {
    GradientBoosted(GbmRegressor),
    Seasonal(SeasonalModel),
    Sequence(SequenceModel),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::GradientBoosted(_) => ModelKind::GradientBoosted,
            FittedModel::Seasonal(_) => ModelKind::Seasonal,
            FittedModel::Sequence(_) => ModelKind::Sequence,
        }
    }
}

/// Provenance of the table a model was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingInfo {
    pub rows: usize,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// BLAKE3 of the training feature table.
    pub data_hash: String,
}

impl TrainingInfo {
    pub fn from_table(table: &FeatureTable) -> Self {
        Self {
            rows: table.len(),
            start: table.dates().first().copied(),
            end: table.dates().last().copied(),
            data_hash: table.content_hash(),
        }
    }
}

/// Fitted predictor plus everything needed to feed it: the ordered feature
/// columns, the feature configuration and an optional input scaler.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub ticker: String,
    pub feature_columns: Vec<String>,
    pub feature_config: FeatureConfig,
    pub scaler: Option<StandardScaler>,
    pub model: FittedModel,
    pub training: TrainingInfo,
    pub created_at: DateTime<Utc>,
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    fn prepare_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ForecastError> {
        if let Some(row) = rows.iter().find(|r| r.len() != self.feature_columns.len()) {
            return Err(ForecastError::InvalidInput(format!(
                "{} model expects {} features, got {}",
                self.kind(),
                self.feature_columns.len(),
                row.len()
            )));
        }
        match &self.scaler {
            Some(scaler) => scaler.transform(rows),
            None => Ok(rows.to_vec()),
        }
    }

    /// Point predictions for every row of `table`, columns aligned by name.
    pub fn predict_table(&self, table: &FeatureTable) -> Result<Vec<f64>, ForecastError> {
        let rows = table.matrix(&self.feature_columns)?;
        self.predict(&rows)
    }
}

impl Predictor for TrainedModel {
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        match &self.model {
            FittedModel::GradientBoosted(gbm) => Ok(gbm.predict(&self.prepare_rows(rows)?)),
            other => Err(ForecastError::InvalidInput(format!(
                "{} model forecasts whole horizons, not single rows",
                other.kind()
            ))),
        }
    }
}

impl HorizonModel for TrainedModel {
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    fn forecast_horizon(
        &self,
        history: &PriceSeries,
        horizon: usize,
    ) -> Result<HorizonForecast, ForecastError> {
        match &self.model {
            // Coefficients go stale as bars arrive; refit on the business-day
            // closes with the stored parameters.
            FittedModel::Seasonal(model) => {
                let closes = history.business_day_closes();
                SeasonalModel::fit(&closes, model.params.clone())?.forecast(&closes, horizon)
            }
            FittedModel::Sequence(model) => {
                let table = FeatureEngine::new(self.feature_config.clone())?.compute(history);
                let rows = self.prepare_rows(&table.matrix(&self.feature_columns)?)?;
                model
                    .forecast(&rows, table.close(), horizon)
                    .map(HorizonForecast::point)
            }
            FittedModel::GradientBoosted(_) => Err(ForecastError::InvalidInput(
                "gbm model needs the recursive forecaster".into(),
            )),
        }
    }
}
