//! Model adapters and the interfaces the forecasters drive them through.
//!
//! Three model families share one artifact type, [`TrainedModel`]:
//! - gradient-boosted trees: point predictions per feature row, driven
//!   step-by-step by the recursive forecaster;
//! - a seasonal ARIMA: forecasts the whole horizon with intervals;
//! - an LSTM sequence model: emits the whole horizon in one call.

pub mod adapter;
pub mod bundle;
pub mod gbm;
pub mod linear;
pub mod scaler;
pub mod seasonal;
pub mod sequence;
pub mod store;

pub use adapter::{GbmTrainer, ModelAdapter, SeasonalTrainer, SequenceTrainer};
pub use bundle::{FittedModel, TrainedModel, TrainingInfo, MODEL_SCHEMA_VERSION};
pub use gbm::{GbmParams, GbmRegressor};
pub use linear::RidgeRegression;
pub use scaler::StandardScaler;
pub use seasonal::{SeasonalModel, SeasonalParams};
pub use sequence::{SequenceModel, SequenceParams};
pub use store::ModelStore;

use crate::domain::PriceSeries;
use crate::error::ForecastError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    GradientBoosted,
    Seasonal,
    Sequence,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::GradientBoosted,
        ModelKind::Seasonal,
        ModelKind::Sequence,
    ];

    /// Short tag used in file names and forecast tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::GradientBoosted => "gbm",
            ModelKind::Seasonal => "seasonal",
            ModelKind::Sequence => "lstm",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gbm" | "xgb" | "gradient_boosted" => Ok(ModelKind::GradientBoosted),
            "seasonal" | "sarimax" | "arima" => Ok(ModelKind::Seasonal),
            "lstm" | "sequence" => Ok(ModelKind::Sequence),
            other => Err(ForecastError::InvalidInput(format!(
                "unknown model kind '{other}' (expected gbm, seasonal or lstm)"
            ))),
        }
    }
}

/// Multi-step output of a direct model.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonForecast {
    pub mean: Vec<f64>,
    pub lower: Option<Vec<f64>>,
    pub upper: Option<Vec<f64>>,
}

impl HorizonForecast {
    pub fn point(mean: Vec<f64>) -> Self {
        Self {
            mean,
            lower: None,
            upper: None,
        }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Something that maps feature rows to point predictions.
pub trait Predictor {
    fn name(&self) -> &str;

    /// Exact column order the rows passed to [`predict`](Self::predict) must
    /// follow.
    fn feature_columns(&self) -> &[String];

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError>;
}

/// Something that forecasts a whole horizon from a price history in one call.
pub trait HorizonModel {
    fn name(&self) -> &str;

    fn forecast_horizon(
        &self,
        history: &PriceSeries,
        horizon: usize,
    ) -> Result<HorizonForecast, ForecastError>;
}
