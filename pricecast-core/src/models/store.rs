//! On-disk model bundles: `{dir}/{TICKER}_{kind}.json`.

use super::bundle::TrainedModel;
use super::ModelKind;
use crate::data::write_atomic;
use crate::domain::safe_ticker;
use crate::error::ForecastError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ticker: &str, kind: ModelKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", safe_ticker(ticker), kind.as_str()))
    }

    pub fn save(&self, model: &TrainedModel) -> Result<PathBuf, ForecastError> {
        let path = self.path_for(&model.ticker, model.kind());
        let json = serde_json::to_vec_pretty(model)?;
        write_atomic(&path, &json)?;
        info!(path = %path.display(), "model saved");
        Ok(path)
    }

    pub fn load(&self, ticker: &str, kind: ModelKind) -> Result<TrainedModel, ForecastError> {
        let path = self.path_for(ticker, kind);
        if !path.is_file() {
            return Err(ForecastError::ModelNotFound {
                ticker: ticker.to_string(),
                kind: kind.as_str().to_string(),
                path,
            });
        }
        let model: TrainedModel = serde_json::from_slice(&fs::read(&path)?)?;
        if model.kind() != kind {
            return Err(ForecastError::InvalidInput(format!(
                "{} holds a {} model, expected {kind}",
                path.display(),
                model.kind()
            )));
        }
        if model.schema_version != super::MODEL_SCHEMA_VERSION {
            warn!(
                path = %path.display(),
                found = model.schema_version,
                expected = super::MODEL_SCHEMA_VERSION,
                "model schema version differs"
            );
        }
        Ok(model)
    }

    pub fn exists(&self, ticker: &str, kind: ModelKind) -> bool {
        self.path_for(ticker, kind).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureConfig, FeatureTable};
    use crate::models::{GbmParams, GbmTrainer, ModelAdapter};

    fn table() -> FeatureTable {
        let csv = "date,close,a\n2024-01-02,10,1\n2024-01-03,11,2\n2024-01-04,12,3\n";
        FeatureTable::read_csv(csv.as_bytes()).unwrap()
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let trainer = GbmTrainer::new(
            GbmParams {
                n_estimators: 3,
                ..GbmParams::default()
            },
            FeatureConfig::default(),
        );
        let model = trainer.train("^GSPC", &table()).unwrap();
        let path = store.save(&model).unwrap();
        assert!(path.ends_with("_GSPC_gbm.json"));
        assert!(store.exists("^GSPC", ModelKind::GradientBoosted));
        let loaded = store.load("^GSPC", ModelKind::GradientBoosted).unwrap();
        assert_eq!(loaded.feature_columns, vec!["a".to_string()]);
        assert_eq!(loaded.training, model.training);
    }

    #[test]
    fn missing_bundle_is_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelStore::new(dir.path())
            .load("AAPL", ModelKind::Sequence)
            .unwrap_err();
        match err {
            ForecastError::ModelNotFound { ticker, kind, path } => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(kind, "lstm");
                assert!(path.ends_with("AAPL_lstm.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
