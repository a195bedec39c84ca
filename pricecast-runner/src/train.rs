//! Fit every enabled model family on the train split and persist bundles.

use std::path::PathBuf;

use pricecast_core::features::FeatureTable;
use pricecast_core::models::{
    GbmTrainer, ModelAdapter, ModelKind, ModelStore, SeasonalTrainer, SequenceTrainer,
};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::StageError;
use crate::preprocess::{load_split, Split};

#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    pub saved: Vec<(ModelKind, PathBuf)>,
    /// Models skipped on insufficient history or a failed fit, with reason.
    pub skipped: Vec<(ModelKind, String)>,
}

pub fn model_store(config: &PipelineConfig) -> ModelStore {
    ModelStore::new(config.models_dir())
}

/// Trainers enabled by `config`, in training order.
pub fn trainers(config: &PipelineConfig, horizon: usize) -> Vec<Box<dyn ModelAdapter>> {
    let features = config.features.clone();
    let mut out: Vec<Box<dyn ModelAdapter>> = Vec::with_capacity(3);
    if !config.models.skip_gbm {
        out.push(Box::new(GbmTrainer::new(
            config.models.gbm.clone(),
            features.clone(),
        )));
    }
    out.push(Box::new(SeasonalTrainer::new(
        config.seasonal_params(),
        features.clone(),
    )));
    if config.models.use_lstm {
        out.push(Box::new(SequenceTrainer::new(
            config.models.sequence.clone(),
            features,
            horizon,
        )));
    }
    out
}

/// Train on an in-memory table. Skippable failures are logged and recorded;
/// anything else aborts the stage.
pub fn train_table(
    config: &PipelineConfig,
    ticker: &str,
    table: &FeatureTable,
    horizon: usize,
) -> Result<TrainReport, StageError> {
    let store = model_store(config);
    let mut report = TrainReport::default();
    for trainer in trainers(config, horizon) {
        let kind = trainer.kind();
        match trainer.train(ticker, table) {
            Ok(model) => {
                let path = store.save(&model)?;
                report.saved.push((kind, path));
            }
            Err(e) if e.is_skippable() => {
                warn!(%ticker, model = %kind, error = %e, "training skipped");
                report.skipped.push((kind, e.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(
        %ticker,
        saved = report.saved.len(),
        skipped = report.skipped.len(),
        "training done"
    );
    Ok(report)
}

/// Train from the persisted train split.
pub fn train(
    config: &PipelineConfig,
    ticker: &str,
    horizon: usize,
) -> Result<TrainReport, StageError> {
    let table = load_split(config, ticker, Split::Train)?;
    train_table(config, ticker, &table, horizon)
}
