//! Feature tables from the stored raw series, split chronologically into
//! `{TICKER}_train.csv` and `{TICKER}_eval.csv`.

use std::fs;
use std::path::{Path, PathBuf};

use pricecast_core::data::write_atomic;
use pricecast_core::domain::{safe_ticker, PriceSeries};
use pricecast_core::features::{FeatureEngine, FeatureTable};
use pricecast_core::ForecastError;
use tracing::info;

use crate::config::PipelineConfig;
use crate::data_loader::load_raw;
use crate::error::StageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Eval,
}

impl Split {
    fn suffix(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Eval => "eval",
        }
    }
}

pub fn split_path(config: &PipelineConfig, ticker: &str, split: Split) -> PathBuf {
    config
        .processed_dir()
        .join(format!("{}_{}.csv", safe_ticker(ticker), split.suffix()))
}

#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub train_path: PathBuf,
    pub eval_path: PathBuf,
    pub train_rows: usize,
    pub eval_rows: usize,
}

fn save_table(path: &Path, table: &FeatureTable) -> Result<(), StageError> {
    let mut buf = Vec::new();
    table.write_csv(&mut buf)?;
    write_atomic(path, &buf)?;
    Ok(())
}

/// Compute features over `series` and write both splits.
pub fn preprocess_series(
    config: &PipelineConfig,
    series: &PriceSeries,
) -> Result<PreprocessOutput, StageError> {
    let engine = FeatureEngine::new(config.features.clone())?;
    let required = config.features.min_history();
    if series.len() < required {
        return Err(ForecastError::InsufficientHistory {
            required,
            available: series.len(),
        }
        .into());
    }
    let table = engine.compute(series);
    let (train, eval) = table.chronological_split(config.forecast.train_fraction);

    let train_path = split_path(config, series.ticker(), Split::Train);
    let eval_path = split_path(config, series.ticker(), Split::Eval);
    save_table(&train_path, &train)?;
    save_table(&eval_path, &eval)?;
    info!(
        ticker = series.ticker(),
        train = train.len(),
        eval = eval.len(),
        "features written"
    );
    Ok(PreprocessOutput {
        train_path,
        eval_path,
        train_rows: train.len(),
        eval_rows: eval.len(),
    })
}

/// Preprocess the stored raw file for `ticker`.
pub fn preprocess(config: &PipelineConfig, ticker: &str) -> Result<PreprocessOutput, StageError> {
    let series = load_raw(config, ticker)?;
    preprocess_series(config, &series)
}

pub fn load_split(
    config: &PipelineConfig,
    ticker: &str,
    split: Split,
) -> Result<FeatureTable, StageError> {
    let path = split_path(config, ticker, split);
    Ok(FeatureTable::read_csv(fs::File::open(&path)?)?)
}
