//! Forecasting error taxonomy.
//!
//! Every failure the feature/model/forecast layers can produce maps onto one
//! of these variants. The pipeline decides per variant whether a stage is
//! skipped (insufficient history, non-convergence) or the run aborts
//! (missing column, missing model artifact).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("insufficient history: need at least {required} rows, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("model did not converge: {0}")]
    ConvergenceError(String),

    #[error("no trained {kind} model for '{ticker}' (expected {})", path.display())]
    ModelNotFound {
        ticker: String,
        kind: String,
        path: PathBuf,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ForecastError {
    /// True for failures that mean "this model cannot forecast this ticker
    /// right now" rather than "the run is misconfigured".
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientHistory { .. } | ForecastError::ConvergenceError(_)
        )
    }

    pub(crate) fn missing(column: impl Into<String>) -> Self {
        ForecastError::MissingColumn {
            column: column.into(),
        }
    }
}
