//! Forecast output rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One predicted trading day from a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub forecast_close: f64,
    /// Present only for models that produce a predictive distribution.
    pub lower_95ci: Option<f64>,
    pub upper_95ci: Option<f64>,
    /// Unadjusted model output when a post-hoc adjustment rewrote
    /// `forecast_close`.
    pub base_close: Option<f64>,
}

impl ForecastRow {
    pub fn point(ticker: impl Into<String>, date: NaiveDate, forecast_close: f64) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            forecast_close,
            lower_95ci: None,
            upper_95ci: None,
            base_close: None,
        }
    }

    pub fn with_interval(mut self, lower: f64, upper: f64) -> Self {
        self.lower_95ci = Some(lower);
        self.upper_95ci = Some(upper);
        self
    }

    pub fn has_interval(&self) -> bool {
        self.lower_95ci.is_some() && self.upper_95ci.is_some()
    }
}

/// How an ensemble row was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMethod {
    /// Ridge regression fitted on past predictions vs realized closes.
    LearnedBlend,
    /// Arithmetic mean of the participating models.
    Mean,
}

impl CombineMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombineMethod::LearnedBlend => "learned_blend",
            CombineMethod::Mean => "mean",
        }
    }
}

impl fmt::Display for CombineMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One combined prediction across every model that forecast the date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub forecast_close: f64,
    pub method: CombineMethod,
    /// Participating model names, sorted.
    pub models: Vec<String>,
}
