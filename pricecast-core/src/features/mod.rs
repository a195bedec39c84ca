//! FeatureEngine: technical features derived from a price series.
//!
//! Output columns, in order: `open`, `high`, `low`, `volume`, then
//! `ema_{w}` and `sma_{w}` for each configured window, then `return_1d`,
//! `return_{n}d` and `rsi_{p}`. The close is kept alongside as the target.

pub mod table;

pub use table::{FeatureColumn, FeatureTable};

use crate::domain::{Bar, PriceSeries};
use crate::error::ForecastError;
use crate::indicators::{Ema, Indicator, PctReturn, Rsi, Sma};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Moving-average windows; each yields an EMA and an SMA column.
    pub windows: Vec<usize>,
    /// Lag of the multi-day return column.
    pub long_return: usize,
    pub rsi_period: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            windows: vec![5, 10, 20],
            long_return: 5,
            rsi_period: 14,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.windows.iter().any(|&w| w == 0) {
            return Err(ForecastError::InvalidInput(
                "moving-average windows must be >= 1".into(),
            ));
        }
        if self.long_return == 0 || self.rsi_period == 0 {
            return Err(ForecastError::InvalidInput(
                "return lag and RSI period must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Rows a seed history needs before every feature has full support.
    pub fn min_history(&self) -> usize {
        let max_window = self.windows.iter().copied().max().unwrap_or(1);
        max_window
            .max(self.rsi_period + 1)
            .max(self.long_return + 1)
    }

    /// Feature column names in table order (target excluded).
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = RAW_COLUMNS.iter().map(|s| s.to_string()).collect();
        names.extend(self.indicators().iter().map(|ind| ind.name().to_string()));
        names
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        let mut out: Vec<Box<dyn Indicator>> = Vec::with_capacity(self.windows.len() * 2 + 3);
        for &w in &self.windows {
            out.push(Box::new(Ema::new(w)));
            out.push(Box::new(Sma::new(w)));
        }
        out.push(Box::new(PctReturn::new(1)));
        out.push(Box::new(PctReturn::new(self.long_return)));
        out.push(Box::new(Rsi::new(self.rsi_period)));
        out
    }
}

const RAW_COLUMNS: [&str; 4] = ["open", "high", "low", "volume"];

/// Computes feature tables. Pure: the same bars always give a bit-identical
/// table.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngine {
    config: FeatureConfig,
}

impl FeatureEngine {
    pub fn new(config: FeatureConfig) -> Result<Self, ForecastError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn compute(&self, series: &PriceSeries) -> FeatureTable {
        self.compute_bars(series.bars())
    }

    /// Same as [`compute`](Self::compute) over bars already in date order.
    pub fn compute_bars(&self, bars: &[Bar]) -> FeatureTable {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let mut columns = vec![
            FeatureColumn::new("open", bars.iter().map(|b| b.open).collect()),
            FeatureColumn::new("high", bars.iter().map(|b| b.high).collect()),
            FeatureColumn::new("low", bars.iter().map(|b| b.low).collect()),
            FeatureColumn::new("volume", bars.iter().map(|b| b.volume).collect()),
        ];
        for indicator in self.config.indicators() {
            columns.push(FeatureColumn::new(indicator.name(), indicator.compute(&closes)));
        }
        FeatureTable::from_parts(bars.iter().map(|b| b.date).collect(), closes, columns)
    }
}

/// Convenience wrapper over a default-configured [`FeatureEngine`].
pub fn compute_features(series: &PriceSeries) -> FeatureTable {
    FeatureEngine::default().compute(series)
}
