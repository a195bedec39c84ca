//! Per-column standardization (zero mean, unit variance).

use crate::error::ForecastError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    /// Population standard deviations; constant columns store 1.0.
    pub scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ForecastError> {
        let first = rows.first().ok_or(ForecastError::InsufficientHistory {
            required: 1,
            available: 0,
        })?;
        let width = first.len();
        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            if row.len() != width {
                return Err(ForecastError::InvalidInput(format!(
                    "ragged rows: expected {width} values, got {}",
                    row.len()
                )));
            }
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut vars = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in vars.iter_mut().zip(row).zip(&means) {
                *acc += (v - m).powi(2);
            }
        }
        let scales = vars
            .into_iter()
            .map(|v| {
                let sd = (v / n).sqrt();
                if sd > f64::EPSILON {
                    sd
                } else {
                    1.0
                }
            })
            .collect();
        Ok(Self { means, scales })
    }

    /// Fit on a single column.
    pub fn fit_column(values: &[f64]) -> Result<Self, ForecastError> {
        let rows: Vec<Vec<f64>> = values.iter().map(|&v| vec![v]).collect();
        Self::fit(&rows)
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ForecastError> {
        if row.len() != self.width() {
            return Err(ForecastError::InvalidInput(format!(
                "scaler expects {} values, got {}",
                self.width(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ForecastError> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    /// Scale a value of column `col`.
    pub fn scale_value(&self, col: usize, v: f64) -> f64 {
        (v - self.means[col]) / self.scales[col]
    }

    /// Undo [`scale_value`](Self::scale_value).
    pub fn unscale_value(&self, col: usize, v: f64) -> f64 {
        v * self.scales[col] + self.means[col]
    }
}
