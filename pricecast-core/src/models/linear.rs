//! Least-squares and ridge regression on nalgebra matrices.
//!
//! Ridge fits centre the inputs first, so the intercept is never penalized.

use crate::error::ForecastError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Ordinary least squares via the normal equations. Returns `None` when
/// X'X is singular.
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let xt = x.transpose();
    let xtx_inv = (&xt * x).try_inverse()?;
    Some(xtx_inv * (xt * y))
}

/// Multi-output ridge regression: one coefficient row per output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    /// `outputs × features`
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl RidgeRegression {
    /// Fit `targets` (one row per sample, one column per output) on `rows`.
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[Vec<f64>],
        alpha: f64,
    ) -> Result<Self, ForecastError> {
        let n = rows.len();
        if n == 0 || targets.len() != n {
            return Err(ForecastError::InvalidInput(format!(
                "ridge needs matching non-empty inputs ({n} rows, {} targets)",
                targets.len()
            )));
        }
        let p = rows[0].len();
        let k = targets[0].len();
        if rows.iter().any(|r| r.len() != p) || targets.iter().any(|t| t.len() != k) {
            return Err(ForecastError::InvalidInput("ragged ridge inputs".into()));
        }

        let x = DMatrix::from_fn(n, p, |i, j| rows[i][j]);
        let y = DMatrix::from_fn(n, k, |i, j| targets[i][j]);
        let x_mean = x.row_mean();
        let y_mean = y.row_mean();
        let xc = DMatrix::from_fn(n, p, |i, j| x[(i, j)] - x_mean[j]);
        let yc = DMatrix::from_fn(n, k, |i, j| y[(i, j)] - y_mean[j]);

        let xt = xc.transpose();
        let gram = &xt * &xc + DMatrix::<f64>::identity(p, p) * alpha;
        let beta = match gram.clone().cholesky() {
            Some(chol) => chol.solve(&(&xt * &yc)),
            None => gram
                .lu()
                .solve(&(&xt * &yc))
                .ok_or_else(|| ForecastError::ConvergenceError("singular ridge system".into()))?,
        };
        if beta.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ConvergenceError(
                "ridge produced non-finite coefficients".into(),
            ));
        }

        let coefficients: Vec<Vec<f64>> = (0..k)
            .map(|out| (0..p).map(|j| beta[(j, out)]).collect())
            .collect();
        let intercepts = (0..k)
            .map(|out| {
                y_mean[out]
                    - coefficients[out]
                        .iter()
                        .zip(x_mean.iter())
                        .map(|(b, m)| b * m)
                        .sum::<f64>()
            })
            .collect();
        Ok(Self {
            alpha,
            coefficients,
            intercepts,
        })
    }

    /// Single-output convenience.
    pub fn fit_single(rows: &[Vec<f64>], y: &[f64], alpha: f64) -> Result<Self, ForecastError> {
        let targets: Vec<Vec<f64>> = y.iter().map(|&v| vec![v]).collect();
        Self::fit(rows, &targets, alpha)
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    pub fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(coefs, b)| b + coefs.iter().zip(row).map(|(c, x)| c * x).sum::<f64>())
            .collect()
    }

    /// First output for a row.
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        self.predict_row(row).first().copied().unwrap_or(f64::NAN)
    }
}
