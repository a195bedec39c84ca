//! Seasonal ARIMA(1,1,1) with an optional seasonal AR term.
//!
//! The close is differenced once and centred on its mean drift. The ARMA(1,1)
//! part (plus `Φ·x[t-s]` when seasonal) is estimated with Hannan–Rissanen:
//! a long autoregression supplies residual estimates, then one OLS pass
//! regresses the series on its own lag, the lagged residual and the seasonal
//! lag. Forecast intervals come from the ψ-weights of the integrated model.

use super::linear::ols;
use super::HorizonForecast;
use crate::error::ForecastError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalParams {
    /// Seasonal lag in observations (7 ≈ weekly on a daily series).
    pub period: usize,
    /// Fewer observations than this is an insufficient-history error.
    pub min_observations: usize,
    /// Normal quantile for the interval (1.96 → 95%).
    pub z: f64,
}

impl Default for SeasonalParams {
    fn default() -> Self {
        Self {
            period: 7,
            min_observations: 15,
            z: 1.96,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalModel {
    pub params: SeasonalParams,
    /// Whether the seasonal AR term was estimated (history ≥ 4 × period).
    pub seasonal: bool,
    pub drift: f64,
    pub phi: f64,
    pub theta: f64,
    pub seasonal_phi: f64,
    pub sigma2: f64,
    pub n_obs: usize,
}

#[derive(Debug, Clone, Copy)]
enum Regressor {
    Ar,
    Ma,
    SeasonalAr,
}

fn difference(y: &[f64]) -> Vec<f64> {
    y.windows(2).map(|w| w[1] - w[0]).collect()
}

impl SeasonalModel {
    pub fn fit(y: &[f64], params: SeasonalParams) -> Result<Self, ForecastError> {
        let n = y.len();
        if n < params.min_observations.max(3) {
            return Err(ForecastError::InsufficientHistory {
                required: params.min_observations.max(3),
                available: n,
            });
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(
                "non-finite value in close history".into(),
            ));
        }

        let seasonal = params.period >= 2 && n >= 4 * params.period;
        let diffs = difference(y);
        let drift = diffs.iter().sum::<f64>() / diffs.len() as f64;
        let xc: Vec<f64> = diffs.iter().map(|d| d - drift).collect();
        let m = xc.len();

        let variance = xc.iter().map(|v| v * v).sum::<f64>() / m as f64;
        if variance < 1e-12 {
            debug!(n, drift, "constant increments, fitting drift only");
            return Ok(Self {
                params,
                seasonal,
                drift,
                phi: 0.0,
                theta: 0.0,
                seasonal_phi: 0.0,
                sigma2: 0.0,
                n_obs: n,
            });
        }

        // Stage 1: long AR for innovation estimates.
        let k = (m / 4).clamp(1, 10);
        let rows = m - k;
        let x1 = DMatrix::from_fn(rows, k + 1, |r, c| {
            if c == 0 {
                1.0
            } else {
                xc[k + r - c]
            }
        });
        let y1 = DVector::from_fn(rows, |r, _| xc[k + r]);
        let ar = ols(&x1, &y1)
            .ok_or_else(|| ForecastError::ConvergenceError("singular long-AR system".into()))?;
        let mut innovations = vec![0.0; m];
        for t in k..m {
            let fitted = ar[0] + (1..=k).map(|j| ar[j] * xc[t - j]).sum::<f64>();
            innovations[t] = xc[t] - fitted;
        }

        // Stage 2: OLS on [x[t-1], e[t-1], (x[t-s])]. Innovations that carry
        // no signal, or an MA root on or outside the unit circle, drop the
        // MA column and refit.
        let lag_s = if seasonal { params.period } else { 0 };
        let start = (k + 1).max(lag_s);
        let innovation_var =
            innovations[k..].iter().map(|e| e * e).sum::<f64>() / (m - k) as f64;
        let with_ma = innovation_var > 1e-10 * variance;

        let mut model = Self {
            params,
            seasonal,
            drift,
            phi: 0.0,
            theta: 0.0,
            seasonal_phi: 0.0,
            sigma2: 0.0,
            n_obs: n,
        };
        let mut fitted = with_ma
            && model.estimate_arma(&xc, &innovations, start, true, n)?
            && model.theta.abs() < 1.0;
        let mut residuals = model.residuals(&xc);
        if !fitted || residuals.iter().any(|e| !e.is_finite()) {
            fitted = model.estimate_arma(&xc, &innovations, start, false, n)?;
            residuals = model.residuals(&xc);
        }
        if !fitted {
            return Err(ForecastError::ConvergenceError(
                "singular ARMA system".into(),
            ));
        }

        let tail = &residuals[start..];
        model.sigma2 = tail.iter().map(|e| e * e).sum::<f64>() / tail.len() as f64;
        if !model.sigma2.is_finite() {
            return Err(ForecastError::ConvergenceError(
                "residual filter diverged".into(),
            ));
        }
        debug!(
            n,
            seasonal,
            phi = model.phi,
            theta = model.theta,
            seasonal_phi = model.seasonal_phi,
            sigma2 = model.sigma2,
            "seasonal model fitted"
        );
        Ok(model)
    }

    /// Second Hannan–Rissanen stage. Returns `Ok(false)` when the design is
    /// singular or the estimates are not finite.
    fn estimate_arma(
        &mut self,
        xc: &[f64],
        innovations: &[f64],
        start: usize,
        with_ma: bool,
        n: usize,
    ) -> Result<bool, ForecastError> {
        let m = xc.len();
        let lag_s = self.seasonal_lag();
        let mut lags: Vec<Regressor> = vec![Regressor::Ar];
        if with_ma {
            lags.push(Regressor::Ma);
        }
        if lag_s > 0 {
            lags.push(Regressor::SeasonalAr);
        }
        if m <= start + lags.len() + 1 {
            return Err(ForecastError::InsufficientHistory {
                required: start + lags.len() + 3,
                available: n,
            });
        }
        let rows = m - start;
        let x = DMatrix::from_fn(rows, lags.len(), |r, c| {
            let t = start + r;
            match lags[c] {
                Regressor::Ar => xc[t - 1],
                Regressor::Ma => innovations[t - 1],
                Regressor::SeasonalAr => xc[t - lag_s],
            }
        });
        let y = DVector::from_fn(rows, |r, _| xc[start + r]);
        let Some(beta) = ols(&x, &y) else {
            return Ok(false);
        };
        if beta.iter().any(|b| !b.is_finite()) {
            return Ok(false);
        }
        self.phi = 0.0;
        self.theta = 0.0;
        self.seasonal_phi = 0.0;
        for (lag, b) in lags.iter().zip(beta.iter()) {
            match lag {
                Regressor::Ar => self.phi = *b,
                Regressor::Ma => self.theta = *b,
                Regressor::SeasonalAr => self.seasonal_phi = *b,
            }
        }
        Ok(true)
    }

    fn seasonal_lag(&self) -> usize {
        if self.seasonal {
            self.params.period
        } else {
            0
        }
    }

    /// One-step innovations of the centred differences under the fitted model.
    fn residuals(&self, xc: &[f64]) -> Vec<f64> {
        let s = self.seasonal_lag();
        let mut eps = vec![0.0; xc.len()];
        for t in 0..xc.len() {
            let mut fitted = 0.0;
            if t >= 1 {
                fitted += self.phi * xc[t - 1] + self.theta * eps[t - 1];
            }
            if s > 0 && t >= s {
                fitted += self.seasonal_phi * xc[t - s];
            }
            eps[t] = xc[t] - fitted;
        }
        eps
    }

    /// ψ-weights ψ_0..ψ_{h-1} of the integrated model.
    fn psi_weights(&self, h: usize) -> Vec<f64> {
        let s = self.seasonal_lag();
        // a(B) = 1 - φB - ΦB^s, then multiplied by (1 - B).
        let mut a = vec![0.0; s.max(1) + 1];
        a[0] = 1.0;
        a[1] -= self.phi;
        if s > 0 {
            a[s] -= self.seasonal_phi;
        }
        let mut integrated = vec![0.0; a.len() + 1];
        for (i, &ai) in a.iter().enumerate() {
            integrated[i] += ai;
            integrated[i + 1] -= ai;
        }
        let c: Vec<f64> = integrated.iter().map(|v| -v).collect();

        let mut psi = Vec::with_capacity(h);
        for j in 0..h {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut v = if j == 1 { self.theta } else { 0.0 };
            for i in 1..=j.min(c.len() - 1) {
                v += c[i] * psi[j - i];
            }
            psi.push(v);
        }
        psi
    }

    /// Forecast `horizon` steps past the end of `y`.
    pub fn forecast(&self, y: &[f64], horizon: usize) -> Result<HorizonForecast, ForecastError> {
        let Some(&last) = y.last() else {
            return Err(ForecastError::InsufficientHistory {
                required: self.params.min_observations,
                available: 0,
            });
        };
        let mut xc: Vec<f64> = difference(y).iter().map(|d| d - self.drift).collect();
        let last_eps = self.residuals(&xc).last().copied().unwrap_or(0.0);
        let s = self.seasonal_lag();

        let mut level = last;
        let mut mean = Vec::with_capacity(horizon);
        for step in 0..horizon {
            let t = xc.len();
            let mut next = 0.0;
            if t >= 1 {
                next += self.phi * xc[t - 1];
            }
            if step == 0 {
                next += self.theta * last_eps;
            }
            if s > 0 && t >= s {
                next += self.seasonal_phi * xc[t - s];
            }
            xc.push(next);
            level += next + self.drift;
            mean.push(level);
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ConvergenceError(
                "seasonal forecast is not finite".into(),
            ));
        }

        let sigma = self.sigma2.sqrt();
        let mut cumulative = 0.0;
        let (mut lower, mut upper) = (Vec::with_capacity(horizon), Vec::with_capacity(horizon));
        for (psi, m) in self.psi_weights(horizon).into_iter().zip(&mean) {
            cumulative += psi * psi;
            let half = self.params.z * sigma * cumulative.sqrt();
            lower.push(m - half);
            upper.push(m + half);
        }
        Ok(HorizonForecast {
            mean,
            lower: Some(lower),
            upper: Some(upper),
        })
    }
}
