//! Sequence model: LSTM encoder with a ridge readout to the whole horizon.
//!
//! The recurrent weights are drawn once from a seeded RNG and kept fixed; the
//! final hidden state of each standardized feature window (plus the window's
//! last standardized close) is mapped to the next `horizon` standardized
//! closes by multi-output ridge regression.

use super::linear::RidgeRegression;
use super::scaler::StandardScaler;
use crate::error::ForecastError;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceParams {
    /// Rows per input window.
    pub window: usize,
    pub hidden_size: usize,
    pub ridge_alpha: f64,
    pub seed: u64,
}

impl Default for SequenceParams {
    fn default() -> Self {
        Self {
            window: 60,
            hidden_size: 32,
            ridge_alpha: 1.0,
            seed: 42,
        }
    }
}

/// Minimum number of training windows.
const MIN_SAMPLES: usize = 5;

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// LSTM cell with stacked gate weights (input, forget, candidate, output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmCell {
    pub input_size: usize,
    pub hidden_size: usize,
    w_x: DMatrix<f64>,
    w_h: DMatrix<f64>,
    bias: DVector<f64>,
}

impl LstmCell {
    pub fn new(input_size: usize, hidden_size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let limit = (1.0 / hidden_size.max(1) as f64).sqrt();
        let gates = 4 * hidden_size;
        let w_x = DMatrix::from_fn(gates, input_size, |_, _| rng.gen_range(-limit..limit));
        let w_h = DMatrix::from_fn(gates, hidden_size, |_, _| rng.gen_range(-limit..limit));
        // Forget-gate bias starts at 1.
        let bias = DVector::from_fn(gates, |i, _| {
            if (hidden_size..2 * hidden_size).contains(&i) {
                1.0
            } else {
                0.0
            }
        });
        Self {
            input_size,
            hidden_size,
            w_x,
            w_h,
            bias,
        }
    }

    pub fn step(&self, x: &DVector<f64>, h: &DVector<f64>, c: &DVector<f64>) -> (DVector<f64>, DVector<f64>) {
        let hs = self.hidden_size;
        let z = &self.w_x * x + &self.w_h * h + &self.bias;
        let mut h_next = DVector::zeros(hs);
        let mut c_next = DVector::zeros(hs);
        for j in 0..hs {
            let i_gate = sigmoid(z[j]);
            let f_gate = sigmoid(z[hs + j]);
            let g = z[2 * hs + j].tanh();
            let o_gate = sigmoid(z[3 * hs + j]);
            c_next[j] = f_gate * c[j] + i_gate * g;
            h_next[j] = o_gate * c_next[j].tanh();
        }
        (h_next, c_next)
    }

    /// Final hidden state after running over `rows` from a zero state.
    pub fn encode(&self, rows: &[Vec<f64>]) -> DVector<f64> {
        let mut h = DVector::zeros(self.hidden_size);
        let mut c = DVector::zeros(self.hidden_size);
        for row in rows {
            let x = DVector::from_column_slice(row);
            let (h_next, c_next) = self.step(&x, &h, &c);
            h = h_next;
            c = c_next;
        }
        h
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceModel {
    pub params: SequenceParams,
    /// Window actually used; smaller than `params.window` on short histories.
    pub window: usize,
    pub horizon: usize,
    cell: LstmCell,
    readout: RidgeRegression,
    target_scaler: StandardScaler,
}

impl SequenceModel {
    /// Window that fits `rows` of history while leaving enough samples.
    pub fn effective_window(rows: usize, horizon: usize, requested: usize) -> usize {
        if rows >= requested + horizon + MIN_SAMPLES - 1 {
            requested
        } else {
            rows.saturating_sub(horizon + MIN_SAMPLES - 1)
        }
    }

    fn readout_input(&self, scaled_rows: &[Vec<f64>], last_scaled_close: f64) -> Vec<f64> {
        let mut input: Vec<f64> = self.cell.encode(scaled_rows).iter().copied().collect();
        input.push(last_scaled_close);
        input
    }

    /// Fit on standardized feature rows and the matching raw closes.
    pub fn fit(
        scaled_rows: &[Vec<f64>],
        closes: &[f64],
        horizon: usize,
        params: SequenceParams,
    ) -> Result<Self, ForecastError> {
        if horizon == 0 {
            return Err(ForecastError::InvalidInput("horizon must be >= 1".into()));
        }
        let n = scaled_rows.len();
        if closes.len() != n {
            return Err(ForecastError::InvalidInput(format!(
                "{n} feature rows but {} closes",
                closes.len()
            )));
        }
        let window = Self::effective_window(n, horizon, params.window);
        if window < 2 {
            return Err(ForecastError::InsufficientHistory {
                required: horizon + MIN_SAMPLES + 1,
                available: n,
            });
        }
        let samples = n + 1 - window - horizon;
        if samples < MIN_SAMPLES {
            return Err(ForecastError::InsufficientHistory {
                required: window + horizon + MIN_SAMPLES - 1,
                available: n,
            });
        }

        let input_size = scaled_rows[0].len();
        let target_scaler = StandardScaler::fit_column(closes)?;
        let scaled_close: Vec<f64> = closes
            .iter()
            .map(|&c| target_scaler.scale_value(0, c))
            .collect();

        let mut model = Self {
            window,
            horizon,
            cell: LstmCell::new(input_size, params.hidden_size, params.seed),
            readout: RidgeRegression {
                alpha: params.ridge_alpha,
                coefficients: Vec::new(),
                intercepts: Vec::new(),
            },
            target_scaler,
            params,
        };

        let mut inputs = Vec::with_capacity(samples);
        let mut targets = Vec::with_capacity(samples);
        for i in 0..samples {
            let end = i + window;
            inputs.push(model.readout_input(&scaled_rows[i..end], scaled_close[end - 1]));
            targets.push(scaled_close[end..end + horizon].to_vec());
        }
        model.readout = RidgeRegression::fit(&inputs, &targets, model.params.ridge_alpha)?;
        debug!(samples, window, horizon, "sequence model fitted");
        Ok(model)
    }

    /// Forecast up to the trained horizon from the last `window` rows.
    ///
    /// Asking past the trained horizon is a skippable error: the readout has
    /// no outputs for those steps.
    pub fn forecast(
        &self,
        scaled_rows: &[Vec<f64>],
        closes: &[f64],
        horizon: usize,
    ) -> Result<Vec<f64>, ForecastError> {
        if horizon > self.horizon {
            return Err(ForecastError::InsufficientHistory {
                required: horizon,
                available: self.horizon,
            });
        }
        let n = scaled_rows.len();
        if n < self.window || closes.len() != n {
            return Err(ForecastError::InsufficientHistory {
                required: self.window,
                available: n.min(closes.len()),
            });
        }
        let last_close = self.target_scaler.scale_value(0, closes[n - 1]);
        let input = self.readout_input(&scaled_rows[n - self.window..], last_close);
        let out: Vec<f64> = self
            .readout
            .predict_row(&input)
            .into_iter()
            .take(horizon)
            .map(|v| self.target_scaler.unscale_value(0, v))
            .collect();
        if out.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ConvergenceError(
                "sequence forecast is not finite".into(),
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_and_closes(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.05)
            .collect();
        let rows: Vec<Vec<f64>> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| vec![c - 0.5, c + 1.0, (i as f64 * 0.3).cos()])
            .collect();
        let scaler = StandardScaler::fit(&rows).unwrap();
        (scaler.transform(&rows).unwrap(), closes)
    }

    #[test]
    fn cell_is_deterministic_for_a_seed() {
        let a = LstmCell::new(3, 4, 7);
        let b = LstmCell::new(3, 4, 7);
        assert_eq!(a, b);
        let c = LstmCell::new(3, 4, 8);
        assert_ne!(a, c);
    }

    #[test]
    fn hidden_state_is_bounded() {
        let cell = LstmCell::new(2, 8, 1);
        let rows = vec![vec![100.0, -100.0]; 20];
        let h = cell.encode(&rows);
        assert!(h.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn window_shrinks_on_short_history() {
        assert_eq!(SequenceModel::effective_window(200, 5, 60), 60);
        assert_eq!(SequenceModel::effective_window(40, 5, 60), 31);
        assert_eq!(SequenceModel::effective_window(5, 5, 60), 0);
    }

    #[test]
    fn fits_and_forecasts_full_horizon() {
        let (rows, closes) = rows_and_closes(150);
        let params = SequenceParams {
            window: 20,
            hidden_size: 8,
            ..SequenceParams::default()
        };
        let model = SequenceModel::fit(&rows, &closes, 5, params).unwrap();
        let out = model.forecast(&rows, &closes, 5).unwrap();
        assert_eq!(out.len(), 5);
        // Plausible scale: within the range the series moves in.
        assert!(out.iter().all(|v| (80.0..130.0).contains(v)));
        assert_eq!(model.forecast(&rows, &closes, 3).unwrap(), out[..3].to_vec());
    }

    #[test]
    fn too_short_is_insufficient_history() {
        let (rows, closes) = rows_and_closes(8);
        let err = SequenceModel::fit(&rows, &closes, 5, SequenceParams::default()).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { .. }));
    }

    #[test]
    fn longer_horizon_than_trained_is_skippable() {
        let (rows, closes) = rows_and_closes(100);
        let params = SequenceParams {
            window: 10,
            hidden_size: 4,
            ..SequenceParams::default()
        };
        let model = SequenceModel::fit(&rows, &closes, 3, params).unwrap();
        let err = model.forecast(&rows, &closes, 4).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientHistory {
                required: 4,
                available: 3
            }
        ));
        assert!(err.is_skippable());
        assert_eq!(model.forecast(&rows, &closes, 2).unwrap().len(), 2);
    }
}
