//! Relative Strength Index (RSI).
//!
//! Gains and losses of the close-to-close change are smoothed with an EMA of
//! alpha = 1 / period, seeded with the first change (taken as zero).
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), with a zero average loss
//! replaced by 1e-8 so a monotonically rising series saturates just below 100.

use super::ema::ema_of_series;
use super::Indicator;

const LOSS_FLOOR: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let mut gains = Vec::with_capacity(closes.len());
        let mut losses = Vec::with_capacity(closes.len());
        for i in 0..closes.len() {
            let change = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
            gains.push(change.max(0.0));
            losses.push((-change).max(0.0));
        }

        let alpha = 1.0 / self.period as f64;
        let avg_gain = ema_of_series(&gains, alpha);
        let avg_loss = ema_of_series(&losses, alpha);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| {
                let l = if l == 0.0 { LOSS_FLOOR } else { l };
                100.0 - 100.0 / (1.0 + g / l)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rsi_all_gains_approaches_100() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = Rsi::new(14).compute(&closes);
        assert!(result[29] > 99.9 && result[29] < 100.0);
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let result = Rsi::new(14).compute(&closes);
        assert_approx(result[29], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_flat_series_is_zero() {
        // No gains, loss floored: 100 - 100 / (1 + 0) = 0.
        let result = Rsi::new(14).compute(&[50.0; 20]);
        assert!(result.iter().all(|&v| v.abs() < DEFAULT_EPSILON));
    }

    #[test]
    fn rsi_known_values() {
        // period 2 → alpha 0.5. Changes: 0, +2, -1.
        // gains: 0, 1, 0.5   losses: 0, 0, 0.5
        // rs[2] = 1 → RSI 50
        let result = Rsi::new(2).compute(&[10.0, 12.0, 11.0]);
        assert_approx(result[2], 50.0, 1e-9);
    }

    #[test]
    fn rsi_bounded() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0 + (i as f64 * 1.3).cos())
            .collect();
        for v in Rsi::new(14).compute(&closes) {
            assert!((0.0..=100.0).contains(&v), "rsi out of range: {v}");
        }
    }
}
