//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window. Rows before the
//! window fills average whatever is available (minimum one observation).

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let mut result = Vec::with_capacity(closes.len());
        let mut sum = 0.0;
        for (i, &close) in closes.iter().enumerate() {
            sum += close;
            if i >= self.period {
                sum -= closes[i - self.period];
            }
            let count = (i + 1).min(self.period);
            result.push(sum / count as f64);
        }
        result
    }
}
