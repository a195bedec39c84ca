//! Percentage return over a fixed number of rows.
//!
//! return[t] = close[t] / close[t - lag] - 1. The first `lag` rows, and any
//! row whose base close is zero, are filled with 0.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct PctReturn {
    lag: usize,
    name: String,
}

impl PctReturn {
    pub fn new(lag: usize) -> Self {
        assert!(lag >= 1, "return lag must be >= 1");
        Self {
            lag,
            name: format!("return_{lag}d"),
        }
    }
}

impl Indicator for PctReturn {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.lag + 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        (0..closes.len())
            .map(|i| {
                if i < self.lag {
                    return 0.0;
                }
                let base = closes[i - self.lag];
                let r = closes[i] / base - 1.0;
                if r.is_finite() {
                    r
                } else {
                    0.0
                }
            })
            .collect()
    }
}
