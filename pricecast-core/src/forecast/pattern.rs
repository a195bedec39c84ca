//! Nearest-neighbour return-pattern adjustment of a base forecast.
//!
//! The last `window` daily returns form the current pattern. Every earlier
//! stretch of history with `window` returns followed by `horizon` realized
//! closes is a candidate. The `neighbors` closest candidates (Euclidean)
//! vote with their cumulative return at each step, and step `h` of the base
//! forecast is scaled by `1 + mean return at h`.

use crate::domain::ForecastRow;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternAdjuster {
    pub window: usize,
    pub neighbors: usize,
}

impl Default for PatternAdjuster {
    fn default() -> Self {
        Self {
            window: 7,
            neighbors: 5,
        }
    }
}

struct Candidate {
    distance: f64,
    future: Vec<f64>,
}

fn returns(closes: &[f64]) -> Option<Vec<f64>> {
    let out: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    out.iter().all(|r| r.is_finite()).then_some(out)
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

impl PatternAdjuster {
    pub fn new(window: usize, neighbors: usize) -> Self {
        Self { window, neighbors }
    }

    /// Mean cumulative return per forecast step of the nearest historical
    /// patterns, or `None` when no candidate pattern exists.
    pub fn neighbor_returns(&self, closes: &[f64], horizon: usize) -> Option<Vec<f64>> {
        let window = self.window;
        if window == 0 || self.neighbors == 0 || horizon == 0 || closes.len() < window + 1 {
            return None;
        }
        let current = returns(&closes[closes.len() - window - 1..])?;

        let mut candidates: Vec<Candidate> = (0..closes.len().saturating_sub(window + horizon))
            .filter_map(|start| {
                let pattern = returns(&closes[start..=start + window])?;
                let base = closes[start + window];
                let future: Vec<f64> = (1..=horizon)
                    .map(|h| closes[start + window + h] / base - 1.0)
                    .collect();
                future.iter().all(|r| r.is_finite()).then(|| Candidate {
                    distance: distance(&pattern, &current),
                    future,
                })
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        let k = self.neighbors.min(candidates.len());
        let nearest = &candidates[..k];
        Some(
            (0..horizon)
                .map(|h| nearest.iter().map(|c| c.future[h]).sum::<f64>() / k as f64)
                .collect(),
        )
    }

    /// Scale `rows` in place by the neighbour returns. Each row keeps its
    /// unadjusted close in `base_close`. Rows are untouched when no
    /// historical pattern fits.
    pub fn adjust(&self, closes: &[f64], rows: &mut [ForecastRow]) -> bool {
        let Some(avg) = self.neighbor_returns(closes, rows.len()) else {
            debug!(history = closes.len(), "no historical pattern to adjust by");
            return false;
        };
        for (row, ret) in rows.iter_mut().zip(avg) {
            row.base_close = Some(row.forecast_close);
            row.forecast_close *= 1.0 + ret;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rows(values: &[f64]) -> Vec<ForecastRow> {
        let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| ForecastRow::point("T", start + chrono::Duration::days(i as i64), v))
            .collect()
    }

    #[test]
    fn short_history_leaves_rows_unchanged() {
        let adjuster = PatternAdjuster::default();
        let mut out = rows(&[10.0, 11.0]);
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        assert!(!adjuster.adjust(&closes, &mut out));
        assert_eq!(out[0].forecast_close, 10.0);
        assert!(out[0].base_close.is_none());
    }

    #[test]
    fn geometric_growth_is_projected_forward() {
        // Constant 1% daily growth: every pattern is identical and each
        // candidate's future return at step h is 1.01^h - 1.
        let closes: Vec<f64> = (0..60).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let adjuster = PatternAdjuster::new(5, 3);
        let avg = adjuster.neighbor_returns(&closes, 2).unwrap();
        assert!((avg[0] - 0.01).abs() < 1e-9);
        assert!((avg[1] - (1.01f64.powi(2) - 1.0)).abs() < 1e-9);

        let mut out = rows(&[50.0, 50.0]);
        assert!(adjuster.adjust(&closes, &mut out));
        assert_eq!(out[0].base_close, Some(50.0));
        assert!((out[0].forecast_close - 50.5).abs() < 1e-9);
    }

    #[test]
    fn flat_history_keeps_forecast() {
        let closes = vec![20.0; 40];
        let mut out = rows(&[20.0, 20.0, 20.0]);
        assert!(PatternAdjuster::default().adjust(&closes, &mut out));
        assert!(out.iter().all(|r| r.forecast_close == 20.0));
        assert!(out.iter().all(|r| r.base_close == Some(20.0)));
    }

    #[test]
    fn nearest_pattern_wins() {
        // Rising stretch followed by a rise, falling stretch followed by a
        // fall; the current (rising) tail must pick the rising precedent.
        let mut closes = vec![100.0, 101.0, 102.0, 103.0, 110.0];
        closes.extend([109.0, 108.0, 107.0, 100.0]);
        closes.extend([101.0, 102.0, 103.0]);
        let adjuster = PatternAdjuster::new(3, 1);
        let avg = adjuster.neighbor_returns(&closes, 1).unwrap();
        assert!((avg[0] - (110.0 / 103.0 - 1.0)).abs() < 1e-12);
    }
}
