//! Combines per-model forecast tables into one ensemble table.
//!
//! Tables are inner-joined on date. With enough reconciled history a ridge
//! blend maps the models' predictions to the realized close; otherwise the
//! rows are the plain mean of the models.

pub mod history;

pub use history::{BlendHistory, BlendRecord};

use crate::domain::{CombineMethod, EnsembleRow, ForecastRow};
use crate::models::RidgeRegression;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ensembler {
    pub ridge_alpha: f64,
    /// Complete history rows needed before the learned blend is used.
    pub min_history_rows: usize,
}

impl Default for Ensembler {
    fn default() -> Self {
        Self {
            ridge_alpha: 1.0,
            min_history_rows: 3,
        }
    }
}

/// Dates present in every table, with each model's prediction in model
/// order. A date repeated within one table keeps its last row.
fn inner_join(tables: &BTreeMap<String, Vec<ForecastRow>>) -> BTreeMap<NaiveDate, Vec<f64>> {
    let by_date: Vec<BTreeMap<NaiveDate, f64>> = tables
        .values()
        .map(|rows| rows.iter().map(|r| (r.date, r.forecast_close)).collect())
        .collect();
    let Some((first, rest)) = by_date.split_first() else {
        return BTreeMap::new();
    };
    first
        .keys()
        .filter_map(|date| {
            let values: Option<Vec<f64>> = std::iter::once(first.get(date).copied())
                .chain(rest.iter().map(|m| m.get(date).copied()))
                .collect();
            values.map(|v| (*date, v))
        })
        .collect()
}

impl Ensembler {
    pub fn new(ridge_alpha: f64, min_history_rows: usize) -> Self {
        Self {
            ridge_alpha,
            min_history_rows,
        }
    }

    pub fn combine(
        &self,
        ticker: &str,
        tables: &BTreeMap<String, Vec<ForecastRow>>,
        history: Option<&BlendHistory>,
    ) -> Vec<EnsembleRow> {
        if tables.is_empty() {
            warn!(%ticker, "no usable model forecasts to ensemble");
            return Vec::new();
        }
        let models: Vec<String> = tables.keys().cloned().collect();
        let joined = inner_join(tables);
        if joined.is_empty() {
            warn!(%ticker, models = ?models, "model forecasts share no dates");
            return Vec::new();
        }

        let blend = history.and_then(|h| self.fit_blend(ticker, &models, h));
        let method = if blend.is_some() {
            CombineMethod::LearnedBlend
        } else {
            CombineMethod::Mean
        };
        info!(%ticker, %method, models = ?models, rows = joined.len(), "ensemble combined");

        joined
            .into_iter()
            .map(|(date, preds)| {
                let forecast_close = match &blend {
                    Some(ridge) => ridge.predict_one(&preds),
                    None => preds.iter().sum::<f64>() / preds.len() as f64,
                };
                EnsembleRow {
                    ticker: ticker.to_string(),
                    date,
                    forecast_close,
                    method,
                    models: models.clone(),
                }
            })
            .collect()
    }

    fn fit_blend(
        &self,
        ticker: &str,
        models: &[String],
        history: &BlendHistory,
    ) -> Option<RidgeRegression> {
        let (x, y) = history.training_set(models);
        if x.len() < self.min_history_rows.max(1) {
            info!(
                %ticker,
                complete = x.len(),
                required = self.min_history_rows,
                "not enough reconciled history, using mean"
            );
            return None;
        }
        match RidgeRegression::fit_single(&x, &y, self.ridge_alpha) {
            Ok(ridge) => Some(ridge),
            Err(e) => {
                warn!(%ticker, error = %e, "blend fit failed, using mean");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, PriceSeries};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn table(days: std::ops::RangeInclusive<u32>, value: impl Fn(u32) -> f64) -> Vec<ForecastRow> {
        days.map(|d| ForecastRow::point("T", day(d), value(d))).collect()
    }

    #[test]
    fn mean_of_two_models() {
        let mut tables = BTreeMap::new();
        tables.insert("a".to_string(), table(1..=3, |d| 99.0 + d as f64));
        tables.insert("b".to_string(), table(1..=3, |d| 103.0 - d as f64));
        let rows = Ensembler::default().combine("T", &tables, None);
        let closes: Vec<f64> = rows.iter().map(|r| r.forecast_close).collect();
        assert_eq!(closes, vec![101.0, 101.0, 101.0]);
        assert!(rows.iter().all(|r| r.method == CombineMethod::Mean));
        assert_eq!(rows[0].models, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn inner_join_keeps_shared_dates() {
        let mut tables = BTreeMap::new();
        tables.insert("a".to_string(), table(1..=7, |_| 1.0));
        tables.insert("b".to_string(), table(3..=10, |_| 3.0));
        let rows = Ensembler::default().combine("T", &tables, None);
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, (3..=7).map(day).collect::<Vec<_>>());
        assert!(rows.iter().all(|r| r.forecast_close == 2.0));
    }

    #[test]
    fn duplicate_date_keeps_last_row() {
        let mut tables = BTreeMap::new();
        let mut a = table(1..=2, |_| 1.0);
        a.push(ForecastRow::point("T", day(2), 5.0));
        tables.insert("a".to_string(), a);
        let rows = Ensembler::default().combine("T", &tables, None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].forecast_close, 5.0);
    }

    #[test]
    fn no_models_is_empty() {
        let rows = Ensembler::default().combine("T", &BTreeMap::new(), None);
        assert!(rows.is_empty());
    }

    #[test]
    fn short_history_falls_back_to_mean() {
        let mut tables = BTreeMap::new();
        tables.insert("a".to_string(), table(20..=21, |_| 10.0));
        tables.insert("b".to_string(), table(20..=21, |_| 20.0));
        let mut history = BlendHistory::new();
        history.record(&{
            let mut past = BTreeMap::new();
            past.insert("a".to_string(), table(1..=2, |_| 10.0));
            past.insert("b".to_string(), table(1..=2, |_| 20.0));
            past
        });
        history.reconcile(&PriceSeries::new(
            "T",
            vec![Bar::from_close(day(1), 12.0), Bar::from_close(day(2), 13.0)],
        ));
        let rows = Ensembler::default().combine("T", &tables, Some(&history));
        assert!(rows.iter().all(|r| r.method == CombineMethod::Mean));
        assert!(rows.iter().all(|r| r.forecast_close == 15.0));
    }

    #[test]
    fn learned_blend_tracks_the_better_model() {
        // Model "a" is always right, model "b" is noise around a constant.
        let mut past = BTreeMap::new();
        past.insert("a".to_string(), table(1..=20, |d| 100.0 + d as f64));
        past.insert(
            "b".to_string(),
            table(1..=20, |d| 50.0 + if d % 2 == 0 { 3.0 } else { -3.0 }),
        );
        let mut history = BlendHistory::new();
        history.record(&past);
        let realized: Vec<Bar> = (1..=20)
            .map(|d| Bar::from_close(day(d), 100.0 + d as f64))
            .collect();
        history.reconcile(&PriceSeries::new("T", realized));

        let mut tables = BTreeMap::new();
        tables.insert("a".to_string(), table(25..=26, |d| 100.0 + d as f64));
        tables.insert("b".to_string(), table(25..=26, |_| 50.0));
        let ensembler = Ensembler::new(1e-6, 3);
        let rows = ensembler.combine("T", &tables, Some(&history));
        assert!(rows.iter().all(|r| r.method == CombineMethod::LearnedBlend));
        assert!((rows[0].forecast_close - 125.0).abs() < 1e-3);
        assert!((rows[1].forecast_close - 126.0).abs() < 1e-3);
    }
}
