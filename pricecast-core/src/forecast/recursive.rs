//! Recursive multi-day forecasting with a point predictor.
//!
//! Each step recomputes features over the seed history plus the synthetic
//! bars produced so far, predicts the next close from the last feature row,
//! and appends a synthetic bar dated on the next trading day. The synthetic
//! bars live in their own accumulator, threaded by value through the steps,
//! so the seed history is never modified.

use crate::domain::{Bar, ForecastRow, PriceSeries, TradingCalendar};
use crate::error::ForecastError;
use crate::features::FeatureEngine;
use crate::models::Predictor;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct RecursiveForecaster {
    engine: FeatureEngine,
    calendar: TradingCalendar,
}

impl RecursiveForecaster {
    pub fn new(engine: FeatureEngine, calendar: TradingCalendar) -> Self {
        Self { engine, calendar }
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    /// Forecast `horizon` trading days past the end of `seed`.
    pub fn forecast<P: Predictor + ?Sized>(
        &self,
        model: &P,
        seed: &PriceSeries,
        horizon: usize,
    ) -> Result<Vec<ForecastRow>, ForecastError> {
        let required = self.engine.config().min_history();
        if seed.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                available: seed.len(),
            });
        }

        let mut synthetic = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            synthetic = self.step(model, seed, synthetic)?;
        }

        debug!(
            ticker = seed.ticker(),
            model = model.name(),
            horizon,
            "recursive forecast complete"
        );
        Ok(synthetic
            .into_iter()
            .map(|bar| ForecastRow::point(seed.ticker(), bar.date, bar.close))
            .collect())
    }

    /// One step: predict the next close and return the accumulator with the
    /// new synthetic bar appended.
    fn step<P: Predictor + ?Sized>(
        &self,
        model: &P,
        seed: &PriceSeries,
        mut synthetic: Vec<Bar>,
    ) -> Result<Vec<Bar>, ForecastError> {
        let history: Vec<Bar> = seed.bars().iter().chain(&synthetic).copied().collect();
        let Some(&last) = history.last() else {
            return Err(ForecastError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        };

        let table = self.engine.compute_bars(&history);
        let row = table.last_row(model.feature_columns())?;
        let prediction = model
            .predict(&[row])?
            .first()
            .copied()
            .ok_or_else(|| {
                ForecastError::ConvergenceError(format!("{} returned no prediction", model.name()))
            })?;
        if !prediction.is_finite() {
            return Err(ForecastError::ConvergenceError(format!(
                "{} predicted a non-finite close",
                model.name()
            )));
        }

        synthetic.push(Bar {
            date: self.calendar.next_trading_day(last.date),
            close: prediction,
            ..last
        });
        Ok(synthetic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureConfig;
    use chrono::{Datelike, NaiveDate, Weekday};

    /// Predicts the last close by echoing the 1-window SMA, which equals the
    /// close itself.
    struct LastClose {
        columns: Vec<String>,
    }

    impl LastClose {
        fn new() -> Self {
            Self {
                columns: vec!["sma_1".into()],
            }
        }
    }

    impl Predictor for LastClose {
        fn name(&self) -> &str {
            "last_close"
        }

        fn feature_columns(&self) -> &[String] {
            &self.columns
        }

        fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
            Ok(rows.iter().map(|r| r[0]).collect())
        }
    }

    /// Predicts last close + 1.
    struct Drift(Vec<String>);

    impl Predictor for Drift {
        fn name(&self) -> &str {
            "drift"
        }

        fn feature_columns(&self) -> &[String] {
            &self.0
        }

        fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
            Ok(rows.iter().map(|r| r[0] + 1.0).collect())
        }
    }

    fn engine() -> FeatureEngine {
        FeatureEngine::new(FeatureConfig {
            windows: vec![1, 5, 20],
            ..FeatureConfig::default()
        })
        .unwrap()
    }

    fn flat_series(n: usize, close: f64) -> PriceSeries {
        let cal = TradingCalendar::weekdays();
        let mut date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut bars = Vec::with_capacity(n);
        for _ in 0..n {
            bars.push(Bar {
                date,
                open: close,
                high: close,
                low: close,
                close,
                volume: 500.0,
            });
            date = cal.next_trading_day(date);
        }
        PriceSeries::new("FLAT", bars)
    }

    #[test]
    fn flat_history_forecasts_the_constant() {
        let f = RecursiveForecaster::new(engine(), TradingCalendar::weekdays());
        let rows = f.forecast(&LastClose::new(), &flat_series(30, 42.0), 5).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.forecast_close == 42.0));
        assert!(rows.iter().all(|r| r.ticker == "FLAT" && !r.has_interval()));
    }

    #[test]
    fn dates_are_increasing_trading_days_after_seed() {
        let seed = flat_series(30, 10.0);
        let last = seed.last().unwrap().date;
        let f = RecursiveForecaster::new(engine(), TradingCalendar::weekdays());
        let rows = f.forecast(&LastClose::new(), &seed, 7).unwrap();
        assert!(rows[0].date > last);
        assert_eq!(rows[0].date, TradingCalendar::weekdays().next_trading_day(last));
        for pair in rows.windows(2) {
            assert!(pair[1].date > pair[0].date);
        }
        for r in &rows {
            assert!(!matches!(r.date.weekday(), Weekday::Sat | Weekday::Sun));
        }
    }

    #[test]
    fn predictions_feed_back_into_the_next_step() {
        let f = RecursiveForecaster::new(engine(), TradingCalendar::weekdays());
        let model = Drift(vec!["sma_1".into()]);
        let rows = f.forecast(&model, &flat_series(30, 100.0), 3).unwrap();
        let closes: Vec<f64> = rows.iter().map(|r| r.forecast_close).collect();
        assert_eq!(closes, vec![101.0, 102.0, 103.0]);
    }

    #[test]
    fn seed_is_not_mutated() {
        let seed = flat_series(30, 10.0);
        let before = seed.clone();
        let f = RecursiveForecaster::new(engine(), TradingCalendar::weekdays());
        f.forecast(&LastClose::new(), &seed, 4).unwrap();
        assert_eq!(seed, before);
    }

    #[test]
    fn short_seed_is_insufficient_history() {
        let f = RecursiveForecaster::new(engine(), TradingCalendar::weekdays());
        let err = f
            .forecast(&LastClose::new(), &flat_series(10, 1.0), 3)
            .unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientHistory {
                required: 20,
                available: 10
            }
        ));
    }

    #[test]
    fn unknown_feature_column_is_missing_column() {
        let f = RecursiveForecaster::new(engine(), TradingCalendar::weekdays());
        let model = Drift(vec!["macd".into()]);
        let err = f.forecast(&model, &flat_series(30, 1.0), 1).unwrap_err();
        assert!(matches!(err, ForecastError::MissingColumn { .. }));
    }

    #[test]
    fn zero_horizon_is_empty() {
        let f = RecursiveForecaster::new(engine(), TradingCalendar::weekdays());
        let rows = f.forecast(&LastClose::new(), &flat_series(30, 1.0), 0).unwrap();
        assert!(rows.is_empty());
    }
}
