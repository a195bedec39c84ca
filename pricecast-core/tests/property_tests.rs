//! Property tests for the feature and forecast invariants.
//!
//! Uses proptest to verify:
//! 1. Row count: a feature table has one row per input bar
//! 2. RSI bounds: RSI stays within [0, 100]
//! 3. Idempotence: computing features twice is bit-identical
//! 4. Horizon: a recursive forecast has exactly `horizon` rows on
//!    strictly increasing weekdays

use chrono::{Datelike, NaiveDate, Weekday};
use proptest::prelude::*;
use pricecast_core::domain::{Bar, PriceSeries, TradingCalendar};
use pricecast_core::error::ForecastError;
use pricecast_core::features::{FeatureConfig, FeatureEngine};
use pricecast_core::forecast::RecursiveForecaster;
use pricecast_core::models::Predictor;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1000.0_f64, min..max)
}

fn series_from(closes: &[f64]) -> PriceSeries {
    let cal = TradingCalendar::weekdays();
    let mut date = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let bars = closes
        .iter()
        .map(|&c| {
            let bar = Bar {
                date,
                open: c,
                high: c * 1.01,
                low: c * 0.99,
                close: c,
                volume: 10_000.0,
            };
            date = cal.next_trading_day(date);
            bar
        })
        .collect();
    PriceSeries::new("PROP", bars)
}

/// Predicts the last open, which the forecaster carries forward unchanged.
struct EchoOpen(Vec<String>);

impl Predictor for EchoOpen {
    fn name(&self) -> &str {
        "echo_open"
    }

    fn feature_columns(&self) -> &[String] {
        &self.0
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        Ok(rows.iter().map(|r| r[0]).collect())
    }
}

// ── 1. Row count ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn feature_rows_match_input(closes in arb_closes(20, 200)) {
        let series = series_from(&closes);
        let table = FeatureEngine::default().compute(&series);
        prop_assert_eq!(table.len(), series.len());
        for column in table.columns() {
            prop_assert_eq!(column.values.len(), series.len());
            prop_assert!(column.values.iter().all(|v| v.is_finite()));
        }
    }
}

// ── 2. RSI bounds ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_is_bounded(closes in arb_closes(2, 300)) {
        let table = FeatureEngine::default().compute(&series_from(&closes));
        let rsi = table.column("rsi_14").unwrap();
        for v in rsi {
            prop_assert!((0.0..=100.0).contains(v), "rsi out of range: {}", v);
        }
    }
}

// ── 3. Idempotence ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn features_are_idempotent(closes in arb_closes(1, 150)) {
        let series = series_from(&closes);
        let engine = FeatureEngine::default();
        let a = engine.compute(&series);
        let b = engine.compute(&series);
        prop_assert_eq!(a.content_hash(), b.content_hash());
        prop_assert_eq!(a, b);
    }
}

// ── 4. Horizon ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn recursive_forecast_has_horizon_weekday_rows(
        closes in arb_closes(20, 80),
        horizon in 1usize..15,
    ) {
        let series = series_from(&closes);
        let last = series.last().unwrap().date;
        let forecaster = RecursiveForecaster::new(
            FeatureEngine::new(FeatureConfig::default()).unwrap(),
            TradingCalendar::weekdays(),
        );
        let model = EchoOpen(vec!["open".to_string()]);
        let rows = forecaster.forecast(&model, &series, horizon).unwrap();
        prop_assert_eq!(rows.len(), horizon);
        prop_assert!(rows[0].date > last);
        for pair in rows.windows(2) {
            prop_assert!(pair[1].date > pair[0].date);
        }
        for row in &rows {
            prop_assert!(!matches!(row.date.weekday(), Weekday::Sat | Weekday::Sun));
        }
    }
}
