//! Criterion benchmarks for PriceCast hot paths.
//!
//! Benchmarks:
//! 1. Feature engine over histories of increasing length
//! 2. Recursive forecast loop with a trained GBM
//! 3. Seasonal fit + forecast

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pricecast_core::domain::{Bar, PriceSeries, TradingCalendar};
use pricecast_core::features::FeatureEngine;
use pricecast_core::forecast::{DirectForecaster, RecursiveForecaster};
use pricecast_core::models::{GbmParams, GbmTrainer, ModelAdapter};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize) -> PriceSeries {
    let cal = TradingCalendar::weekdays();
    let mut date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let bars = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + (i as f64 * 0.73).cos();
            let bar = Bar {
                date,
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0 + (i % 500) as f64,
            };
            date = cal.next_trading_day(date);
            bar
        })
        .collect();
    PriceSeries::new("BENCH", bars)
}

// ── 1. Feature engine ────────────────────────────────────────────────

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_engine");
    let engine = FeatureEngine::default();
    for n in [252usize, 1260, 5000] {
        let series = make_series(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &series, |b, s| {
            b.iter(|| black_box(engine.compute(s)))
        });
    }
    group.finish();
}

// ── 2. Recursive loop ────────────────────────────────────────────────

fn bench_recursive(c: &mut Criterion) {
    let mut group = c.benchmark_group("recursive_forecast");
    let series = make_series(500);
    let table = FeatureEngine::default().compute(&series);
    let trainer = GbmTrainer {
        params: GbmParams {
            n_estimators: 50,
            ..GbmParams::default()
        },
        ..GbmTrainer::default()
    };
    let model = trainer.train("BENCH", &table).unwrap();
    let forecaster = RecursiveForecaster::default();
    for horizon in [5usize, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(horizon), &horizon, |b, &h| {
            b.iter(|| black_box(forecaster.forecast(&model, &series, h).unwrap()))
        });
    }
    group.finish();
}

// ── 3. Seasonal ──────────────────────────────────────────────────────

fn bench_seasonal(c: &mut Criterion) {
    let series = make_series(750);
    let direct = DirectForecaster::default();
    c.bench_function("seasonal_fit_forecast_750", |b| {
        b.iter(|| black_box(direct.forecast_seasonal(&series, 10).unwrap()))
    });
}

criterion_group!(benches, bench_features, bench_recursive, bench_seasonal);
criterion_main!(benches);
