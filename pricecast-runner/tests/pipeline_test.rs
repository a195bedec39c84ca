//! End-to-end pipeline runs against a local raw file, no network.

use chrono::{Datelike, NaiveDate, Weekday};
use pricecast_core::data::{write_price_csv, DataSource, LookbackPeriod};
use pricecast_core::domain::{Bar, CombineMethod, PriceSeries};
use pricecast_core::ensemble::BlendHistory;
use pricecast_core::models::ModelKind;
use pricecast_runner::export::{ensemble_path, eval_path, forecast_path, history_path};
use pricecast_runner::preprocess::{split_path, Split};
use pricecast_runner::{Pipeline, PipelineConfig, StageError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;

fn weekdays(n: usize) -> Vec<NaiveDate> {
    let mut d = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(d);
        }
        d = d.succ_opt().unwrap();
    }
    out
}

fn noisy_series(ticker: &str, n: usize) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut close = 100.0;
    let bars = weekdays(n)
        .into_iter()
        .map(|date| {
            let open = close;
            close += 0.05 + rng.gen_range(-1.0..1.0);
            Bar {
                date,
                open,
                high: open.max(close) + rng.gen_range(0.0..0.5),
                low: open.min(close) - rng.gen_range(0.0..0.5),
                close,
                volume: rng.gen_range(1e5..1e6),
            }
        })
        .collect();
    PriceSeries::new(ticker, bars)
}

fn offline_config(base: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::with_base_dir(base);
    config.fetch.sources = vec!["local".into()];
    config.models.gbm.n_estimators = 20;
    config
}

fn seed_raw(config: &PipelineConfig, series: &PriceSeries) {
    fs::create_dir_all(config.raw_dir()).unwrap();
    let file = fs::File::create(config.raw_dir().join(format!("{}.csv", series.ticker()))).unwrap();
    write_price_csv(series, file).unwrap();
}

#[test]
fn full_run_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());
    seed_raw(&config, &noisy_series("ACME", 200));

    let report = Pipeline::new(config.clone())
        .run("ACME", LookbackPeriod::Max, 5)
        .unwrap();

    assert_eq!(report.source, DataSource::LocalCsv);
    assert_eq!(report.raw_rows, 200);
    let pre = report.preprocess.as_ref().unwrap();
    assert_eq!(pre.train_rows + pre.eval_rows, 200);
    assert!(split_path(&config, "ACME", Split::Train).is_file());
    assert!(split_path(&config, "ACME", Split::Eval).is_file());

    let saved: Vec<ModelKind> = report.training.saved.iter().map(|(k, _)| *k).collect();
    assert_eq!(saved, vec![ModelKind::GradientBoosted, ModelKind::Seasonal]);

    let eval = report.evaluation.as_ref().unwrap();
    assert_eq!(eval.n_samples, pre.eval_rows);
    assert!(eval.mae.is_finite());
    assert!(eval_path(&config, "ACME").is_file());

    for model in ["gbm", "seasonal"] {
        assert!(forecast_path(&config, "ACME", model, 5).is_file(), "{model}");
        assert_eq!(report.forecasts.tables[model].len(), 5);
    }
    assert_eq!(report.ensemble.rows.len(), 5);
    assert!(report
        .ensemble
        .rows
        .iter()
        .all(|r| r.method == CombineMethod::Mean && r.forecast_close.is_finite()));
    assert!(ensemble_path(&config, "ACME", 5).is_file());

    let history = BlendHistory::load(&history_path(&config, "ACME")).unwrap();
    assert_eq!(history.len(), 5);
}

#[test]
fn sequence_model_joins_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = offline_config(dir.path());
    config.models.use_lstm = true;
    config.models.sequence.window = 20;
    config.models.sequence.hidden_size = 8;
    seed_raw(&config, &noisy_series("ACME", 200));

    let report = Pipeline::new(config.clone())
        .run("ACME", LookbackPeriod::Max, 5)
        .unwrap();
    assert_eq!(report.forecasts.tables.len(), 3);
    assert!(forecast_path(&config, "ACME", "lstm", 5).is_file());
    assert_eq!(report.ensemble.rows.len(), 5);
    assert!(report.ensemble.rows[0].models.contains(&"lstm".to_string()));
}

#[test]
fn too_short_for_every_model_is_no_usable_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());
    seed_raw(&config, &noisy_series("TINY", 8));

    let err = Pipeline::new(config)
        .run("TINY", LookbackPeriod::Max, 3)
        .unwrap_err();
    assert!(matches!(err, StageError::NoUsableForecast { .. }));
}

#[test]
fn short_history_falls_back_to_seasonal_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = offline_config(dir.path());
    config.features.windows = vec![5, 10, 30];
    seed_raw(&config, &noisy_series("SHORT", 25));

    let report = Pipeline::new(config)
        .run("SHORT", LookbackPeriod::Max, 3)
        .unwrap();
    assert!(report.preprocess.is_none());
    assert!(report.training.saved.is_empty());
    assert!(report.evaluation.is_none());
    assert_eq!(report.forecasts.tables.len(), 1);
    assert_eq!(report.ensemble.rows.len(), 3);
    assert_eq!(report.ensemble.rows[0].models, vec!["seasonal".to_string()]);
}

#[test]
fn lookback_period_crops_the_raw_series() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());
    seed_raw(&config, &noisy_series("ACME", 200));

    let report = Pipeline::new(config)
        .run("ACME", LookbackPeriod::Days(140), 3)
        .unwrap();
    assert!(report.raw_rows < 200);
    assert_eq!(report.ensemble.rows.len(), 3);
}

#[test]
fn forecast_beyond_trained_horizon_skips_sequence_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = offline_config(dir.path());
    config.models.use_lstm = true;
    config.models.sequence.window = 20;
    config.models.sequence.hidden_size = 8;
    seed_raw(&config, &noisy_series("ACME", 200));
    Pipeline::new(config.clone())
        .run("ACME", LookbackPeriod::Max, 5)
        .unwrap();

    let batch = pricecast_runner::forecast(&config, "ACME", 10).unwrap();
    for model in ["gbm", "seasonal"] {
        assert_eq!(batch.tables[model].len(), 10, "{model}");
        assert!(forecast_path(&config, "ACME", model, 10).is_file(), "{model}");
    }
    assert!(!batch.tables.contains_key("lstm"));
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].0, ModelKind::Sequence);
    assert!(!forecast_path(&config, "ACME", "lstm", 10).exists());

    let shorter = pricecast_runner::forecast(&config, "ACME", 3).unwrap();
    assert_eq!(shorter.tables.len(), 3);
    assert_eq!(shorter.tables["lstm"].len(), 3);
}

#[test]
fn short_lookback_keeps_local_raw_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());
    seed_raw(&config, &noisy_series("ACME", 200));
    let pipeline = Pipeline::new(config.clone());

    let short = pipeline.run("ACME", LookbackPeriod::Days(60), 3).unwrap();
    assert!(short.raw_rows < 200);
    assert_eq!(pricecast_runner::load_raw(&config, "ACME").unwrap().len(), 200);

    let full = pipeline.run("ACME", LookbackPeriod::Max, 3).unwrap();
    assert_eq!(full.source, DataSource::LocalCsv);
    assert_eq!(full.raw_rows, 200);
}
