//! PriceCast CLI: run the forecasting pipeline stage by stage or end to end.
//!
//! Commands:
//! - `fetch`: download prices through the source fallback chain
//! - `preprocess`: compute features and write the train/eval split
//! - `train`: fit and persist every enabled model
//! - `evaluate`: score the gradient-boosted model on the eval split
//! - `forecast`: write one forecast table per model
//! - `ensemble`: combine the forecast tables on disk
//! - `run`: every stage in order

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pricecast_core::data::LookbackPeriod;
use pricecast_runner::{
    build_fetcher, ensemble, evaluate, forecast, preprocess, train, Pipeline, PipelineConfig,
    PipelineReport,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pricecast",
    about = "PriceCast: daily close forecasting from historical prices"
)]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOptions {
    /// Root for data/, models/ and results/. Overrides the config file and
    /// PRICECAST_BASE_DIR.
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also train and forecast with the LSTM sequence model.
    #[arg(long, global = true, default_value_t = false)]
    use_lstm: bool,

    /// Skip the gradient-boosted model.
    #[arg(long, global = true, default_value_t = false)]
    skip_xgb: bool,

    /// Do not pattern-adjust the recursive forecast.
    #[arg(long, global = true, default_value_t = false)]
    no_adjust: bool,

    /// Skip US federal holidays when generating forecast dates.
    #[arg(long, global = true, default_value_t = false)]
    holidays: bool,
}

#[derive(Args)]
struct Target {
    /// Ticker symbols (e.g. AAPL ^GSPC).
    #[arg(required = true)]
    tickers: Vec<String>,

    /// Lookback period: 30d, 6mo, 2y, max or a bare number of days.
    #[arg(long, default_value = "1y")]
    period: LookbackPeriod,

    /// Forecast horizon in trading days.
    #[arg(long, default_value_t = 5)]
    horizon: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Download prices and store the raw CSV.
    Fetch(Target),
    /// Compute features and write the chronological train/eval split.
    Preprocess(Target),
    /// Train every enabled model on the train split.
    Train(Target),
    /// Score the gradient-boosted model on the eval split.
    Evaluate(Target),
    /// Forecast the horizon with every enabled model.
    Forecast(Target),
    /// Combine the per-model forecast files.
    Ensemble(Target),
    /// Run every stage in order.
    Run(Target),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli.options)?;

    let failures = match cli.command {
        Commands::Fetch(t) => {
            let fetcher = build_fetcher(&config).context("building data sources")?;
            let summary = fetcher.fetch_many(&t.tickers, t.period);
            for (ticker, outcome) in &summary.fetched {
                println!(
                    "{ticker}: {} rows from {} -> {}",
                    outcome.series.len(),
                    outcome.source,
                    outcome.path.display()
                );
            }
            for (ticker, err) in &summary.errors {
                eprintln!("Error for {ticker}: {err}");
            }
            summary.errors.len()
        }
        Commands::Preprocess(t) => for_each(&t, |ticker| {
            let out = preprocess(&config, ticker)?;
            println!(
                "{ticker}: {} train rows -> {}, {} eval rows -> {}",
                out.train_rows,
                out.train_path.display(),
                out.eval_rows,
                out.eval_path.display()
            );
            Ok(())
        }),
        Commands::Train(t) => for_each(&t, |ticker| {
            let report = train(&config, ticker, t.horizon)?;
            for (kind, path) in &report.saved {
                println!("{ticker}: {kind} saved -> {}", path.display());
            }
            for (kind, reason) in &report.skipped {
                println!("{ticker}: {kind} skipped ({reason})");
            }
            Ok(())
        }),
        Commands::Evaluate(t) => for_each(&t, |ticker| {
            let m = evaluate(&config, ticker)?;
            println!(
                "{ticker}: n={} mse={:.6} mae={:.6}",
                m.n_samples, m.mse, m.mae
            );
            Ok(())
        }),
        Commands::Forecast(t) => for_each(&t, |ticker| {
            let batch = forecast(&config, ticker, t.horizon)?;
            for path in &batch.paths {
                println!("{ticker}: forecast -> {}", path.display());
            }
            for (kind, reason) in &batch.skipped {
                println!("{ticker}: {kind} skipped ({reason})");
            }
            Ok(())
        }),
        Commands::Ensemble(t) => for_each(&t, |ticker| {
            let out = ensemble(&config, ticker, t.horizon)?;
            println!(
                "{ticker}: {} ensemble rows -> {}",
                out.rows.len(),
                out.path.display()
            );
            Ok(())
        }),
        Commands::Run(t) => {
            let pipeline = Pipeline::new(config.clone());
            let mut failures = 0;
            for (ticker, result) in pipeline.run_many(&t.tickers, t.period, t.horizon) {
                match result {
                    Ok(report) => print_summary(&report),
                    Err(e) => {
                        eprintln!("Error for {ticker}: {e}");
                        failures += 1;
                    }
                }
            }
            failures
        }
    };

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn build_config(options: &GlobalOptions) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(options.config.as_deref()).with_context(|| {
        match &options.config {
            Some(path) => format!("loading config {}", path.display()),
            None => "loading default config".to_string(),
        }
    })?;
    if let Some(dir) = &options.base_dir {
        config.base_dir = dir.clone();
    }
    if options.use_lstm {
        config.models.use_lstm = true;
    }
    if options.skip_xgb {
        config.models.skip_gbm = true;
    }
    if options.no_adjust {
        config.forecast.pattern_adjust = false;
    }
    if options.holidays {
        config.forecast.holidays = true;
    }
    debug!(
        base_dir = %config.base_dir.display(),
        sources = ?config.fetch.sources,
        "config ready"
    );
    Ok(config)
}

/// Run `stage` for every ticker, printing failures. Returns the failure count.
fn for_each<F>(target: &Target, mut stage: F) -> usize
where
    F: FnMut(&str) -> Result<()>,
{
    let mut failures = 0;
    for ticker in &target.tickers {
        if let Err(e) = stage(ticker).with_context(|| format!("ticker {ticker}")) {
            eprintln!("Error: {e:#}");
            failures += 1;
        }
    }
    failures
}

fn print_summary(report: &PipelineReport) {
    println!();
    println!("=== {} ===", report.ticker);
    println!("Source:        {} ({} rows)", report.source, report.raw_rows);
    let saved: Vec<String> = report
        .training
        .saved
        .iter()
        .map(|(kind, _)| kind.to_string())
        .collect();
    println!("Trained:       {}", if saved.is_empty() { "-".to_string() } else { saved.join(", ") });
    if let Some(m) = &report.evaluation {
        println!("Eval (gbm):    n={} mse={:.4} mae={:.4}", m.n_samples, m.mse, m.mae);
    }
    for (kind, reason) in report
        .training
        .skipped
        .iter()
        .chain(&report.forecasts.skipped)
    {
        println!("Skipped:       {kind} ({reason})");
    }
    println!();
    println!("{:<12} {:>14} {:<14}", "Date", "Forecast", "Method");
    for row in &report.ensemble.rows {
        println!(
            "{:<12} {:>14.4} {:<14}",
            row.date.to_string(),
            row.forecast_close,
            row.method.as_str()
        );
    }
    println!();
    println!("Ensemble saved to: {}", report.ensemble.path.display());
}
