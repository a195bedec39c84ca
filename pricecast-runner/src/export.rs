//! Result files: forecast and ensemble CSVs, evaluation JSON.
//!
//! Forecast CSV columns: `date,ticker,forecast_close`, then
//! `lower_95ci,upper_95ci` when any row carries an interval, then
//! `base_close` when any row was pattern-adjusted. Ensemble CSVs share the
//! first three columns and add `method`.
//!
//! Every file is written to a `.tmp` sibling and renamed into place.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use pricecast_core::data::write_atomic;
use pricecast_core::domain::{safe_ticker, EnsembleRow, ForecastRow};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::StageError;

// ─── Paths ──────────────────────────────────────────────────────────

pub fn forecast_path(config: &PipelineConfig, ticker: &str, model: &str, horizon: usize) -> PathBuf {
    config
        .results_dir()
        .join(format!("{}_{model}_{horizon}d.csv", safe_ticker(ticker)))
}

pub fn ensemble_path(config: &PipelineConfig, ticker: &str, horizon: usize) -> PathBuf {
    forecast_path(config, ticker, "ensemble", horizon)
}

pub fn eval_path(config: &PipelineConfig, ticker: &str) -> PathBuf {
    config
        .results_dir()
        .join(format!("{}_eval_results.json", safe_ticker(ticker)))
}

pub fn history_path(config: &PipelineConfig, ticker: &str) -> PathBuf {
    config
        .results_dir()
        .join(format!("{}_history_preds.csv", safe_ticker(ticker)))
}

// ─── Forecast CSV ───────────────────────────────────────────────────

fn num(v: f64) -> String {
    format!("{v:.6}")
}

pub fn write_forecast_csv<W: Write>(rows: &[ForecastRow], writer: W) -> Result<(), StageError> {
    let with_interval = rows.iter().any(ForecastRow::has_interval);
    let with_base = rows.iter().any(|r| r.base_close.is_some());

    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec!["date", "ticker", "forecast_close"];
    if with_interval {
        header.extend(["lower_95ci", "upper_95ci"]);
    }
    if with_base {
        header.push("base_close");
    }
    wtr.write_record(&header)?;

    let opt = |v: Option<f64>| v.map(num).unwrap_or_default();
    for row in rows {
        let mut record = vec![row.date.to_string(), row.ticker.clone(), num(row.forecast_close)];
        if with_interval {
            record.push(opt(row.lower_95ci));
            record.push(opt(row.upper_95ci));
        }
        if with_base {
            record.push(opt(row.base_close));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a file written by [`write_forecast_csv`]. Optional columns may be
/// absent.
pub fn read_forecast_csv<R: Read>(reader: R) -> Result<Vec<ForecastRow>, StageError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let idx = |name: &str| headers.iter().position(|h| h.trim() == name);
    let required = |name: &str| {
        idx(name).ok_or_else(|| {
            StageError::Forecast(pricecast_core::ForecastError::MissingColumn {
                column: name.to_string(),
            })
        })
    };
    let date_i = required("date")?;
    let ticker_i = required("ticker")?;
    let close_i = required("forecast_close")?;
    let (lower_i, upper_i, base_i) = (idx("lower_95ci"), idx("upper_95ci"), idx("base_close"));

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let cell = |i: usize| record.get(i).map(str::trim).unwrap_or("");
        let bad = |what: &str| {
            StageError::Forecast(pricecast_core::ForecastError::InvalidInput(format!(
                "forecast row {}: bad {what}",
                line + 2
            )))
        };
        let optional = |i: Option<usize>| -> Option<f64> {
            i.map(cell).filter(|s| !s.is_empty()).and_then(|s| s.parse().ok())
        };
        let date = NaiveDate::parse_from_str(cell(date_i), "%Y-%m-%d").map_err(|_| bad("date"))?;
        let forecast_close: f64 = cell(close_i).parse().map_err(|_| bad("forecast_close"))?;
        rows.push(ForecastRow {
            ticker: cell(ticker_i).to_string(),
            date,
            forecast_close,
            lower_95ci: optional(lower_i),
            upper_95ci: optional(upper_i),
            base_close: optional(base_i),
        });
    }
    Ok(rows)
}

pub fn save_forecast(path: &Path, rows: &[ForecastRow]) -> Result<(), StageError> {
    let mut buf = Vec::new();
    write_forecast_csv(rows, &mut buf)?;
    write_atomic(path, &buf)?;
    Ok(())
}

pub fn load_forecast(path: &Path) -> Result<Vec<ForecastRow>, StageError> {
    read_forecast_csv(std::fs::File::open(path)?)
}

// ─── Ensemble CSV ───────────────────────────────────────────────────

pub fn write_ensemble_csv<W: Write>(rows: &[EnsembleRow], writer: W) -> Result<(), StageError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", "ticker", "forecast_close", "method"])?;
    for row in rows {
        wtr.write_record([
            row.date.to_string(),
            row.ticker.clone(),
            num(row.forecast_close),
            row.method.as_str().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_ensemble(path: &Path, rows: &[EnsembleRow]) -> Result<(), StageError> {
    let mut buf = Vec::new();
    write_ensemble_csv(rows, &mut buf)?;
    write_atomic(path, &buf)?;
    Ok(())
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StageError> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricecast_core::domain::CombineMethod;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[test]
    fn point_forecast_has_three_columns() {
        let rows = vec![ForecastRow::point("AAPL", day(1), 190.5)];
        let mut buf = Vec::new();
        write_forecast_csv(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "date,ticker,forecast_close\n2024-07-01,AAPL,190.500000\n"
        );
    }

    #[test]
    fn interval_and_base_columns_round_trip() {
        let mut adjusted = ForecastRow::point("^GSPC", day(2), 5000.0).with_interval(4900.0, 5100.0);
        adjusted.base_close = Some(4990.0);
        let rows = vec![ForecastRow::point("^GSPC", day(1), 4995.0), adjusted];
        let mut buf = Vec::new();
        write_forecast_csv(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("date,ticker,forecast_close,lower_95ci,upper_95ci,base_close\n"));
        assert!(text.contains("2024-07-01,^GSPC,4995.000000,,,\n"));
        assert_eq!(read_forecast_csv(buf.as_slice()).unwrap(), rows);
    }

    #[test]
    fn ensemble_csv_names_the_method() {
        let rows = vec![EnsembleRow {
            ticker: "MSFT".into(),
            date: day(3),
            forecast_close: 401.25,
            method: CombineMethod::Mean,
            models: vec!["gbm".into(), "seasonal".into()],
        }];
        let mut buf = Vec::new();
        write_ensemble_csv(&rows, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "date,ticker,forecast_close,method\n2024-07-03,MSFT,401.250000,mean\n"
        );
    }

    #[test]
    fn paths_use_safe_ticker() {
        let config = PipelineConfig::with_base_dir("/x");
        assert_eq!(
            forecast_path(&config, "^GSPC", "gbm", 5),
            PathBuf::from("/x/results/_GSPC_gbm_5d.csv")
        );
        assert_eq!(
            ensemble_path(&config, "AAPL", 10),
            PathBuf::from("/x/results/AAPL_ensemble_10d.csv")
        );
        assert_eq!(
            eval_path(&config, "AAPL"),
            PathBuf::from("/x/results/AAPL_eval_results.json")
        );
    }
}
