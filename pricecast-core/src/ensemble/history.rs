//! Past per-model predictions and, once known, the realized close.
//!
//! Stored as CSV: `date,<model>_pred...,actual_close`. Cells are empty where
//! a model did not forecast the date or the close has not happened yet.

use crate::data::write_atomic;
use crate::domain::{ForecastRow, PriceSeries};
use crate::error::ForecastError;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

const PRED_SUFFIX: &str = "_pred";
const ACTUAL: &str = "actual_close";

#[derive(Debug, Clone, PartialEq)]
pub struct BlendRecord {
    pub date: NaiveDate,
    pub predictions: BTreeMap<String, f64>,
    pub actual_close: Option<f64>,
}

impl BlendRecord {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            predictions: BTreeMap::new(),
            actual_close: None,
        }
    }
}

/// Date-keyed, one record per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendHistory {
    records: BTreeMap<NaiveDate, BlendRecord>,
}

impl BlendHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &BlendRecord> {
        self.records.values()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&BlendRecord> {
        self.records.get(&date)
    }

    /// Every model that appears in at least one record, sorted.
    pub fn models(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .records
            .values()
            .flat_map(|r| r.predictions.keys())
            .collect();
        names.into_iter().cloned().collect()
    }

    /// Append the current forecasts. A date already present keeps its
    /// realized close; its predictions are overwritten model by model.
    pub fn record(&mut self, forecasts: &BTreeMap<String, Vec<ForecastRow>>) {
        for (model, rows) in forecasts {
            for row in rows {
                self.records
                    .entry(row.date)
                    .or_insert_with(|| BlendRecord::new(row.date))
                    .predictions
                    .insert(model.clone(), row.forecast_close);
            }
        }
    }

    /// Fill `actual_close` from realized prices. Returns how many records
    /// gained an actual.
    pub fn reconcile(&mut self, realized: &PriceSeries) -> usize {
        let mut filled = 0;
        for record in self.records.values_mut() {
            if record.actual_close.is_some() {
                continue;
            }
            if let Some(close) = realized.close_on(record.date) {
                record.actual_close = Some(close);
                filled += 1;
            }
        }
        debug!(ticker = realized.ticker(), filled, "blend history reconciled");
        filled
    }

    /// Rows with a realized close and a prediction from every one of
    /// `models`, as `(features in model order, actual)`.
    pub fn training_set(&self, models: &[String]) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for record in self.records.values() {
            let Some(actual) = record.actual_close else {
                continue;
            };
            let row: Option<Vec<f64>> = models
                .iter()
                .map(|m| record.predictions.get(m).copied())
                .collect();
            if let Some(row) = row {
                x.push(row);
                y.push(actual);
            }
        }
        (x, y)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ForecastError> {
        let models = self.models();
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["date".to_string()];
        header.extend(models.iter().map(|m| format!("{m}{PRED_SUFFIX}")));
        header.push(ACTUAL.to_string());
        wtr.write_record(&header)?;

        let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        for record in self.records.values() {
            let mut out = vec![record.date.to_string()];
            out.extend(
                models
                    .iter()
                    .map(|m| cell(record.predictions.get(m).copied())),
            );
            out.push(cell(record.actual_close));
            wtr.write_record(&out)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self, ForecastError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let date_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("date"))
            .ok_or_else(|| ForecastError::missing("date"))?;
        let actual_idx = headers.iter().position(|h| h == ACTUAL);
        let model_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.strip_suffix(PRED_SUFFIX).map(|m| (i, m.to_string())))
            .collect();

        let mut history = Self::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            let cell = |i: usize| record.get(i).map(str::trim).unwrap_or("");
            let number = |i: usize| -> Result<Option<f64>, ForecastError> {
                match cell(i) {
                    "" => Ok(None),
                    s => s.parse::<f64>().map(Some).map_err(|e| {
                        ForecastError::InvalidInput(format!(
                            "row {}: column '{}': {e}",
                            line + 2,
                            headers[i]
                        ))
                    }),
                }
            };
            let date = NaiveDate::parse_from_str(cell(date_idx), "%Y-%m-%d").map_err(|e| {
                ForecastError::InvalidInput(format!("row {}: bad date: {e}", line + 2))
            })?;
            let mut entry = BlendRecord::new(date);
            for (i, model) in &model_cols {
                if let Some(v) = number(*i)? {
                    entry.predictions.insert(model.clone(), v);
                }
            }
            if let Some(i) = actual_idx {
                entry.actual_close = number(i)?;
            }
            history.records.insert(date, entry);
        }
        Ok(history)
    }

    /// Load from `path`; a missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        if !path.is_file() {
            return Ok(Self::new());
        }
        Self::read_csv(fs::File::open(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ForecastError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        write_atomic(path, &buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn forecasts() -> BTreeMap<String, Vec<ForecastRow>> {
        let mut m = BTreeMap::new();
        m.insert(
            "gbm".to_string(),
            vec![
                ForecastRow::point("T", day(4), 10.0),
                ForecastRow::point("T", day(5), 11.0),
            ],
        );
        m.insert(
            "seasonal".to_string(),
            vec![ForecastRow::point("T", day(5), 12.0)],
        );
        m
    }

    #[test]
    fn record_merges_models_by_date() {
        let mut h = BlendHistory::new();
        h.record(&forecasts());
        assert_eq!(h.len(), 2);
        assert_eq!(h.models(), vec!["gbm".to_string(), "seasonal".to_string()]);
        let rec = h.get(day(5)).unwrap();
        assert_eq!(rec.predictions["gbm"], 11.0);
        assert_eq!(rec.predictions["seasonal"], 12.0);
        assert!(rec.actual_close.is_none());
    }

    #[test]
    fn reconcile_and_training_set() {
        let mut h = BlendHistory::new();
        h.record(&forecasts());
        let realized = PriceSeries::new(
            "T",
            vec![Bar::from_close(day(4), 10.5), Bar::from_close(day(5), 11.5)],
        );
        assert_eq!(h.reconcile(&realized), 2);
        assert_eq!(h.reconcile(&realized), 0);

        let both = vec!["gbm".to_string(), "seasonal".to_string()];
        let (x, y) = h.training_set(&both);
        assert_eq!(x, vec![vec![11.0, 12.0]]);
        assert_eq!(y, vec![11.5]);

        let (x, y) = h.training_set(&["gbm".to_string()]);
        assert_eq!(x.len(), 2);
        assert_eq!(y, vec![10.5, 11.5]);
    }

    #[test]
    fn csv_layout_and_reload() {
        let mut h = BlendHistory::new();
        h.record(&forecasts());
        let mut buf = Vec::new();
        h.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,gbm_pred,seasonal_pred,actual_close"));
        assert_eq!(lines.next(), Some("2024-03-04,10,,"));
        assert_eq!(BlendHistory::read_csv(buf.as_slice()).unwrap(), h);
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        assert!(BlendHistory::load(&path).unwrap().is_empty());

        let mut h = BlendHistory::new();
        h.record(&forecasts());
        h.save(&path).unwrap();
        assert_eq!(BlendHistory::load(&path).unwrap(), h);
    }
}
