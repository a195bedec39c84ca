//! FeatureTable: date-indexed feature columns plus the close target.

use crate::error::ForecastError;
use chrono::NaiveDate;
use std::io::{Read, Write};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<f64>,
}

impl FeatureColumn {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Column-oriented feature table. Every column has one value per date.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    dates: Vec<NaiveDate>,
    close: Vec<f64>,
    columns: Vec<FeatureColumn>,
}

impl FeatureTable {
    pub(crate) fn from_parts(
        dates: Vec<NaiveDate>,
        close: Vec<f64>,
        columns: Vec<FeatureColumn>,
    ) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == dates.len()));
        debug_assert_eq!(close.len(), dates.len());
        Self {
            dates,
            close,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The target column.
    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Result<&[f64], ForecastError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| ForecastError::missing(name))
    }

    /// Feature vector at `idx`, ordered as `names`.
    pub fn row(&self, idx: usize, names: &[String]) -> Result<Vec<f64>, ForecastError> {
        if idx >= self.len() {
            return Err(ForecastError::InsufficientHistory {
                required: idx + 1,
                available: self.len(),
            });
        }
        names
            .iter()
            .map(|name| self.column(name).map(|values| values[idx]))
            .collect()
    }

    pub fn last_row(&self, names: &[String]) -> Result<Vec<f64>, ForecastError> {
        match self.len() {
            0 => Err(ForecastError::InsufficientHistory {
                required: 1,
                available: 0,
            }),
            n => self.row(n - 1, names),
        }
    }

    /// Row-major matrix of the named columns.
    pub fn matrix(&self, names: &[String]) -> Result<Vec<Vec<f64>>, ForecastError> {
        let cols: Vec<&[f64]> = names
            .iter()
            .map(|n| self.column(n))
            .collect::<Result<_, _>>()?;
        Ok((0..self.len())
            .map(|i| cols.iter().map(|c| c[i]).collect())
            .collect())
    }

    pub fn slice(&self, start: usize, end: usize) -> FeatureTable {
        let end = end.min(self.len());
        let start = start.min(end);
        FeatureTable {
            dates: self.dates[start..end].to_vec(),
            close: self.close[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| FeatureColumn::new(c.name.clone(), c.values[start..end].to_vec()))
                .collect(),
        }
    }

    /// Chronological train/eval split. The training part always keeps at
    /// least one row when the table is non-empty.
    pub fn chronological_split(&self, train_fraction: f64) -> (FeatureTable, FeatureTable) {
        let n = self.len();
        let cut = ((n as f64 * train_fraction).floor() as usize).max(1).min(n);
        (self.slice(0, cut), self.slice(cut, n))
    }

    /// BLAKE3 over dates, target and every column, for artifact provenance.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for d in &self.dates {
            hasher.update(d.to_string().as_bytes());
        }
        for v in &self.close {
            hasher.update(&v.to_le_bytes());
        }
        for col in &self.columns {
            hasher.update(col.name.as_bytes());
            for v in &col.values {
                hasher.update(&v.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Write as CSV with header `date,close,<features...>`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ForecastError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["date".to_string(), "close".to_string()];
        header.extend(self.feature_names());
        wtr.write_record(&header)?;
        for i in 0..self.len() {
            let mut record = Vec::with_capacity(header.len());
            record.push(self.dates[i].to_string());
            record.push(self.close[i].to_string());
            record.extend(self.columns.iter().map(|c| c.values[i].to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read a table written by [`write_csv`](Self::write_csv).
    pub fn read_csv<R: Read>(reader: R) -> Result<FeatureTable, ForecastError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let date_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("date"))
            .ok_or_else(|| ForecastError::missing("date"))?;
        let close_idx = headers
            .iter()
            .position(|h| h == "close")
            .ok_or_else(|| ForecastError::missing("close"))?;
        let feature_idx: Vec<usize> = (0..headers.len())
            .filter(|&i| i != date_idx && i != close_idx)
            .collect();

        let mut dates = Vec::new();
        let mut close = Vec::new();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); feature_idx.len()];
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            let cell = |i: usize| record.get(i).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(cell(date_idx), "%Y-%m-%d").map_err(|e| {
                ForecastError::InvalidInput(format!("row {}: bad date: {e}", line + 2))
            })?;
            let number = |i: usize| {
                cell(i).parse::<f64>().map_err(|e| {
                    ForecastError::InvalidInput(format!(
                        "row {}: column '{}': {e}",
                        line + 2,
                        headers[i]
                    ))
                })
            };
            dates.push(date);
            close.push(number(close_idx)?);
            for (slot, &i) in values.iter_mut().zip(&feature_idx) {
                slot.push(number(i)?);
            }
        }

        let columns = feature_idx
            .iter()
            .zip(values)
            .map(|(&i, v)| FeatureColumn::new(headers[i].clone(), v))
            .collect();
        Ok(FeatureTable::from_parts(dates, close, columns))
    }
}
