//! Bar and PriceSeries, the daily price history everything else consumes.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// One trading day of OHLCV data for a single ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// A bar where only the close is known. Open/high/low mirror the close and
    /// volume is zero, which is how close-only sources are normalized.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    /// Returns true if the close is missing or non-finite.
    pub fn is_void(&self) -> bool {
        !self.close.is_finite()
    }

    /// Basic OHLC sanity: high bounds everything, low is bounded by everything.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }
}

/// Ordered daily history for one ticker.
///
/// Construction sorts by date, drops bars with a non-finite close and keeps
/// the last occurrence of any duplicated date, so every consumer can rely on
/// strictly increasing dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<Bar>) -> Self {
        let mut bars: Vec<Bar> = bars.into_iter().filter(|b| !b.is_void()).collect();
        // Stable sort keeps input order within a date, so the retained
        // duplicate is the one that arrived last.
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(prev) if prev.date == bar.date => *prev = bar,
                _ => deduped.push(bar),
            }
        }
        Self {
            ticker: ticker.into(),
            bars: deduped,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// Close on an exact date, if that date is in the series.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.bars
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| self.bars[i].close)
    }

    /// Keep only bars within `days` calendar days of the last bar (inclusive).
    pub fn crop_last_days(&self, days: i64) -> PriceSeries {
        let Some(last) = self.last() else {
            return self.clone();
        };
        let cutoff = last.date - Duration::days(days);
        PriceSeries {
            ticker: self.ticker.clone(),
            bars: self
                .bars
                .iter()
                .filter(|b| b.date >= cutoff)
                .copied()
                .collect(),
        }
    }

    /// Closes resampled onto every weekday between the first and last bar,
    /// carrying the previous close forward across gaps.
    pub fn business_day_closes(&self) -> Vec<f64> {
        let (Some(first), Some(last)) = (self.first(), self.last()) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(self.bars.len());
        let mut idx = 0;
        let mut carried = first.close;
        let mut day = first.date;
        while day <= last.date {
            while idx < self.bars.len() && self.bars[idx].date <= day {
                carried = self.bars[idx].close;
                idx += 1;
            }
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                out.push(carried);
            }
            day += Duration::days(1);
        }
        out
    }

    /// BLAKE3 hash over dates and closes, for artifact provenance.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.ticker.as_bytes());
        for bar in &self.bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.close.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
