//! Lookback periods such as `30d`, `6mo`, `2y` or `max`.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::provider::DataError;

/// How much history to keep, measured in calendar days back from the most
/// recent bar. Months count as 30 days and years as 365.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LookbackPeriod {
    Days(u32),
    Months(u32),
    Years(u32),
    Max,
}

impl LookbackPeriod {
    /// Calendar days covered. `Max` is fifty years.
    pub fn days(&self) -> i64 {
        match *self {
            LookbackPeriod::Days(n) => i64::from(n),
            LookbackPeriod::Months(n) => 30 * i64::from(n),
            LookbackPeriod::Years(n) => 365 * i64::from(n),
            LookbackPeriod::Max => 365 * 50,
        }
    }

    pub fn start_date(&self, end: NaiveDate) -> NaiveDate {
        end - Duration::days(self.days())
    }
}

impl Default for LookbackPeriod {
    fn default() -> Self {
        LookbackPeriod::Years(1)
    }
}

impl FromStr for LookbackPeriod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        if raw == "max" {
            return Ok(LookbackPeriod::Max);
        }
        let digits_end = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        let (num, unit) = raw.split_at(digits_end);
        let n: u32 = num
            .parse()
            .map_err(|_| DataError::InvalidPeriod(s.to_string()))?;
        match unit {
            "" | "d" => Ok(LookbackPeriod::Days(n)),
            "mo" => Ok(LookbackPeriod::Months(n)),
            "y" => Ok(LookbackPeriod::Years(n)),
            _ => Err(DataError::InvalidPeriod(s.to_string())),
        }
    }
}

impl fmt::Display for LookbackPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookbackPeriod::Days(n) => write!(f, "{n}d"),
            LookbackPeriod::Months(n) => write!(f, "{n}mo"),
            LookbackPeriod::Years(n) => write!(f, "{n}y"),
            LookbackPeriod::Max => f.write_str("max"),
        }
    }
}

impl TryFrom<String> for LookbackPeriod {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LookbackPeriod> for String {
    fn from(p: LookbackPeriod) -> Self {
        p.to_string()
    }
}
