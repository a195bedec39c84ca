//! Trading-day calendar used to date forecast steps.
//!
//! Weekends are never trading days. With [`HolidayRule::UsFederal`] the
//! observed US federal holidays are skipped as well (Saturday holidays are
//! observed on the preceding Friday, Sunday holidays on the following Monday).

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayRule {
    /// Weekdays only.
    #[default]
    WeekdaysOnly,
    /// Weekdays minus observed US federal holidays.
    UsFederal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TradingCalendar {
    pub holidays: HolidayRule,
}

impl TradingCalendar {
    pub fn new(holidays: HolidayRule) -> Self {
        Self { holidays }
    }

    pub fn weekdays() -> Self {
        Self::new(HolidayRule::WeekdaysOnly)
    }

    pub fn us_federal() -> Self {
        Self::new(HolidayRule::UsFederal)
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        match self.holidays {
            HolidayRule::WeekdaysOnly => true,
            HolidayRule::UsFederal => !is_us_federal_holiday(date),
        }
    }

    /// First trading day strictly after `date`.
    pub fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date + Duration::days(1);
        while !self.is_trading_day(day) {
            day += Duration::days(1);
        }
        day
    }

    /// The `n` trading days strictly after `date`, in order.
    pub fn next_trading_days(&self, date: NaiveDate, n: usize) -> Vec<NaiveDate> {
        let mut out = Vec::with_capacity(n);
        let mut day = date;
        for _ in 0..n {
            day = self.next_trading_day(day);
            out.push(day);
        }
        out
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// `nth` (1-based) occurrence of `weekday` in a month.
fn nth_weekday(year: i32, month: u32, weekday: Weekday, nth: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, nth as u8)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_next = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    let mut day = first_next - Duration::days(1);
    while day.weekday() != weekday {
        day -= Duration::days(1);
    }
    Some(day)
}

fn us_federal_holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = vec![
        ymd(year, 1, 1).map(observed),
        nth_weekday(year, 1, Weekday::Mon, 3),
        nth_weekday(year, 2, Weekday::Mon, 3),
        last_weekday(year, 5, Weekday::Mon),
        ymd(year, 7, 4).map(observed),
        nth_weekday(year, 9, Weekday::Mon, 1),
        nth_weekday(year, 10, Weekday::Mon, 2),
        ymd(year, 11, 11).map(observed),
        nth_weekday(year, 11, Weekday::Thu, 4),
        ymd(year, 12, 25).map(observed),
    ];
    if year >= 2021 {
        days.push(ymd(year, 6, 19).map(observed));
    }
    days.into_iter().flatten().collect()
}

/// Observed US federal holiday check. Next year's list is consulted too,
/// since a Saturday New Year's Day is observed on December 31st.
pub fn is_us_federal_holiday(date: NaiveDate) -> bool {
    let year = date.year();
    us_federal_holidays(year).contains(&date) || us_federal_holidays(year + 1).contains(&date)
}
