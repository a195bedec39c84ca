//! Domain types: price history, forecast rows, trading calendar.

pub mod bar;
pub mod calendar;
pub mod forecast;

pub use bar::{Bar, PriceSeries};
pub use calendar::{HolidayRule, TradingCalendar};
pub use forecast::{CombineMethod, EnsembleRow, ForecastRow};

/// Filesystem-safe form of a ticker: anything outside `[A-Za-z0-9_-]`
/// becomes `_` (so `^GSPC` is stored as `_GSPC`).
pub fn safe_ticker(ticker: &str) -> String {
    ticker
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_ticker_replaces_symbols() {
        assert_eq!(safe_ticker("^GSPC"), "_GSPC");
        assert_eq!(safe_ticker("BRK.B"), "BRK_B");
        assert_eq!(safe_ticker("AAPL"), "AAPL");
        assert_eq!(safe_ticker("EUR-USD"), "EUR-USD");
    }
}
