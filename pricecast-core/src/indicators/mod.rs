//! Close-price indicators used as model features.
//!
//! Every indicator returns exactly one value per input close and never emits
//! NaN: early rows are filled from a partial window or a seeded recursion
//! instead of being dropped, so a feature table is always as long as the
//! price history it was computed from.

pub mod ema;
pub mod returns;
pub mod rsi;
pub mod sma;

pub use ema::Ema;
pub use returns::PctReturn;
pub use rsi::Rsi;
pub use sma::Sma;

/// A named transformation of a close-price series.
pub trait Indicator: Send + Sync {
    /// Column name in the feature table (e.g. `ema_5`).
    fn name(&self) -> &str;

    /// Rows needed before the value stops depending on fill rules.
    fn warmup(&self) -> usize;

    /// One value per close, same length as the input.
    fn compute(&self, closes: &[f64]) -> Vec<f64>;
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
