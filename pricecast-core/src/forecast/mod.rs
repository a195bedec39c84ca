//! Forecasters turn a trained model plus a seed history into dated rows.
//!
//! - [`RecursiveForecaster`] drives a one-step [`Predictor`](crate::models::Predictor)
//!   across the horizon, feeding each prediction back in.
//! - [`DirectForecaster`] asks a [`HorizonModel`](crate::models::HorizonModel)
//!   for the whole horizon at once.
//! - [`PatternAdjuster`] optionally rescales a finished forecast by what
//!   followed similar return patterns in the past.

pub mod direct;
pub mod pattern;
pub mod recursive;

pub use direct::DirectForecaster;
pub use pattern::PatternAdjuster;
pub use recursive::RecursiveForecaster;
