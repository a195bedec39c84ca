//! Direct multi-step forecasting: one model call emits the whole horizon.

use crate::domain::{ForecastRow, PriceSeries, TradingCalendar};
use crate::error::ForecastError;
use crate::models::{HorizonForecast, HorizonModel, SeasonalModel, SeasonalParams};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct DirectForecaster {
    calendar: TradingCalendar,
    seasonal: SeasonalParams,
}

impl DirectForecaster {
    pub fn new(calendar: TradingCalendar, seasonal: SeasonalParams) -> Self {
        Self { calendar, seasonal }
    }

    /// Fit the seasonal model on the full close history (reindexed onto
    /// business days) and forecast `horizon` steps with 95% bounds.
    pub fn forecast_seasonal(
        &self,
        series: &PriceSeries,
        horizon: usize,
    ) -> Result<Vec<ForecastRow>, ForecastError> {
        let closes = series.business_day_closes();
        let model = SeasonalModel::fit(&closes, self.seasonal.clone())?;
        if !model.seasonal {
            debug!(
                ticker = series.ticker(),
                observations = closes.len(),
                period = self.seasonal.period,
                "history too short for the seasonal term"
            );
        }
        let forecast = model.forecast(&closes, horizon)?;
        self.rows(series, forecast)
    }

    /// Forecast with an already fitted horizon model.
    pub fn forecast_with<M: HorizonModel + ?Sized>(
        &self,
        model: &M,
        series: &PriceSeries,
        horizon: usize,
    ) -> Result<Vec<ForecastRow>, ForecastError> {
        let forecast = model.forecast_horizon(series, horizon)?;
        if forecast.len() != horizon {
            warn!(
                model = model.name(),
                expected = horizon,
                got = forecast.len(),
                "horizon model returned a different number of steps"
            );
        }
        self.rows(series, forecast)
    }

    fn rows(
        &self,
        series: &PriceSeries,
        forecast: HorizonForecast,
    ) -> Result<Vec<ForecastRow>, ForecastError> {
        let Some(last) = series.last() else {
            return Err(ForecastError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        };
        if forecast.mean.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ConvergenceError(
                "direct forecast is not finite".into(),
            ));
        }
        let dates = self.calendar.next_trading_days(last.date, forecast.len());
        let bounds = forecast.lower.as_deref().zip(forecast.upper.as_deref());
        Ok(dates
            .into_iter()
            .zip(&forecast.mean)
            .enumerate()
            .map(|(i, (date, &mean))| {
                let row = ForecastRow::point(series.ticker(), date, mean);
                match bounds {
                    Some((lo, hi)) => row.with_interval(lo[i], hi[i]),
                    None => row,
                }
            })
            .collect())
    }
}
