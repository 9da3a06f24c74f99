use chrono::NaiveDate;

use crate::{
    forecast::point::{PricePoint, WeatherPoint},
    prelude::*,
};

/// Source of hourly prices for the horizon starting at midnight of `date`.
///
/// Failing here is not fatal: the planner falls back to the static tariff prices when it can.
pub trait PriceForecastProvider: Sync {
    fn hourly_prices(&self, date: NaiveDate, horizon_hours: u32) -> Result<Vec<PricePoint>>;
}

pub trait WeatherForecastProvider: Sync {
    fn hourly_weather(&self, date: NaiveDate, horizon_hours: u32) -> Result<Vec<WeatherPoint>>;
}
