//! Fixtures shared by the unit tests.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::{
    catalog::Catalog,
    config::Config,
    forecast::{ConstantClimate, Forecast, PricePoint, WeatherForecastProvider, horizon_of},
    ops::Interval,
    quantity::{
        climate::{Celsius, Percent},
        rate::KilowattHourRate,
    },
    tariff::TariffTable,
};

/// Monday.
pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    date().and_hms_opt(hour, minute, 0).unwrap()
}

pub fn horizon() -> Interval {
    horizon_of(date(), 24).unwrap()
}

pub fn config() -> Config {
    Config::builtin().unwrap()
}

pub fn catalog() -> Catalog {
    config().catalog().unwrap()
}

pub fn tariff() -> TariffTable {
    config().tariff_table().unwrap()
}

/// Hourly prices over the test date, by hour of day.
pub fn prices(price_at: impl Fn(i64) -> f64) -> Vec<PricePoint> {
    (0..24)
        .map(|hour| PricePoint {
            time: at(0, 0) + TimeDelta::hours(hour),
            price: KilowattHourRate(price_at(hour)),
            lower: None,
            upper: None,
        })
        .collect()
}

pub fn flat_prices(price: f64) -> Vec<PricePoint> {
    prices(|_| price)
}

/// Optimal for every machine in the built-in catalog.
pub const fn comfortable_climate() -> ConstantClimate {
    ConstantClimate { temperature: Celsius(20.0), humidity: Percent(45.0) }
}

pub fn forecast(prices: Vec<PricePoint>) -> Forecast {
    let weather = comfortable_climate().hourly_weather(date(), 24).unwrap();
    Forecast::try_assemble(horizon(), prices, weather, &tariff()).unwrap()
}
