use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_with::{PickFirst, TimestampSeconds, serde_as};

use crate::{
    quantity::{
        climate::{Celsius, Percent},
        rate::KilowattHourRate,
    },
    tariff::TariffPeriod,
};

pub trait Timestamped {
    fn time(&self) -> NaiveDateTime;
}

/// Hourly price, optionally with its confidence bounds.
#[serde_as]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Start of the hour, plant-local. Unix timestamps are accepted too.
    #[serde_as(as = "PickFirst<(_, TimestampSeconds<i64>)>")]
    pub time: NaiveDateTime,

    #[serde(rename = "price_eur_kwh")]
    pub price: KilowattHourRate,

    #[serde(default, rename = "lower_eur_kwh")]
    pub lower: Option<KilowattHourRate>,

    #[serde(default, rename = "upper_eur_kwh")]
    pub upper: Option<KilowattHourRate>,
}

impl Timestamped for PricePoint {
    fn time(&self) -> NaiveDateTime {
        self.time
    }
}

#[serde_as]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherPoint {
    #[serde_as(as = "PickFirst<(_, TimestampSeconds<i64>)>")]
    pub time: NaiveDateTime,

    #[serde(rename = "temperature_c")]
    pub temperature: Celsius,

    #[serde(rename = "humidity_pct")]
    pub humidity: Percent,
}

impl Timestamped for WeatherPoint {
    fn time(&self) -> NaiveDateTime {
        self.time
    }
}

/// Price, tariff, and climate of a single horizon hour.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HourlyForecastPoint {
    pub time: NaiveDateTime,
    pub price: KilowattHourRate,
    pub lower: Option<KilowattHourRate>,
    pub upper: Option<KilowattHourRate>,
    pub tariff_period: TariffPeriod,
    pub temperature: Celsius,
    pub humidity: Percent,
}
