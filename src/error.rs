use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    catalog::MachineId,
    forecast::{ForecastGap, ForecastSeries},
    quantity::mass::Kilograms,
};

/// Hard failures of a planning call: no plan is returned.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unknown quality tier `{0}`")]
    UnknownTier(String),

    #[error("unknown machine `{0}`")]
    UnknownMachine(MachineId),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid tariff table: {0}")]
    InvalidTariff(String),

    #[error("incomplete {series} forecast: {gap}")]
    IncompleteForecast { series: ForecastSeries, gap: ForecastGap },

    #[error("price forecast is unavailable and no fallback prices are configured: {0}")]
    PriceForecastUnavailable(String),

    #[error("weather forecast is unavailable: {0}")]
    WeatherForecastUnavailable(String),

    #[error(
        "a {horizon_hours}-hour horizon from {date} is out of range, it must span 1 to {max} hours within the years 1 to 9999",
        max = crate::forecast::MAX_HORIZON_HOURS
    )]
    InvalidHorizon { date: NaiveDate, horizon_hours: u32 },

    #[error("target must be a finite non-negative quantity, got {0}")]
    InvalidTarget(Kilograms),
}
