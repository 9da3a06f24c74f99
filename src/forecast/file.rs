use std::{fs, path::Path};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    forecast::{
        horizon_of,
        point::{PricePoint, Timestamped, WeatherPoint},
        provider::{PriceForecastProvider, WeatherForecastProvider},
    },
    prelude::*,
    quantity::climate::{Celsius, Percent},
};

/// Forecast exported by an external forecaster, either TOML or JSON.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForecastFile {
    #[serde(default)]
    pub prices: Vec<PricePoint>,

    #[serde(default)]
    pub weather: Vec<WeatherPoint>,
}

impl ForecastFile {
    #[instrument(skip_all, fields(path = %path.display()), name = "Reading forecast…")]
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents =
            fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
        let file: Self = if path.extension().is_some_and(|extension| extension == "json") {
            serde_json::from_slice(&contents)
                .with_context(|| format!("failed to parse `{}`", path.display()))?
        } else {
            toml::from_slice(&contents)
                .with_context(|| format!("failed to parse `{}`", path.display()))?
        };
        info!(n_prices = file.prices.len(), n_weather = file.weather.len(), "loaded");
        Ok(file)
    }
}

fn within_horizon<P: Timestamped + Copy>(
    points: &[P],
    date: NaiveDate,
    horizon_hours: u32,
) -> Result<Vec<P>> {
    let horizon = horizon_of(date, horizon_hours)?;
    Ok(points.iter().copied().filter(|point| horizon.contains(point.time())).collect())
}

impl PriceForecastProvider for ForecastFile {
    fn hourly_prices(&self, date: NaiveDate, horizon_hours: u32) -> Result<Vec<PricePoint>> {
        let prices = within_horizon(&self.prices, date, horizon_hours)?;
        ensure!(!prices.is_empty(), "the forecast file has no prices for {date}");
        Ok(prices)
    }
}

impl WeatherForecastProvider for ForecastFile {
    fn hourly_weather(&self, date: NaiveDate, horizon_hours: u32) -> Result<Vec<WeatherPoint>> {
        let weather = within_horizon(&self.weather, date, horizon_hours)?;
        ensure!(!weather.is_empty(), "the forecast file has no weather for {date}");
        Ok(weather)
    }
}

/// Same indoor climate for every hour, for plants with climate control.
#[derive(Copy, Clone, Debug)]
pub struct ConstantClimate {
    pub temperature: Celsius,
    pub humidity: Percent,
}

impl WeatherForecastProvider for ConstantClimate {
    fn hourly_weather(&self, date: NaiveDate, horizon_hours: u32) -> Result<Vec<WeatherPoint>> {
        Ok(horizon_of(date, horizon_hours)?
            .split_hourly()
            .map(|(time, _)| WeatherPoint {
                time,
                temperature: self.temperature,
                humidity: self.humidity,
            })
            .collect())
    }
}
