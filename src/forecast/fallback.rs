use chrono::NaiveDate;

use crate::{
    error::PlanError,
    forecast::{horizon_of, point::PricePoint, provider::PriceForecastProvider},
    prelude::*,
    tariff::{PeriodPrices, TariffTable},
};

/// Prices derived from the tariff period of each hour.
#[derive(Copy, Clone, Debug)]
pub struct TariffPrices<'a> {
    pub tariff: &'a TariffTable,
    pub prices: PeriodPrices,
}

impl TariffPrices<'_> {
    pub fn hourly(&self, date: NaiveDate, horizon_hours: u32) -> Result<Vec<PricePoint>, PlanError> {
        Ok(horizon_of(date, horizon_hours)?
            .split_hourly()
            .map(|(time, _)| PricePoint {
                time,
                price: self.prices.get(self.tariff.classify(time)),
                lower: None,
                upper: None,
            })
            .collect())
    }
}

impl PriceForecastProvider for TariffPrices<'_> {
    fn hourly_prices(&self, date: NaiveDate, horizon_hours: u32) -> Result<Vec<PricePoint>> {
        Ok(self.hourly(date, horizon_hours)?)
    }
}
