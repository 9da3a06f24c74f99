mod fallback;
mod file;
mod point;
mod provider;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use itertools::Itertools;

pub use self::{
    fallback::TariffPrices,
    file::{ConstantClimate, ForecastFile},
    point::{HourlyForecastPoint, PricePoint, Timestamped, WeatherPoint},
    provider::{PriceForecastProvider, WeatherForecastProvider},
};
use crate::{
    error::PlanError,
    ops::{Interval, truncate_to_hour},
    prelude::*,
    quantity::{cost::Cost, power::Kilowatts, rate::KilowattHourRate, time::Hours},
    tariff::TariffTable,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum ForecastSeries {
    #[display("price")]
    Price,

    #[display("weather")]
    Weather,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ForecastGap {
    #[error("no point for the hour starting at {0}")]
    Missing(NaiveDateTime),

    #[error("point at {0} is not aligned to the hour")]
    Misaligned(NaiveDateTime),

    #[error("more than one point at {0}")]
    Duplicate(NaiveDateTime),
}

/// Longest supported planning window: one week.
pub const MAX_HORIZON_HOURS: u32 = 7 * 24;

/// Planning window: `horizon_hours` hours starting at midnight of `date`.
///
/// Dates are limited to the years 1 to 9999, so that stages and baseline runs spilling
/// past the horizon end stay representable.
pub fn horizon_of(date: NaiveDate, horizon_hours: u32) -> Result<Interval, PlanError> {
    let invalid = || PlanError::InvalidHorizon { date, horizon_hours };
    if !(1..=MAX_HORIZON_HOURS).contains(&horizon_hours) || !(1..=9999).contains(&date.year()) {
        return Err(invalid());
    }
    let start = date.and_time(NaiveTime::MIN);
    let end = start.checked_add_signed(TimeDelta::hours(horizon_hours.into())).ok_or_else(invalid)?;
    Ok(Interval::new(start, end))
}

/// Complete hourly forecast over the planning horizon.
#[derive(Clone, Debug)]
pub struct Forecast {
    horizon: Interval,
    points: Vec<HourlyForecastPoint>,
}

impl Forecast {
    /// Join the price and weather series, requiring exactly one point per horizon hour in each.
    ///
    /// Points outside the horizon are ignored.
    #[instrument(skip_all, fields(start = %horizon.start, end = %horizon.end))]
    pub fn try_assemble(
        horizon: Interval,
        prices: Vec<PricePoint>,
        weather: Vec<WeatherPoint>,
        tariff: &TariffTable,
    ) -> Result<Self, PlanError> {
        let prices = complete_series(ForecastSeries::Price, horizon, prices)?;
        let weather = complete_series(ForecastSeries::Weather, horizon, weather)?;
        let points = prices
            .into_iter()
            .zip(weather)
            .map(|(price, weather)| HourlyForecastPoint {
                time: price.time,
                price: price.price,
                lower: price.lower,
                upper: price.upper,
                tariff_period: tariff.classify(price.time),
                temperature: weather.temperature,
                humidity: weather.humidity,
            })
            .collect_vec();
        debug!(n_points = points.len(), "assembled");
        Ok(Self { horizon, points })
    }

    pub const fn horizon(&self) -> Interval {
        self.horizon
    }

    pub fn points(&self) -> &[HourlyForecastPoint] {
        &self.points
    }

    pub fn hour_starts(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.points.iter().map(|point| point.time)
    }

    pub fn at(&self, hour_start: NaiveDateTime) -> Option<&HourlyForecastPoint> {
        if !self.horizon.contains(hour_start) {
            return None;
        }
        let index = usize::try_from((hour_start - self.horizon.start).num_hours()).ok()?;
        self.points.get(index).filter(|point| point.time == hour_start)
    }

    /// Look the hour up, shifting it by whole days until it lands within the horizon.
    pub fn wrapped(&self, hour_start: NaiveDateTime) -> Option<&HourlyForecastPoint> {
        let mut time = hour_start;
        while time >= self.horizon.end {
            time -= TimeDelta::days(1);
        }
        while time < self.horizon.start {
            time += TimeDelta::days(1);
        }
        self.at(time)
    }

    /// Cost of drawing `power` over the interval, prorated per hour.
    ///
    /// Hours without a price make the cost NaN.
    pub fn cost_of(&self, power: Kilowatts, interval: Interval) -> Cost {
        self.priced_cost(power, interval, |hour_start| self.at(hour_start))
    }

    /// Same as [`Forecast::cost_of`], but hours outside the horizon take the price of the same hour on a covered day.
    pub fn wrapped_cost_of(&self, power: Kilowatts, interval: Interval) -> Cost {
        self.priced_cost(power, interval, |hour_start| self.wrapped(hour_start))
    }

    fn priced_cost<'a>(
        &'a self,
        power: Kilowatts,
        interval: Interval,
        lookup: impl Fn(NaiveDateTime) -> Option<&'a HourlyForecastPoint>,
    ) -> Cost {
        interval
            .split_hourly()
            .map(|(hour_start, part)| {
                let price = lookup(hour_start).map_or(KilowattHourRate(f64::NAN), |point| point.price);
                power * Hours::from(part.len()) * price
            })
            .sum()
    }
}

fn complete_series<P: Timestamped>(
    series: ForecastSeries,
    horizon: Interval,
    points: Vec<P>,
) -> Result<Vec<P>, PlanError> {
    let incomplete = |gap| PlanError::IncompleteForecast { series, gap };

    let mut points =
        points.into_iter().filter(|point| horizon.contains(point.time())).collect_vec();
    points.sort_by_key(P::time);

    if let Some(point) = points.iter().find(|point| truncate_to_hour(point.time()) != point.time())
    {
        return Err(incomplete(ForecastGap::Misaligned(point.time())));
    }
    if let Some((point, _)) = points.iter().tuple_windows().find(|(lhs, rhs)| lhs.time() == rhs.time())
    {
        return Err(incomplete(ForecastGap::Duplicate(point.time())));
    }
    for (index, (expected, _)) in horizon.split_hourly().enumerate() {
        if points.get(index).map(P::time) != Some(expected) {
            return Err(incomplete(ForecastGap::Missing(expected)));
        }
    }
    Ok(points)
}
