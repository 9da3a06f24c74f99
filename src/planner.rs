mod baseline;
mod plan;
mod sanitize;
mod timeline;

use std::time::Instant;

use bon::Builder;
use chrono::{NaiveDate, TimeDelta};
use itertools::Itertools;

pub use self::{
    baseline::Baseline,
    plan::{OptimizationPlan, PriceSource, Report, Savings, Schedule},
    sanitize::{SanitizationNote, Sanitize, Sanitizer},
    timeline::TimelineEntry,
};
use crate::{
    batch::{Batch, BatchId},
    catalog::{Catalog, ClimateStatus},
    error::PlanError,
    forecast::{
        Forecast,
        PriceForecastProvider,
        TariffPrices,
        WeatherForecastProvider,
        horizon_of,
    },
    gate::FeasibilityGate,
    occupancy::MachineOccupancy,
    placer::{BatchPlacer, PlacementFailure},
    prelude::*,
    quantity::{cost::Cost, mass::Kilograms, power::Kilowatts},
    tariff::{PeriodPrices, TariffTable},
};

/// Builds daily production plans.
///
/// Holds no state between calls, and may be shared between threads.
#[derive(Builder)]
pub struct Planner<'a> {
    catalog: &'a Catalog,
    tariff: &'a TariffTable,

    /// Without a provider, prices come from the fallback prices.
    price_provider: Option<&'a dyn PriceForecastProvider>,

    weather_provider: &'a dyn WeatherForecastProvider,

    /// Static price per tariff period, used when the price forecast fails.
    fallback_prices: Option<PeriodPrices>,

    #[builder(default = 24)]
    horizon_hours: u32,

    /// Hour of day when the baseline starts its first batch.
    #[builder(default = 8)]
    baseline_start_hour: u32,

    #[builder(default = TimeDelta::minutes(15))]
    gap_step: TimeDelta,

    plant_power_limit: Option<Kilowatts>,
}

impl Planner<'_> {
    #[instrument(skip_all, name = "Planning…", fields(%date, %target, tier))]
    pub fn build_plan(
        &self,
        date: NaiveDate,
        target: Kilograms,
        tier: &str,
    ) -> Result<OptimizationPlan, PlanError> {
        let started_at = Instant::now();
        if !target.is_finite() || target < Kilograms::ZERO {
            return Err(PlanError::InvalidTarget(target));
        }
        let sequence = self.catalog.sequence(tier)?;
        let requested_batches = requested_batches(target, sequence.batch_yield);

        let mut recommendations = Vec::new();
        let (forecast, price_source) = self.assemble_forecast(date, &mut recommendations)?;

        let gate = FeasibilityGate::builder()
            .forecast(&forecast)
            .maybe_plant_power_limit(self.plant_power_limit)
            .build();
        let placer =
            BatchPlacer::builder().gate(&gate).forecast(&forecast).gap_step(self.gap_step).build();
        let mut occupancy = MachineOccupancy::default();
        let mut batches = Vec::new();
        let mut failure = None;
        let mut remaining = target;
        for id in (1..=requested_batches).map(BatchId) {
            let batch_target = remaining.min(sequence.batch_yield);
            match placer.place(id, sequence, batch_target, &mut occupancy) {
                Ok(batch) => {
                    remaining -= batch_target;
                    batches.push(batch);
                }
                Err(placement_failure) => {
                    warn!(%placement_failure, "stopping early");
                    failure = Some(placement_failure);
                    break;
                }
            }
        }

        let achieved = batches.iter().map(|batch| batch.target).sum();
        let schedule = Schedule::from(batches);
        let baseline =
            Baseline::compute(sequence, &forecast, self.baseline_start_hour, schedule.batches.len());
        let savings = Savings::between(baseline.total_cost, schedule.total_cost);
        let hourly_timeline = timeline::assemble(&forecast, &occupancy, sequence);

        if requested_batches == 0 {
            recommendations.push("The target is zero, there is nothing to produce.".to_owned());
        }
        if let Some(failure) = &failure {
            recommendations.push(self.explain_shortfall(
                failure,
                schedule.batches.len(),
                requested_batches,
                achieved,
                target,
            ));
        }
        recommendations.extend(explain_degraded_stages(&schedule.batches));

        let mut plan = OptimizationPlan {
            target_date: date,
            tier: sequence.tier.clone(),
            target,
            achieved,
            num_batches: schedule.batches.len(),
            requested_batches,
            partial: failure.is_some(),
            price_source,
            plan: schedule,
            baseline,
            savings,
            hourly_timeline,
            recommendations,
            sanitization: Vec::new(),
        };
        plan.sanitize();
        if plan.num_batches != 0 {
            let summary = if plan.is_baseline_priced() {
                self.explain_savings(plan.savings)
            } else {
                format!(
                    "The baseline starting at {:02}:00 could not be priced over the {}-hour horizon, so savings are not reported.",
                    self.baseline_start_hour, self.horizon_hours,
                )
            };
            plan.recommendations.push(summary);
        }

        info!(
            num_batches = plan.num_batches,
            total_cost = %plan.plan.total_cost,
            savings = %plan.savings.absolute,
            elapsed = ?started_at.elapsed(),
            "planned",
        );
        Ok(plan)
    }

    /// Fetch and join the forecasts, degrading to the tariff prices when the price forecast fails.
    fn assemble_forecast(
        &self,
        date: NaiveDate,
        recommendations: &mut Vec<String>,
    ) -> Result<(Forecast, PriceSource), PlanError> {
        let horizon = horizon_of(date, self.horizon_hours)?;

        let prices = match self
            .price_provider
            .map(|provider| provider.hourly_prices(date, self.horizon_hours))
        {
            Some(Ok(prices)) => Ok(prices),
            Some(Err(error)) => Err(format!("{error:#}")),
            None => Err("no price forecast provider".to_owned()),
        };
        let (prices, price_source) = match prices {
            Ok(prices) => (prices, PriceSource::Forecast),
            Err(reason) => {
                let Some(fallback_prices) = self.fallback_prices else {
                    return Err(PlanError::PriceForecastUnavailable(reason));
                };
                warn!(%reason, "falling back to the tariff prices");
                recommendations.push(format!(
                    "The price forecast is unavailable ({reason}), costs are estimated from the static tariff prices."
                ));
                let fallback = TariffPrices { tariff: self.tariff, prices: fallback_prices };
                (fallback.hourly(date, self.horizon_hours)?, PriceSource::TariffFallback)
            }
        };

        let weather = self
            .weather_provider
            .hourly_weather(date, self.horizon_hours)
            .map_err(|error| PlanError::WeatherForecastUnavailable(format!("{error:#}")))?;

        Ok((Forecast::try_assemble(horizon, prices, weather, self.tariff)?, price_source))
    }

    fn explain_shortfall(
        &self,
        failure: &PlacementFailure,
        n_placed: usize,
        requested_batches: usize,
        achieved: Kilograms,
        target: Kilograms,
    ) -> String {
        format!(
            "Only {n_placed} of {requested_batches} batches fit within the {}-hour horizon, producing {achieved} of {target}: {failure}. Blocked by {}.",
            self.horizon_hours,
            failure.kinds.iter().join(", "),
        )
    }

    fn explain_savings(&self, savings: Savings) -> String {
        let baseline_start = format!("{:02}:00", self.baseline_start_hour);
        match savings.percent {
            Some(percent) if savings.absolute > Cost::EPSILON => format!(
                "Shifting production saves {} ({percent:.1}%) against starting at {baseline_start}.",
                savings.absolute,
            ),
            None if savings.absolute > Cost::EPSILON => format!(
                "Shifting production saves {} against starting at {baseline_start}.",
                savings.absolute,
            ),
            _ => format!("No cheaper window was found than starting at {baseline_start}."),
        }
    }
}

fn explain_degraded_stages(batches: &[Batch]) -> impl Iterator<Item = String> + '_ {
    batches.iter().flat_map(|batch| {
        batch
            .stages
            .iter()
            .filter(|stage| stage.climate_status == ClimateStatus::Acceptable)
            .map(move |stage| {
                format!(
                    "Batch {} `{}` runs outside the optimal climate of `{}` from {}, expect degraded quality.",
                    batch.id,
                    stage.name,
                    stage.machine,
                    stage.start.time().format("%H:%M"),
                )
            })
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn requested_batches(target: Kilograms, batch_yield: Kilograms) -> usize {
    if target <= Kilograms::ZERO {
        return 0;
    }
    (target / batch_yield).ceil() as usize
}
