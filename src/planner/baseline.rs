use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::{
    catalog::ProductionSequence,
    forecast::Forecast,
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Price-agnostic reference schedule: batches start at a fixed hour, one after another.
#[derive(Clone, Debug, Serialize)]
pub struct Baseline {
    pub total_cost: Cost,

    #[serde(rename = "total_energy_kwh")]
    pub total_energy: KilowattHours,

    /// `None` when there is no energy to average over.
    #[serde(rename = "avg_price")]
    pub average_price: Option<f64>,

    pub start_times: Vec<NaiveDateTime>,
}

impl Baseline {
    /// Start batch *k* at `start_hour` plus *k* times the longest stage, rounded up to whole hours.
    ///
    /// Never touches the occupancy. Stages keep their minimum gaps, and hours past the horizon take the price of
    /// the same hour on a covered day.
    pub fn compute(
        sequence: &ProductionSequence,
        forecast: &Forecast,
        start_hour: u32,
        n_batches: usize,
    ) -> Self {
        let first_start = forecast.horizon().start + TimeDelta::hours(start_hour.into());
        let stride = sequence
            .longest_stage()
            .map_or(TimeDelta::hours(1), |stage| whole_hours_ceil(stage.duration));
        let start_times: Vec<_> = std::iter::successors(Some(first_start), |start| Some(*start + stride))
            .take(n_batches)
            .collect();

        let mut total_cost = Cost::ZERO;
        let mut total_energy = KilowattHours::ZERO;
        for start in &start_times {
            for (stage, interval) in sequence.chain_at_min_gaps(*start) {
                total_energy += stage.energy();
                total_cost += forecast.wrapped_cost_of(stage.machine.power, interval);
            }
        }

        let average_price = (total_energy > KilowattHours::ZERO).then(|| (total_cost / total_energy).0);
        Self { total_cost, total_energy, average_price, start_times }
    }
}

fn whole_hours_ceil(duration: TimeDelta) -> TimeDelta {
    let hours = duration.num_hours();
    let hours = if duration > TimeDelta::hours(hours) { hours + 1 } else { hours };
    TimeDelta::hours(hours.max(1))
}
