use chrono::{NaiveDateTime, TimeDelta};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    batch::BatchId,
    catalog::{ClimateStatus, ProductionSequence},
    forecast::Forecast,
    gate::FeasibilityGate,
    occupancy::MachineOccupancy,
    ops::Interval,
    tariff::TariffPeriod,
};

#[derive(Clone, Debug, Serialize)]
pub struct TimelineEntry {
    pub time: NaiveDateTime,

    #[serde(rename = "price_eur_kwh")]
    pub price: Option<f64>,

    pub tariff_period: TariffPeriod,
    pub tariff_color: &'static str,

    /// Stages running within the hour, joined with `+`.
    pub active_process: Option<String>,

    /// Lowest batch running within the hour.
    pub active_batch: Option<BatchId>,

    /// Worst status among the running machines, or among all sequence machines when idle.
    pub climate_status: ClimateStatus,

    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub is_production_hour: bool,
}

pub fn assemble(
    forecast: &Forecast,
    occupancy: &MachineOccupancy,
    sequence: &ProductionSequence,
) -> Vec<TimelineEntry> {
    forecast
        .points()
        .iter()
        .map(|point| {
            let active = occupancy.overlapping(Interval::new(point.time, point.time + TimeDelta::hours(1)));
            let machines = if active.is_empty() {
                sequence.stages.iter().map(|stage| &stage.machine).collect_vec()
            } else {
                active
                    .iter()
                    .filter_map(|(id, _)| {
                        sequence.stages.iter().map(|stage| &stage.machine).find(|machine| machine.id == **id)
                    })
                    .collect_vec()
            };
            let climate_status = machines
                .into_iter()
                .map(|machine| FeasibilityGate::hourly_climate(machine, point))
                .max()
                .unwrap_or_default();
            let active_process = (!active.is_empty())
                .then(|| active.iter().map(|(_, occupation)| occupation.stage.as_str()).unique().join(" + "));
            TimelineEntry {
                time: point.time,
                price: Some(point.price.0),
                tariff_period: point.tariff_period,
                tariff_color: point.tariff_period.hex_color(),
                active_process,
                active_batch: active.iter().map(|(_, occupation)| occupation.batch).min(),
                climate_status,
                temperature: Some(point.temperature.0),
                humidity: Some(point.humidity.0),
                is_production_hour: !active.is_empty(),
            }
        })
        .collect()
}
