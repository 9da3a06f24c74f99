use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    catalog::{ClimateStatus, MachineId},
    ops::Interval,
    quantity::{cost::Cost, energy::KilowattHours, mass::Kilograms, power::Kilowatts},
};

/// One-based, in placement order.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    derive_more::Display,
)]
#[display("#{_0}")]
pub struct BatchId(pub usize);

#[derive(Clone, Debug, Serialize)]
pub struct ScheduledStage {
    pub name: String,
    pub machine: MachineId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,

    #[serde(rename = "power_kw")]
    pub power: Kilowatts,

    #[serde(rename = "energy_kwh")]
    pub energy: KilowattHours,

    pub cost: Cost,

    /// Worst climate status over the stage hours.
    pub climate_status: ClimateStatus,

    pub non_interruptible: bool,
}

impl ScheduledStage {
    pub const fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Committed batch: the stages never change once placed.
#[derive(Clone, Debug, Serialize)]
pub struct Batch {
    pub id: BatchId,

    pub tier: String,

    /// Mass this batch contributes towards the target.
    #[serde(rename = "target_kg")]
    pub target: Kilograms,

    pub stages: Vec<ScheduledStage>,

    #[serde(rename = "total_energy_kwh")]
    pub total_energy: KilowattHours,

    pub total_cost: Cost,
}

impl Batch {
    pub fn new(id: BatchId, tier: String, target: Kilograms, stages: Vec<ScheduledStage>) -> Self {
        let total_energy = stages.iter().map(|stage| stage.energy).sum();
        let total_cost = stages.iter().map(|stage| stage.cost).sum();
        Self { id, tier, target, stages, total_energy, total_cost }
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.stages.first().map(|stage| stage.start)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.stages.last().map(|stage| stage.end)
    }

    pub fn climate_status(&self) -> ClimateStatus {
        self.stages.iter().map(|stage| stage.climate_status).max().unwrap_or_default()
    }
}
