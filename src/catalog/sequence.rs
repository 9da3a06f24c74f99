use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Deserialize;

use crate::{
    catalog::machine::{MachineId, MachineSpec},
    error::PlanError,
    ops::{Interval, RangeInclusive},
    quantity::{energy::KilowattHours, mass::Kilograms, time::Hours},
};

#[derive(Clone, Debug, Deserialize)]
pub struct SequenceConfig {
    pub tier: String,
    pub stages: Vec<StageConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StageConfig {
    pub name: String,

    pub machine: MachineId,

    /// Overrides the machine's nominal duration.
    #[serde(default)]
    pub duration_minutes: Option<u32>,

    /// Minimum wait before the next stage.
    #[serde(default)]
    pub min_gap_minutes: u32,

    /// Maximum wait before the next stage.
    #[serde(default)]
    pub max_gap_minutes: u32,

    #[serde(default)]
    pub non_interruptible: Option<bool>,
}

/// Stage of a production sequence with its machine resolved.
#[derive(Clone, Debug)]
pub struct StageTemplate {
    pub name: String,
    pub machine: MachineSpec,
    pub duration: TimeDelta,

    /// Allowed wait between the end of this stage and the start of the next one.
    pub gap: RangeInclusive<TimeDelta>,

    /// While running, the stage may not share its machine, nor be pushed over the plant power limit.
    pub non_interruptible: bool,
}

impl StageTemplate {
    pub fn energy(&self) -> KilowattHours {
        self.machine.power * Hours::from(self.duration)
    }

    pub fn interval_from(&self, start: NaiveDateTime) -> Interval {
        Interval::new(start, start + self.duration)
    }
}

#[derive(Clone, Debug)]
pub struct ProductionSequence {
    pub tier: String,
    pub stages: Vec<StageTemplate>,

    /// Smallest capacity among the stage machines.
    pub batch_yield: Kilograms,
}

impl ProductionSequence {
    pub(super) fn try_resolve(
        config: &SequenceConfig,
        machines: &BTreeMap<MachineId, MachineSpec>,
    ) -> Result<Self, PlanError> {
        if config.stages.is_empty() {
            return Err(PlanError::InvalidCatalog(format!("tier `{}` has no stages", config.tier)));
        }

        let mut stages = Vec::with_capacity(config.stages.len());
        for stage in &config.stages {
            let machine = machines
                .get(&stage.machine)
                .ok_or_else(|| PlanError::UnknownMachine(stage.machine.clone()))?;
            if stage.min_gap_minutes > stage.max_gap_minutes {
                return Err(PlanError::InvalidCatalog(format!(
                    "tier `{}`, stage `{}`: minimum gap exceeds the maximum",
                    config.tier, stage.name,
                )));
            }
            stages.push(StageTemplate {
                name: stage.name.clone(),
                machine: machine.clone(),
                duration: TimeDelta::minutes(
                    stage.duration_minutes.unwrap_or(machine.nominal_duration_minutes).into(),
                ),
                gap: RangeInclusive {
                    min: TimeDelta::minutes(stage.min_gap_minutes.into()),
                    max: TimeDelta::minutes(stage.max_gap_minutes.into()),
                },
                non_interruptible: stage.non_interruptible.unwrap_or(false),
            });
        }

        // Without explicit flags, the longest stage is the one that may not be interrupted.
        if !config.stages.iter().any(|stage| stage.non_interruptible == Some(true))
            && let Some(index) = longest_stage_index(&stages)
            && config.stages[index].non_interruptible.is_none()
        {
            stages[index].non_interruptible = true;
        }

        let batch_yield = stages
            .iter()
            .map(|stage| stage.machine.capacity)
            .min()
            .unwrap_or(Kilograms::ZERO);

        Ok(Self { tier: config.tier.clone(), stages, batch_yield })
    }

    pub fn longest_stage(&self) -> Option<&StageTemplate> {
        longest_stage_index(&self.stages).map(|index| &self.stages[index])
    }

    /// Energy of a single batch.
    pub fn energy(&self) -> KilowattHours {
        self.stages.iter().map(StageTemplate::energy).sum()
    }

    /// Stage intervals when every gap is kept at its minimum.
    pub fn chain_at_min_gaps(
        &self,
        start: NaiveDateTime,
    ) -> impl Iterator<Item = (&StageTemplate, Interval)> {
        self.stages.iter().scan(start, |start, stage| {
            let interval = stage.interval_from(*start);
            *start = interval.end + stage.gap.min;
            Some((stage, interval))
        })
    }
}

/// The first one wins on ties.
fn longest_stage_index(stages: &[StageTemplate]) -> Option<usize> {
    stages
        .iter()
        .enumerate()
        .fold(None, |longest: Option<(usize, TimeDelta)>, (index, stage)| match longest {
            Some((_, duration)) if duration >= stage.duration => longest,
            _ => Some((index, stage.duration)),
        })
        .map(|(index, _)| index)
}
