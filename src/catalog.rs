mod machine;
mod sequence;

use std::collections::BTreeMap;

pub use self::{
    machine::{ClimateBand, ClimateStatus, MachineId, MachineSpec},
    sequence::{ProductionSequence, SequenceConfig, StageConfig, StageTemplate},
};
use crate::error::PlanError;

/// Machines and production sequences of the plant, validated once at load.
#[derive(Clone, Debug)]
pub struct Catalog {
    machines: BTreeMap<MachineId, MachineSpec>,
    sequences: BTreeMap<String, ProductionSequence>,
}

impl Catalog {
    pub fn try_new(
        machines: impl IntoIterator<Item = MachineSpec>,
        sequences: &[SequenceConfig],
    ) -> Result<Self, PlanError> {
        let mut machine_index = BTreeMap::new();
        for machine in machines {
            machine.validate().map_err(PlanError::InvalidCatalog)?;
            if let Some(duplicate) = machine_index.insert(machine.id.clone(), machine) {
                return Err(PlanError::InvalidCatalog(format!(
                    "machine `{}` is defined more than once",
                    duplicate.id,
                )));
            }
        }

        let mut sequence_index = BTreeMap::new();
        for config in sequences {
            let sequence = ProductionSequence::try_resolve(config, &machine_index)?;
            if sequence_index.insert(sequence.tier.clone(), sequence).is_some() {
                return Err(PlanError::InvalidCatalog(format!(
                    "tier `{}` is defined more than once",
                    config.tier,
                )));
            }
        }

        Ok(Self { machines: machine_index, sequences: sequence_index })
    }

    pub fn machine(&self, id: &MachineId) -> Result<&MachineSpec, PlanError> {
        self.machines.get(id).ok_or_else(|| PlanError::UnknownMachine(id.clone()))
    }

    pub fn sequence(&self, tier: &str) -> Result<&ProductionSequence, PlanError> {
        self.sequences.get(tier).ok_or_else(|| PlanError::UnknownTier(tier.to_owned()))
    }

    pub fn machines(&self) -> impl Iterator<Item = &MachineSpec> {
        self.machines.values()
    }

    pub fn sequences(&self) -> impl Iterator<Item = &ProductionSequence> {
        self.sequences.values()
    }
}
