use std::collections::BTreeMap;

use bon::Builder;
use chrono::{NaiveDateTime, TimeDelta};
use enumset::EnumSet;
use itertools::Itertools;

use crate::{
    batch::{Batch, BatchId, ScheduledStage},
    catalog::{ProductionSequence, StageTemplate},
    forecast::Forecast,
    gate::{FeasibilityGate, Rejection, RejectionKind},
    occupancy::MachineOccupancy,
    prelude::*,
    quantity::{cost::Cost, mass::Kilograms},
};

/// No start within the horizon admits the whole chain.
#[derive(Clone, Debug, thiserror::Error)]
#[error("batch {batch} fits nowhere among {n_candidates} candidate starts, first because {first}")]
pub struct PlacementFailure {
    pub batch: BatchId,
    pub n_candidates: usize,

    /// Rejection of the earliest candidate.
    pub first: Rejection,

    /// Every kind of rejection seen across the candidates.
    pub kinds: EnumSet<RejectionKind>,
}

/// Rejections of chain suffixes, keyed by the number of remaining stages and their earliest start.
///
/// Valid while the occupancy stays the same, that is within a single placement.
type DeadEnds = BTreeMap<(usize, NaiveDateTime), Rejection>;

/// Fully chained, not yet committed.
struct Candidate {
    stages: Vec<ScheduledStage>,
    cost: Cost,
}

/// Greedy single-batch placement: the cheapest feasible chain among all hourly anchors.
#[derive(Builder)]
pub struct BatchPlacer<'a> {
    gate: &'a FeasibilityGate<'a>,
    forecast: &'a Forecast,

    /// Step between candidate starts within an allowed gap.
    #[builder(default = TimeDelta::minutes(15))]
    gap_step: TimeDelta,
}

impl BatchPlacer<'_> {
    /// Place the batch and commit it into the occupancy.
    ///
    /// Ties within [`Cost::EPSILON`] go to the earliest anchor.
    #[instrument(skip_all, fields(batch = %id, tier = %sequence.tier))]
    pub fn place(
        &self,
        id: BatchId,
        sequence: &ProductionSequence,
        target: Kilograms,
        occupancy: &mut MachineOccupancy,
    ) -> Result<Batch, PlacementFailure> {
        let mut best: Option<Candidate> = None;
        let mut first_rejection = None;
        let mut kinds = EnumSet::empty();
        let mut n_candidates = 0;
        let mut dead_ends = DeadEnds::new();

        for anchor in self.forecast.hour_starts() {
            n_candidates += 1;
            match self.propose(&sequence.stages, anchor, occupancy, &mut dead_ends) {
                Ok(candidate) => {
                    if best.as_ref().is_none_or(|best| candidate.cost < best.cost - Cost::EPSILON) {
                        best = Some(candidate);
                    }
                }
                Err(rejection) => {
                    trace!(%anchor, %rejection, "rejected");
                    kinds |= rejection.kinds();
                    first_rejection.get_or_insert(rejection);
                }
            }
        }

        let Some(best) = best else {
            let first = first_rejection.unwrap_or_else(|| Rejection::BeyondHorizon {
                stage: sequence.stages.first().map_or_else(String::new, |stage| stage.name.clone()),
                end: self.forecast.horizon().end,
            });
            return Err(PlacementFailure { batch: id, n_candidates, first, kinds });
        };

        let batch = Batch::new(id, sequence.tier.clone(), target, best.stages);
        occupancy.commit(&batch);
        info!(
            start = ?batch.start(),
            cost = %batch.total_cost,
            n_candidates,
            n_dead_ends = dead_ends.len(),
            "placed",
        );
        Ok(batch)
    }

    /// Chain the stages from the anchor, taking the earliest feasible start within each gap.
    fn propose(
        &self,
        stages: &[StageTemplate],
        anchor: NaiveDateTime,
        occupancy: &MachineOccupancy,
        dead_ends: &mut DeadEnds,
    ) -> Result<Candidate, Rejection> {
        let mut chain = Vec::with_capacity(stages.len());
        self.extend(stages, anchor, None, occupancy, dead_ends, &mut chain)?;
        let cost = chain.iter().map(|stage| stage.cost).sum();
        Ok(Candidate { stages: chain, cost })
    }

    /// Depth-first: a later start of a stage is only tried when the rest of the chain fails.
    ///
    /// The first stage starts exactly at `after`, the next ones within the gap after `previous`.
    /// A suffix that failed from some `after` is not explored again from the same `after`.
    fn extend(
        &self,
        stages: &[StageTemplate],
        after: NaiveDateTime,
        previous: Option<&StageTemplate>,
        occupancy: &MachineOccupancy,
        dead_ends: &mut DeadEnds,
        chain: &mut Vec<ScheduledStage>,
    ) -> Result<(), Rejection> {
        let Some((stage, rest)) = stages.split_first() else {
            return Ok(());
        };
        let key = (stages.len(), after);
        if let Some(rejection) = dead_ends.get(&key) {
            return Err(rejection.clone());
        }
        let starts = match previous {
            Some(previous) => self.gap_starts(after, previous).collect_vec(),
            None => vec![after],
        };

        let mut first_rejection = None;
        for start in starts {
            let rejection = match self.schedule(stage, start, occupancy) {
                Ok(scheduled) => {
                    let end = scheduled.end;
                    chain.push(scheduled);
                    match self.extend(rest, end, Some(stage), occupancy, dead_ends, chain) {
                        Ok(()) => return Ok(()),
                        Err(rejection) => {
                            chain.pop();
                            rejection
                        }
                    }
                }
                Err(rejection) => rejection,
            };
            let is_beyond_horizon = matches!(rejection, Rejection::BeyondHorizon { .. });
            first_rejection.get_or_insert(rejection);
            if is_beyond_horizon {
                // Any later start ends even later.
                break;
            }
        }

        let rejection = first_rejection.unwrap_or_else(|| Rejection::BeyondHorizon {
            stage: stage.name.clone(),
            end: self.forecast.horizon().end,
        });
        let rejection = match previous {
            Some(previous)
                if !matches!(
                    rejection,
                    Rejection::BeyondHorizon { .. } | Rejection::SequenceGapViolation { .. }
                ) =>
            {
                Rejection::SequenceGapViolation {
                    stage: stage.name.clone(),
                    previous: previous.name.clone(),
                    max_gap_minutes: previous.gap.max.num_minutes(),
                    cause: Box::new(rejection),
                }
            }
            _ => rejection,
        };
        dead_ends.insert(key, rejection.clone());
        Err(rejection)
    }

    fn schedule(
        &self,
        stage: &StageTemplate,
        start: NaiveDateTime,
        occupancy: &MachineOccupancy,
    ) -> Result<ScheduledStage, Rejection> {
        let climate_status = self.gate.check(stage, start, occupancy)?;
        let interval = stage.interval_from(start);
        Ok(ScheduledStage {
            name: stage.name.clone(),
            machine: stage.machine.id.clone(),
            start: interval.start,
            end: interval.end,
            power: stage.machine.power,
            energy: stage.energy(),
            cost: self.forecast.cost_of(stage.machine.power, interval),
            climate_status,
            non_interruptible: stage.non_interruptible,
        })
    }

    /// Candidate starts of the stage following `previous`, from the earliest.
    ///
    /// The maximum gap is always tried, even when it is not a multiple of the step.
    fn gap_starts(
        &self,
        previous_end: NaiveDateTime,
        previous: &StageTemplate,
    ) -> impl Iterator<Item = NaiveDateTime> + use<> {
        let earliest = previous_end + previous.gap.min;
        let latest = previous_end + previous.gap.max;
        let step = self.gap_step;
        std::iter::successors(Some(earliest), move |start| {
            Some(*start + step).filter(|next| *next < latest)
        })
        .chain((latest > earliest).then_some(latest))
    }
}
