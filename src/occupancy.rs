use std::collections::BTreeMap;

use crate::{
    batch::{Batch, BatchId},
    catalog::MachineId,
    ops::Interval,
    quantity::power::Kilowatts,
};

#[derive(Clone, Debug)]
pub struct Occupation {
    pub interval: Interval,
    pub batch: BatchId,
    pub stage: String,
    pub power: Kilowatts,
    pub non_interruptible: bool,
}

/// Committed machine time of the batches placed so far.
///
/// Occupations of a machine never overlap, and are kept sorted by start.
#[derive(Clone, Debug, Default)]
pub struct MachineOccupancy(BTreeMap<MachineId, Vec<Occupation>>);

impl MachineOccupancy {
    pub fn on(&self, machine: &MachineId) -> &[Occupation] {
        self.0.get(machine).map_or(&[], Vec::as_slice)
    }

    pub fn overlapping_on<'a>(
        &'a self,
        machine: &MachineId,
        interval: Interval,
    ) -> impl Iterator<Item = &'a Occupation> + Clone {
        self.on(machine).iter().filter(move |occupation| occupation.interval.intersects(interval))
    }

    /// Occupations of all machines overlapping the interval, ordered by batch and start.
    pub fn overlapping(&self, interval: Interval) -> Vec<(&MachineId, &Occupation)> {
        let mut overlapping: Vec<_> = self
            .0
            .iter()
            .flat_map(|(machine, occupations)| {
                occupations
                    .iter()
                    .filter(|occupation| occupation.interval.intersects(interval))
                    .map(move |occupation| (machine, occupation))
            })
            .collect();
        overlapping.sort_by_key(|(_, occupation)| (occupation.batch, occupation.interval.start));
        overlapping
    }

    /// Highest total power drawn by the committed stages at any moment within the interval.
    pub fn peak_load(&self, interval: Interval) -> Kilowatts {
        let overlapping = self.overlapping(interval);
        // The load only changes when an occupation starts.
        overlapping
            .iter()
            .map(|(_, occupation)| occupation.interval.start.max(interval.start))
            .chain([interval.start])
            .map(|moment| {
                overlapping
                    .iter()
                    .filter(|(_, occupation)| occupation.interval.contains(moment))
                    .map(|(_, occupation)| occupation.power)
                    .sum::<Kilowatts>()
            })
            .max()
            .unwrap_or(Kilowatts::ZERO)
    }

    pub fn commit(&mut self, batch: &Batch) {
        for stage in &batch.stages {
            let occupations = self.0.entry(stage.machine.clone()).or_default();
            debug_assert!(
                occupations.iter().all(|occupation| !occupation.interval.intersects(stage.interval())),
                "double-booked `{}`",
                stage.machine,
            );
            let index =
                occupations.partition_point(|occupation| occupation.interval.start < stage.start);
            occupations.insert(
                index,
                Occupation {
                    interval: stage.interval(),
                    batch: batch.id,
                    stage: stage.name.clone(),
                    power: stage.power,
                    non_interruptible: stage.non_interruptible,
                },
            );
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MachineId, &Occupation)> {
        self.0.iter().flat_map(|(machine, occupations)| {
            occupations.iter().map(move |occupation| (machine, occupation))
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDateTime;

    use super::*;
    use crate::{
        batch::ScheduledStage,
        catalog::ClimateStatus,
        quantity::{cost::Cost, mass::Kilograms, time::Hours},
        testing::at,
    };

    fn stage(
        name: &str,
        machine: &str,
        interval: (NaiveDateTime, NaiveDateTime),
        power: f64,
    ) -> ScheduledStage {
        let (start, end) = interval;
        ScheduledStage {
            name: name.to_owned(),
            machine: MachineId::from(machine),
            start,
            end,
            power: Kilowatts(power),
            energy: Kilowatts(power) * Hours::from(end - start),
            cost: Cost::ZERO,
            climate_status: ClimateStatus::Optimal,
            non_interruptible: name == "conche",
        }
    }

    fn batch(id: usize, stages: Vec<ScheduledStage>) -> Batch {
        Batch::new(BatchId(id), "standard".to_owned(), Kilograms(50.0), stages)
    }

    fn occupancy() -> MachineOccupancy {
        let mut occupancy = MachineOccupancy::default();
        occupancy.commit(&batch(
            1,
            vec![
                stage("mix", "mixer", (at(0, 0), at(0, 15)), 5.0),
                stage("conche", "conche", (at(0, 45), at(8, 45)), 9.6),
                stage("temper", "temperer", (at(8, 45), at(9, 0)), 2.0),
            ],
        ));
        occupancy.commit(&batch(2, vec![stage("mix", "mixer", (at(8, 0), at(8, 15)), 5.0)]));
        occupancy
    }

    #[test]
    fn test_commit_keeps_order() {
        let mut occupancy = occupancy();
        occupancy.commit(&batch(3, vec![stage("mix", "mixer", (at(4, 0), at(4, 15)), 5.0)]));
        let starts: Vec<_> = occupancy
            .on(&MachineId::from("mixer"))
            .iter()
            .map(|occupation| occupation.interval.start)
            .collect();
        assert_eq!(starts, [at(0, 0), at(4, 0), at(8, 0)]);
        assert!(occupancy.on(&MachineId::from("refiner")).is_empty());
    }

    #[test]
    fn test_overlapping_on() {
        let occupancy = occupancy();
        let conche = MachineId::from("conche");
        let busy = Interval::new(at(8, 30), at(9, 15));
        assert_eq!(occupancy.overlapping_on(&conche, busy).count(), 1);
        let after = Interval::new(at(8, 45), at(9, 0));
        assert_eq!(occupancy.overlapping_on(&conche, after).count(), 0);
    }

    #[test]
    fn test_overlapping_sorted_by_batch() {
        let occupancy = occupancy();
        let stages: Vec<_> = occupancy
            .overlapping(Interval::new(at(0, 0), at(9, 0)))
            .into_iter()
            .map(|(_, occupation)| (occupation.batch.0, occupation.stage.as_str()))
            .collect();
        assert_eq!(stages, [(1, "mix"), (1, "conche"), (1, "temper"), (2, "mix")]);
    }

    #[test]
    fn test_peak_load() {
        let occupancy = occupancy();
        assert_abs_diff_eq!(
            occupancy.peak_load(Interval::new(at(7, 0), at(9, 0))).0,
            14.6,
            epsilon = 1e-9,
        );
        assert_abs_diff_eq!(
            occupancy.peak_load(Interval::new(at(8, 45), at(9, 0))).0,
            2.0,
            epsilon = 1e-9,
        );
        assert_eq!(occupancy.peak_load(Interval::new(at(20, 0), at(21, 0))), Kilowatts::ZERO);
    }
}
