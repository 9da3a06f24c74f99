use bon::Builder;
use chrono::NaiveDateTime;
use enumset::EnumSet;

use crate::{
    batch::BatchId,
    catalog::{ClimateStatus, MachineId, MachineSpec, StageTemplate},
    forecast::{Forecast, HourlyForecastPoint},
    occupancy::MachineOccupancy,
    quantity::{
        climate::{Celsius, Percent},
        power::Kilowatts,
    },
};

#[derive(Debug, enumset::EnumSetType, derive_more::Display)]
pub enum RejectionKind {
    #[display("beyond horizon")]
    BeyondHorizon,

    #[display("machine conflict")]
    MachineConflict,

    #[display("non-interruptible conflict")]
    NonInterruptibleConflict,

    #[display("plant power limit")]
    PlantPowerLimit,

    #[display("environmental breach")]
    EnvironmentalBreach,

    #[display("sequence gap violation")]
    SequenceGapViolation,
}

/// Why a stage may not run at a given start.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("`{stage}` would end at {end}, after the forecast horizon")]
    BeyondHorizon { stage: String, end: NaiveDateTime },

    #[error("`{stage}` would run on `{machine}` while batch {batch} is busy with `{occupied_by}`")]
    MachineConflict { stage: String, machine: MachineId, batch: BatchId, occupied_by: String },

    #[error("`{stage}` would interfere with the non-interruptible `{protected}` of batch {batch} on `{machine}`")]
    NonInterruptibleConflict { stage: String, machine: MachineId, batch: BatchId, protected: String },

    #[error("`{stage}` would raise the plant load to {load}, over the {limit} limit")]
    PlantPowerLimit { stage: String, load: Kilowatts, limit: Kilowatts },

    #[error("`{stage}` would face {temperature} and {humidity} at {time}, critical for `{machine}`")]
    EnvironmentalBreach {
        stage: String,
        machine: MachineId,
        time: NaiveDateTime,
        temperature: Celsius,
        humidity: Percent,
    },

    #[error("`{stage}` fits nowhere within {max_gap_minutes} minutes after `{previous}`: {cause}")]
    SequenceGapViolation {
        stage: String,
        previous: String,
        max_gap_minutes: i64,
        cause: Box<Rejection>,
    },
}

impl Rejection {
    pub const fn kind(&self) -> RejectionKind {
        match self {
            Self::BeyondHorizon { .. } => RejectionKind::BeyondHorizon,
            Self::MachineConflict { .. } => RejectionKind::MachineConflict,
            Self::NonInterruptibleConflict { .. } => RejectionKind::NonInterruptibleConflict,
            Self::PlantPowerLimit { .. } => RejectionKind::PlantPowerLimit,
            Self::EnvironmentalBreach { .. } => RejectionKind::EnvironmentalBreach,
            Self::SequenceGapViolation { .. } => RejectionKind::SequenceGapViolation,
        }
    }

    /// Kind of this rejection along with the kinds of its causes.
    pub fn kinds(&self) -> EnumSet<RejectionKind> {
        match self {
            Self::SequenceGapViolation { cause, .. } => cause.kinds() | self.kind(),
            _ => EnumSet::only(self.kind()),
        }
    }
}

/// Decides whether a stage may run at a proposed start, and in which climate.
///
/// Checks are made in a fixed order, and the first failing one is reported.
#[derive(Builder)]
pub struct FeasibilityGate<'a> {
    forecast: &'a Forecast,

    /// Total power all machines may draw at the same time.
    plant_power_limit: Option<Kilowatts>,
}

impl FeasibilityGate<'_> {
    pub fn check(
        &self,
        stage: &StageTemplate,
        start: NaiveDateTime,
        occupancy: &MachineOccupancy,
    ) -> Result<ClimateStatus, Rejection> {
        let interval = stage.interval_from(start);
        let horizon = self.forecast.horizon();
        if interval.start < horizon.start || interval.end > horizon.end {
            return Err(Rejection::BeyondHorizon { stage: stage.name.clone(), end: interval.end });
        }

        let mut overlapping = occupancy.overlapping_on(&stage.machine.id, interval);
        if let Some(protected) = overlapping.clone().find(|occupation| occupation.non_interruptible) {
            return Err(Rejection::NonInterruptibleConflict {
                stage: stage.name.clone(),
                machine: stage.machine.id.clone(),
                batch: protected.batch,
                protected: protected.stage.clone(),
            });
        }
        if let Some(occupation) = overlapping.next() {
            return Err(Rejection::MachineConflict {
                stage: stage.name.clone(),
                machine: stage.machine.id.clone(),
                batch: occupation.batch,
                occupied_by: occupation.stage.clone(),
            });
        }

        if let Some(limit) = self.plant_power_limit {
            let load = occupancy.peak_load(interval) + stage.machine.power;
            if load > limit {
                // Pushing a running non-interruptible stage over the limit would interrupt it.
                let overlapping = occupancy.overlapping(interval);
                if let Some((machine, protected)) =
                    overlapping.iter().find(|(_, occupation)| occupation.non_interruptible)
                {
                    return Err(Rejection::NonInterruptibleConflict {
                        stage: stage.name.clone(),
                        machine: (*machine).clone(),
                        batch: protected.batch,
                        protected: protected.stage.clone(),
                    });
                }
                return Err(Rejection::PlantPowerLimit { stage: stage.name.clone(), load, limit });
            }
        }

        let mut worst = ClimateStatus::Optimal;
        for (hour_start, _) in interval.split_hourly() {
            let Some(point) = self.forecast.at(hour_start) else {
                return Err(Rejection::BeyondHorizon { stage: stage.name.clone(), end: interval.end });
            };
            match Self::hourly_climate(&stage.machine, point) {
                ClimateStatus::Critical => {
                    return Err(Rejection::EnvironmentalBreach {
                        stage: stage.name.clone(),
                        machine: stage.machine.id.clone(),
                        time: hour_start,
                        temperature: point.temperature,
                        humidity: point.humidity,
                    });
                }
                status => worst = worst.max(status),
            }
        }
        Ok(worst)
    }

    pub fn hourly_climate(machine: &MachineSpec, point: &HourlyForecastPoint) -> ClimateStatus {
        machine.climate_status(point.temperature, point.humidity)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::{
        batch::{Batch, ScheduledStage},
        catalog::Catalog,
        forecast::{PricePoint, WeatherPoint},
        quantity::{cost::Cost, mass::Kilograms},
        testing::{at, catalog, flat_prices, forecast, horizon, tariff},
    };

    fn stage<'a>(catalog: &'a Catalog, name: &str) -> &'a StageTemplate {
        let sequence = catalog.sequence("standard").unwrap();
        sequence.stages.iter().find(|stage| stage.name == name).unwrap()
    }

    fn committed(template: &StageTemplate, start: NaiveDateTime, batch: usize) -> MachineOccupancy {
        let interval = template.interval_from(start);
        let stage = ScheduledStage {
            name: template.name.clone(),
            machine: template.machine.id.clone(),
            start: interval.start,
            end: interval.end,
            power: template.machine.power,
            energy: template.energy(),
            cost: Cost::ZERO,
            climate_status: ClimateStatus::Optimal,
            non_interruptible: template.non_interruptible,
        };
        let mut occupancy = MachineOccupancy::default();
        occupancy.commit(&Batch::new(BatchId(batch), "standard".into(), Kilograms(50.0), vec![stage]));
        occupancy
    }

    #[test]
    fn test_feasible() {
        let catalog = catalog();
        let forecast = forecast(flat_prices(0.1));
        let gate = FeasibilityGate::builder().forecast(&forecast).build();
        let status = gate.check(stage(&catalog, "conche"), at(0, 45), &MachineOccupancy::default());
        assert_eq!(status, Ok(ClimateStatus::Optimal));
    }

    #[test]
    fn test_beyond_horizon() {
        let catalog = catalog();
        let forecast = forecast(flat_prices(0.1));
        let gate = FeasibilityGate::builder().forecast(&forecast).build();
        let rejection = gate
            .check(stage(&catalog, "conche"), at(16, 15), &MachineOccupancy::default())
            .unwrap_err();
        assert_eq!(rejection.kind(), RejectionKind::BeyondHorizon);

        // Ending exactly at the horizon end is fine.
        assert!(gate.check(stage(&catalog, "conche"), at(16, 0), &MachineOccupancy::default()).is_ok());
    }

    #[test]
    fn test_non_interruptible_conflict() {
        let catalog = catalog();
        let forecast = forecast(flat_prices(0.1));
        let gate = FeasibilityGate::builder().forecast(&forecast).build();
        let conche = stage(&catalog, "conche");
        let occupancy = committed(conche, at(0, 45), 1);
        let rejection = gate.check(conche, at(8, 30), &occupancy).unwrap_err();
        assert_eq!(rejection.kind(), RejectionKind::NonInterruptibleConflict);
        assert!(gate.check(conche, at(8, 45), &occupancy).is_ok(), "back-to-back is fine");
    }

    #[test]
    fn test_machine_conflict() {
        let catalog = catalog();
        let forecast = forecast(flat_prices(0.1));
        let gate = FeasibilityGate::builder().forecast(&forecast).build();
        let mix = stage(&catalog, "mix");
        let occupancy = committed(mix, at(3, 0), 1);
        let rejection = gate.check(mix, at(3, 10), &occupancy).unwrap_err();
        assert_eq!(
            rejection,
            Rejection::MachineConflict {
                stage: "mix".into(),
                machine: MachineId::from("mixer"),
                batch: BatchId(1),
                occupied_by: "mix".into(),
            },
        );
    }

    #[test]
    fn test_plant_power_limit() {
        let catalog = catalog();
        let forecast = forecast(flat_prices(0.1));
        let gate = FeasibilityGate::builder()
            .forecast(&forecast)
            .plant_power_limit(Kilowatts(8.0))
            .build();

        // The refiner alone draws 4.2 kW, and with the mixer it would be 9.2 kW.
        let occupancy = committed(stage(&catalog, "roll"), at(2, 0), 1);
        let rejection = gate.check(stage(&catalog, "mix"), at(2, 0), &occupancy).unwrap_err();
        assert_eq!(rejection.kind(), RejectionKind::PlantPowerLimit);
        assert!(gate.check(stage(&catalog, "mix"), at(2, 30), &occupancy).is_ok());
    }

    #[test]
    fn test_power_limit_over_non_interruptible_stage() {
        let catalog = catalog();
        let forecast = forecast(flat_prices(0.1));
        let gate = FeasibilityGate::builder()
            .forecast(&forecast)
            .plant_power_limit(Kilowatts(12.0))
            .build();
        let occupancy = committed(stage(&catalog, "conche"), at(0, 45), 1);
        let rejection = gate.check(stage(&catalog, "mix"), at(4, 0), &occupancy).unwrap_err();
        assert!(matches!(
            rejection,
            Rejection::NonInterruptibleConflict { ref protected, batch: BatchId(1), .. } if protected == "conche"
        ));
        assert!(gate.check(stage(&catalog, "temper"), at(4, 0), &occupancy).is_ok(), "11.6 kW fits");
    }

    #[test]
    fn test_environmental_breach_and_degraded() {
        let catalog = catalog();
        let weather: Vec<_> = horizon()
            .split_hourly()
            .map(|(time, _)| WeatherPoint {
                time,
                temperature: Celsius(if time < at(12, 0) { 26.0 } else { 20.0 }),
                humidity: Percent(45.0),
            })
            .collect();
        let prices: Vec<PricePoint> = flat_prices(0.1);
        let forecast = Forecast::try_assemble(horizon(), prices, weather, &tariff()).unwrap();
        let gate = FeasibilityGate::builder().forecast(&forecast).build();
        let occupancy = MachineOccupancy::default();

        // The temperer tolerates up to 24 °C.
        let rejection = gate.check(stage(&catalog, "temper"), at(11, 50), &occupancy).unwrap_err();
        assert!(matches!(rejection, Rejection::EnvironmentalBreach { time, .. } if time == at(11, 0)));
        assert_eq!(gate.check(stage(&catalog, "temper"), at(12, 0), &occupancy), Ok(ClimateStatus::Optimal));

        // The mixer is still allowed at 26 °C, but outside its optimal range.
        assert_eq!(
            gate.check(stage(&catalog, "mix"), at(3, 0), &occupancy),
            Ok(ClimateStatus::Acceptable),
        );
    }

    #[test]
    fn test_kinds_include_causes() {
        let rejection = Rejection::SequenceGapViolation {
            stage: "conche".into(),
            previous: "roll".into(),
            max_gap_minutes: 120,
            cause: Box::new(Rejection::BeyondHorizon {
                stage: "conche".into(),
                end: at(0, 0) + TimeDelta::days(1),
            }),
        };
        assert_eq!(
            rejection.kinds(),
            RejectionKind::SequenceGapViolation | RejectionKind::BeyondHorizon,
        );
    }
}
