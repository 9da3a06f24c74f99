use comfy_table::Color;
use serde::{Deserialize, Serialize};

use crate::{
    ops::RangeInclusive,
    quantity::{
        climate::{Celsius, Percent},
        mass::Kilograms,
        power::Kilowatts,
    },
};

#[derive(
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct MachineId(pub String);

impl From<&str> for MachineId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineSpec {
    pub id: MachineId,

    pub name: String,

    #[serde(rename = "power_kw")]
    pub power: Kilowatts,

    /// Stage duration when the production sequence does not override it.
    pub nominal_duration_minutes: u32,

    /// Maximum mass processed per batch.
    #[serde(rename = "capacity_kg")]
    pub capacity: Kilograms,

    pub temperature: ClimateBand<Celsius>,

    /// Relative humidity.
    pub humidity: ClimateBand<Percent>,
}

impl MachineSpec {
    /// Worst of the temperature and humidity statuses.
    pub fn climate_status(&self, temperature: Celsius, humidity: Percent) -> ClimateStatus {
        self.temperature.status(temperature).max(self.humidity.status(humidity))
    }

    pub(super) fn validate(&self) -> Result<(), String> {
        if !self.power.is_finite() || self.power < Kilowatts::ZERO {
            return Err(format!("machine `{}` has invalid power {}", self.id, self.power));
        }
        if !self.capacity.is_finite() || self.capacity <= Kilograms::ZERO {
            return Err(format!("machine `{}` has invalid capacity {}", self.id, self.capacity));
        }
        if !self.temperature.is_nested() {
            return Err(format!(
                "machine `{}`: optimal temperature must lie within the acceptable range",
                self.id,
            ));
        }
        if !self.humidity.is_nested() {
            return Err(format!(
                "machine `{}`: optimal humidity must lie within the acceptable range",
                self.id,
            ));
        }
        Ok(())
    }
}

/// Optimal and acceptable operating ranges of a single climate variable.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ClimateBand<T: Copy> {
    pub optimal: RangeInclusive<T>,
    pub acceptable: RangeInclusive<T>,
}

impl<T: Copy + PartialOrd> ClimateBand<T> {
    /// Non-comparable values (NaN) are critical.
    pub fn status(self, value: T) -> ClimateStatus {
        if self.optimal.contains(value) {
            ClimateStatus::Optimal
        } else if self.acceptable.contains(value) {
            ClimateStatus::Acceptable
        } else {
            ClimateStatus::Critical
        }
    }

    fn is_nested(self) -> bool {
        (self.acceptable.min <= self.optimal.min)
            && (self.optimal.min <= self.optimal.max)
            && (self.optimal.max <= self.acceptable.max)
    }
}

/// Ordered from best to worst.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ClimateStatus {
    #[default]
    #[display("optimal")]
    Optimal,

    /// Production allowed, quality degraded.
    #[display("acceptable")]
    Acceptable,

    /// Production forbidden.
    #[display("critical")]
    Critical,
}

impl ClimateStatus {
    pub const fn color(self) -> Color {
        match self {
            Self::Optimal => Color::Green,
            Self::Acceptable => Color::DarkYellow,
            Self::Critical => Color::Red,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band() -> ClimateBand<Celsius> {
        ClimateBand {
            optimal: RangeInclusive::from(Celsius(18.0)..=Celsius(24.0)),
            acceptable: RangeInclusive::from(Celsius(15.0)..=Celsius(28.0)),
        }
    }

    #[test]
    fn test_band_status() {
        assert_eq!(band().status(Celsius(20.0)), ClimateStatus::Optimal);
        assert_eq!(band().status(Celsius(24.0)), ClimateStatus::Optimal);
        assert_eq!(band().status(Celsius(26.0)), ClimateStatus::Acceptable);
        assert_eq!(band().status(Celsius(15.0)), ClimateStatus::Acceptable);
        assert_eq!(band().status(Celsius(29.0)), ClimateStatus::Critical);
    }

    #[test]
    fn test_nan_is_critical() {
        // `Celsius` orders NaN above everything, so it falls outside any finite band.
        assert_eq!(band().status(Celsius(f64::NAN)), ClimateStatus::Critical);
    }

    #[test]
    fn test_worst_status_wins() {
        assert!(ClimateStatus::Critical > ClimateStatus::Acceptable);
        assert!(ClimateStatus::Acceptable > ClimateStatus::Optimal);
    }

    #[test]
    fn test_nested() {
        assert!(band().is_nested());
        let inverted = ClimateBand {
            optimal: RangeInclusive::from(Celsius(10.0)..=Celsius(24.0)),
            acceptable: RangeInclusive::from(Celsius(15.0)..=Celsius(28.0)),
        };
        assert!(!inverted.is_nested());
    }
}
