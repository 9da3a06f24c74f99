use std::{fs, path::Path};

use chrono::TimeDelta;
use serde::Deserialize;

use crate::{
    catalog::{Catalog, MachineSpec, SequenceConfig},
    error::PlanError,
    forecast::MAX_HORIZON_HOURS,
    prelude::*,
    quantity::power::Kilowatts,
    tariff::{PeriodPrices, TariffConfig, TariffTable},
};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Number of hourly forecast slots, counted from midnight of the target date.
    #[serde(default = "Config::default_horizon_hours")]
    pub horizon_hours: u32,

    pub baseline: BaselineConfig,

    #[serde(default)]
    pub placement: PlacementConfig,

    #[serde(default)]
    pub plant: PlantConfig,

    pub tariff: TariffConfig,

    #[serde(default)]
    pub fallback_prices: Option<PeriodPrices>,

    pub machines: Vec<MachineSpec>,

    pub sequences: Vec<SequenceConfig>,
}

impl Config {
    const BUILTIN: &str = include_str!("../conche.toml");

    const fn default_horizon_hours() -> u32 {
        24
    }

    /// Configuration shipped with the binary.
    pub fn builtin() -> Result<Self> {
        let config: Self = toml::from_str(Self::BUILTIN)
            .context("failed to parse the built-in configuration")?;
        config.validate()?;
        Ok(config)
    }

    #[instrument(skip_all, fields(path = %path.display()), name = "Reading configuration…")]
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents =
            fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
        let config: Self = toml::from_slice(&contents)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result {
        ensure!(
            (1..=MAX_HORIZON_HOURS).contains(&self.horizon_hours),
            "the horizon must span 1 to {MAX_HORIZON_HOURS} hours",
        );
        ensure!(self.baseline.start_hour < 24, "baseline start hour must be within a day");
        ensure!(self.placement.gap_step_minutes >= 1, "gap step must be at least a minute");
        if let Some(max_power) = self.plant.max_power {
            ensure!(
                max_power.is_finite() && max_power > Kilowatts::ZERO,
                "plant power limit must be positive",
            );
        }
        Ok(())
    }

    pub fn catalog(&self) -> Result<Catalog, PlanError> {
        Catalog::try_new(self.machines.iter().cloned(), &self.sequences)
    }

    pub fn tariff_table(&self) -> Result<TariffTable, PlanError> {
        TariffTable::try_from(&self.tariff)
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct BaselineConfig {
    /// Hour of day when the reference schedule starts its first batch.
    pub start_hour: u32,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct PlacementConfig {
    /// Step between candidate starts within an allowed inter-stage gap.
    #[serde(default = "PlacementConfig::default_gap_step_minutes")]
    pub gap_step_minutes: u32,
}

impl PlacementConfig {
    const fn default_gap_step_minutes() -> u32 {
        15
    }

    pub fn gap_step(self) -> TimeDelta {
        TimeDelta::minutes(self.gap_step_minutes.into())
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self { gap_step_minutes: Self::default_gap_step_minutes() }
    }
}

#[derive(Copy, Clone, Debug, Default, Deserialize)]
pub struct PlantConfig {
    /// Total power all machines may draw at the same time.
    #[serde(default, rename = "max_power_kw")]
    pub max_power: Option<Kilowatts>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin() {
        let config = Config::builtin().unwrap();
        assert_eq!(config.horizon_hours, 24);
        assert_eq!(config.baseline.start_hour, 8);
        assert_eq!(config.placement.gap_step(), TimeDelta::minutes(15));
        assert_eq!(config.plant.max_power, Some(Kilowatts(16.0)));
        assert!(config.fallback_prices.is_some());
        config.catalog().unwrap();
        config.tariff_table().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str(
            r#"
            machines = []
            sequences = []

            [baseline]
            start_hour = 6

            [tariff]
            weekday = [{ period = "standard", start_hour = 0, end_hour = 24 }]
            "#,
        )
        .unwrap();
        assert_eq!(config.horizon_hours, 24);
        assert_eq!(config.placement.gap_step_minutes, 15);
        assert!(config.plant.max_power.is_none());
        assert!(config.fallback_prices.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_horizon_hours_range() {
        let mut config = Config::builtin().unwrap();
        config.horizon_hours = MAX_HORIZON_HOURS;
        config.validate().unwrap();
        config.horizon_hours = MAX_HORIZON_HOURS + 1;
        assert!(config.validate().is_err());
        config.horizon_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_names_path() {
        let error = Config::read_from(Path::new("/nonexistent/conche.toml")).unwrap_err();
        assert!(format!("{error:#}").contains("failed to read `/nonexistent/conche.toml`"));
    }

    #[test]
    fn test_invalid_start_hour() {
        let mut config = Config::builtin().unwrap();
        config.baseline.start_hour = 24;
        assert!(config.validate().is_err());
    }
}
