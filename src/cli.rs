mod plan;

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};

pub use self::plan::plan;
use crate::{
    catalog::MachineId,
    config::Config,
    forecast::MAX_HORIZON_HOURS,
    prelude::*,
    quantity::{
        climate::{Celsius, Percent},
        mass::Kilograms,
    },
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// Plant configuration: tariff, machines, and production sequences.
    ///
    /// The built-in configuration is used when omitted.
    #[clap(long, env = "CONCHE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::read_from(path),
            None => Config::builtin(),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: plan the production day against the price forecast.
    #[clap(name = "plan")]
    Plan(Box<PlanArgs>),

    /// Show the tariff periods of a day.
    #[clap(name = "tariff")]
    Tariff(TariffArgs),

    /// Show the machines and production sequences.
    #[clap(name = "catalog")]
    Catalog(CatalogArgs),
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Production date, today when omitted.
    #[clap(long, env = "TARGET_DATE")]
    pub date: Option<NaiveDate>,

    /// Total production target.
    #[clap(long = "target-kg", env = "TARGET_KG")]
    pub target: Kilograms,

    /// Quality tier, selects the production sequence.
    #[clap(long, default_value = "standard", env = "QUALITY_TIER")]
    pub tier: String,

    /// Hourly price and weather forecast, TOML or JSON.
    ///
    /// Prices fall back to the configured tariff prices when omitted.
    #[clap(long, env = "FORECAST_PATH")]
    pub forecast: Option<PathBuf>,

    #[clap(flatten)]
    pub climate: ClimateArgs,

    /// Overrides the configured planning horizon.
    #[clap(
        long,
        env = "HORIZON_HOURS",
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HORIZON_HOURS)),
    )]
    pub horizon_hours: Option<u32>,

    #[clap(long, value_enum, default_value = "table", env = "OUTPUT_FORMAT")]
    pub format: Format,
}

impl PlanArgs {
    pub fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Constant indoor climate, overrides the weather forecast.
#[derive(Copy, Clone, Parser)]
pub struct ClimateArgs {
    #[clap(long = "temperature-celsius", env = "TEMPERATURE_CELSIUS", requires = "humidity")]
    pub temperature: Option<Celsius>,

    #[clap(long = "humidity-percent", env = "HUMIDITY_PERCENT", requires = "temperature")]
    pub humidity: Option<Percent>,
}

#[derive(Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum Format {
    Json,
    Table,
}

#[derive(Parser)]
pub struct TariffArgs {
    /// Today when omitted.
    #[clap(long, env = "TARGET_DATE")]
    pub date: Option<NaiveDate>,
}

impl TariffArgs {
    pub fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Parser)]
pub struct CatalogArgs {
    /// Show a single machine.
    #[clap(long)]
    pub machine: Option<MachineId>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_plan() {
        let args = Args::try_parse_from([
            "conche",
            "plan",
            "--date",
            "2025-03-10",
            "--target-kg",
            "120",
            "--temperature-celsius",
            "21",
            "--humidity-percent",
            "45",
            "--format",
            "json",
        ])
        .unwrap();
        let Command::Plan(args) = args.command else { panic!("expected `plan`") };
        assert_eq!(args.target, Kilograms(120.0));
        assert_eq!(args.tier, "standard");
        assert!(args.format == Format::Json);
        assert_eq!(args.climate.temperature, Some(Celsius(21.0)));
    }

    #[test]
    fn test_climate_requires_both() {
        let result = Args::try_parse_from([
            "conche",
            "plan",
            "--target-kg",
            "50",
            "--temperature-celsius",
            "21",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_horizon_hours_range() {
        let parse = |hours: &str| {
            Args::try_parse_from(["conche", "plan", "--target-kg", "50", "--horizon-hours", hours])
        };
        assert!(parse("168").is_ok());
        assert!(parse("0").is_err());
        assert!(parse("1000").is_err());
    }
}
