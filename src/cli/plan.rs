use crate::{
    cli::{Format, PlanArgs},
    config::Config,
    forecast::{ConstantClimate, ForecastFile, PriceForecastProvider, WeatherForecastProvider},
    planner::{Planner, Report},
    prelude::*,
    tables::{build_batches_table, build_summary_table, build_timeline_table},
};

#[instrument(skip_all)]
pub fn plan(args: &PlanArgs, config: &Config) -> Result {
    let catalog = config.catalog()?;
    let tariff = config.tariff_table()?;

    let forecast_file = args.forecast.as_deref().map(ForecastFile::read_from).transpose()?;
    let constant_climate = match (args.climate.temperature, args.climate.humidity) {
        (Some(temperature), Some(humidity)) => Some(ConstantClimate { temperature, humidity }),
        _ => None,
    };
    let weather_provider: &dyn WeatherForecastProvider = match (&constant_climate, &forecast_file)
    {
        (Some(climate), _) => climate,
        (None, Some(file)) => file,
        (None, None) => bail!("either a forecast file or a constant indoor climate is required"),
    };

    let plan = Planner::builder()
        .catalog(&catalog)
        .tariff(&tariff)
        .maybe_price_provider(
            forecast_file.as_ref().map(|file| file as &dyn PriceForecastProvider),
        )
        .weather_provider(weather_provider)
        .maybe_fallback_prices(config.fallback_prices)
        .horizon_hours(args.horizon_hours.unwrap_or(config.horizon_hours))
        .baseline_start_hour(config.baseline.start_hour)
        .gap_step(config.placement.gap_step())
        .maybe_plant_power_limit(config.plant.max_power)
        .build()
        .build_plan(args.date(), args.target, &args.tier)?;

    match args.format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&Report { optimization: &plan })?);
        }
        Format::Table => {
            println!("{}", build_batches_table(&plan));
            println!("{}", build_timeline_table(&plan.hourly_timeline));
            println!("{}", build_summary_table(&plan));
            for recommendation in &plan.recommendations {
                println!("• {recommendation}");
            }
        }
    }
    Ok(())
}
