#![doc = include_str!("../README.md")]

mod batch;
mod catalog;
mod cli;
mod config;
mod error;
mod forecast;
mod gate;
mod occupancy;
mod ops;
mod placer;
mod planner;
mod prelude;
mod quantity;
mod tables;
mod tariff;
#[cfg(test)]
mod testing;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command, plan},
    prelude::*,
    tables::{build_machines_table, build_sequences_table, build_tariff_table},
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().with_writer(std::io::stderr).init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    let config = args.load_config()?;

    match &args.command {
        Command::Plan(plan_args) => {
            plan(plan_args, &config)?;
        }
        Command::Tariff(tariff_args) => {
            let date = tariff_args.date();
            let tariff = config.tariff_table()?;
            info!(%date, day_type = %tariff.day_type(date), "classified");
            println!("{}", build_tariff_table(&tariff, date));
        }
        Command::Catalog(catalog_args) => {
            let catalog = config.catalog()?;
            if let Some(id) = &catalog_args.machine {
                println!("{}", build_machines_table([catalog.machine(id)?]));
            } else {
                println!("{}", build_machines_table(catalog.machines()));
                println!("{}", build_sequences_table(&catalog));
            }
        }
    }

    info!("done!");
    Ok(())
}
