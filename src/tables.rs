use chrono::{NaiveDate, TimeDelta};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;

use crate::{
    catalog::{Catalog, MachineSpec},
    planner::{OptimizationPlan, TimelineEntry},
    quantity::cost::Cost,
    tariff::TariffTable,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn optional(value: Option<f64>, precision: usize) -> Cell {
    value.map_or_else(
        || Cell::new("n/a").add_attribute(Attribute::Dim),
        |value| Cell::new(format!("{value:.precision$}")),
    )
}

#[must_use]
pub fn build_batches_table(plan: &OptimizationPlan) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Batch", "Stage", "Machine", "Start", "End", "Power", "Energy", "Cost", "Climate",
    ]);
    for batch in &plan.plan.batches {
        for stage in &batch.stages {
            table.add_row(vec![
                Cell::new(batch.id).add_attribute(Attribute::Dim),
                Cell::new(&stage.name).fg(if stage.non_interruptible {
                    Color::Magenta
                } else {
                    Color::Reset
                }),
                Cell::new(&stage.machine),
                Cell::new(stage.start.format("%H:%M")),
                Cell::new(stage.end.format("%H:%M")).add_attribute(Attribute::Dim),
                Cell::new(stage.power).set_alignment(CellAlignment::Right),
                Cell::new(stage.energy).set_alignment(CellAlignment::Right),
                Cell::new(stage.cost).set_alignment(CellAlignment::Right),
                Cell::new(stage.climate_status).fg(stage.climate_status.color()),
            ]);
        }
    }
    table
}

#[must_use]
pub fn build_timeline_table(timeline: &[TimelineEntry]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Hour", "Price", "Tariff", "Process", "Batch", "Climate", "°C", "%"]);
    for entry in timeline {
        let hour = Cell::new(entry.time.format("%H:%M"));
        table.add_row(vec![
            if entry.is_production_hour { hour } else { hour.add_attribute(Attribute::Dim) },
            optional(entry.price, 3).set_alignment(CellAlignment::Right),
            Cell::new(entry.tariff_period).fg(entry.tariff_period.color()),
            Cell::new(entry.active_process.as_deref().unwrap_or_default()),
            Cell::new(entry.active_batch.map(|batch| batch.to_string()).unwrap_or_default()),
            Cell::new(entry.climate_status).fg(entry.climate_status.color()),
            optional(entry.temperature, 1).set_alignment(CellAlignment::Right),
            optional(entry.humidity, 0).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[must_use]
pub fn build_summary_table(plan: &OptimizationPlan) -> Table {
    let mut table = new_table();
    table.set_header(vec!["", "Optimized", "Baseline"]);
    table.add_row(vec![
        Cell::new("Cost"),
        Cell::new(plan.plan.total_cost).set_alignment(CellAlignment::Right),
        Cell::new(plan.baseline.total_cost).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Energy"),
        Cell::new(plan.plan.total_energy).set_alignment(CellAlignment::Right),
        Cell::new(plan.baseline.total_energy).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Start times"),
        Cell::new(
            plan.plan
                .batches
                .iter()
                .filter_map(|batch| batch.start())
                .map(|start| start.format("%H:%M"))
                .join(", "),
        ),
        Cell::new(plan.baseline.start_times.iter().map(|start| start.format("%H:%M")).join(", "))
            .add_attribute(Attribute::Dim),
    ]);
    table.add_row(vec![
        Cell::new("Finish times"),
        Cell::new(
            plan.plan
                .batches
                .iter()
                .filter_map(|batch| batch.end())
                .map(|end| end.format("%H:%M"))
                .join(", "),
        ),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Savings"),
        Cell::new(plan.savings.absolute).set_alignment(CellAlignment::Right).fg(
            if plan.savings.absolute > Cost::EPSILON { Color::Green } else { Color::Reset },
        ),
        optional(plan.savings.percent, 1).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Batches"),
        Cell::new(format!("{} of {}", plan.num_batches, plan.requested_batches)).fg(
            if plan.partial { Color::Red } else { Color::Reset },
        ),
        Cell::new(format!("{} of {}", plan.achieved, plan.target)),
    ]);
    table
}

#[must_use]
pub fn build_tariff_table(tariff: &TariffTable, date: NaiveDate) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Start", "End", "Period"]);
    let hours = (0..24).filter_map(|hour| date.and_hms_opt(hour, 0, 0));
    for (period, mut hours) in &hours.chunk_by(|hour| tariff.classify(*hour)) {
        let Some(first) = hours.next() else { continue };
        let last = hours.last().unwrap_or(first);
        table.add_row(vec![
            Cell::new(first.format("%H:%M")),
            Cell::new((last + TimeDelta::hours(1)).format("%H:%M"))
                .add_attribute(Attribute::Dim),
            Cell::new(period).fg(period.color()),
        ]);
    }
    table
}

#[must_use]
pub fn build_machines_table<'a>(machines: impl IntoIterator<Item = &'a MachineSpec>) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Machine", "Name", "Power", "Capacity", "Optimal", "Acceptable"]);
    for machine in machines {
        let optimal = &machine.temperature.optimal;
        let acceptable = &machine.temperature.acceptable;
        let optimal_humidity = &machine.humidity.optimal;
        let acceptable_humidity = &machine.humidity.acceptable;
        table.add_row(vec![
            Cell::new(&machine.id),
            Cell::new(&machine.name).add_attribute(Attribute::Dim),
            Cell::new(machine.power).set_alignment(CellAlignment::Right),
            Cell::new(machine.capacity).set_alignment(CellAlignment::Right),
            Cell::new(format!(
                "{}..{}, {}..{}",
                optimal.min, optimal.max, optimal_humidity.min, optimal_humidity.max,
            ))
            .fg(Color::Green),
            Cell::new(format!(
                "{}..{}, {}..{}",
                acceptable.min, acceptable.max, acceptable_humidity.min, acceptable_humidity.max,
            ))
            .fg(Color::DarkYellow),
        ]);
    }
    table
}

#[must_use]
pub fn build_sequences_table(catalog: &Catalog) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Tier", "Stage", "Machine", "Duration", "Gap", "Energy"]);
    for sequence in catalog.sequences() {
        for stage in &sequence.stages {
            table.add_row(vec![
                Cell::new(&sequence.tier).add_attribute(Attribute::Dim),
                Cell::new(&stage.name).fg(if stage.non_interruptible {
                    Color::Magenta
                } else {
                    Color::Reset
                }),
                Cell::new(&stage.machine.id),
                Cell::new(format!("{} min", stage.duration.num_minutes()))
                    .set_alignment(CellAlignment::Right),
                Cell::new(format!(
                    "{}..{} min",
                    stage.gap.min.num_minutes(),
                    stage.gap.max.num_minutes(),
                ))
                .set_alignment(CellAlignment::Right),
                Cell::new(stage.energy()).set_alignment(CellAlignment::Right),
            ]);
        }
        table.add_row(vec![
            Cell::new(&sequence.tier).add_attribute(Attribute::Bold),
            Cell::new(format!("yields {}", sequence.batch_yield)),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(sequence.energy()).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog, date, tariff};

    #[test]
    fn test_tariff_table_merges_hours() {
        // Weekday: off-peak, standard, peak, standard, peak, standard.
        assert_eq!(build_tariff_table(&tariff(), date()).row_count(), 6);
    }

    #[test]
    fn test_sequences_table() {
        let catalog = catalog();
        let n_stages: usize = catalog.sequences().map(|sequence| sequence.stages.len()).sum();
        let n_sequences = catalog.sequences().count();
        assert_eq!(build_sequences_table(&catalog).row_count(), n_stages + n_sequences);
    }
}
