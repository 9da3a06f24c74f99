use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    batch::Batch,
    planner::{
        baseline::Baseline,
        sanitize::{SanitizationNote, Sanitize, Sanitizer},
        timeline::TimelineEntry,
    },
    quantity::{cost::Cost, energy::KilowattHours, mass::Kilograms},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    #[display("forecast")]
    Forecast,

    /// Static tariff period prices.
    #[display("tariff fallback")]
    TariffFallback,
}

/// Batches actually placed.
#[derive(Clone, Debug, Serialize)]
pub struct Schedule {
    pub total_cost: Cost,

    #[serde(rename = "total_energy_kwh")]
    pub total_energy: KilowattHours,

    pub batches: Vec<Batch>,
}

impl From<Vec<Batch>> for Schedule {
    fn from(batches: Vec<Batch>) -> Self {
        Self {
            total_cost: batches.iter().map(|batch| batch.total_cost).sum(),
            total_energy: batches.iter().map(|batch| batch.total_energy).sum(),
            batches,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize)]
pub struct Savings {
    /// Baseline cost minus plan cost.
    pub absolute: Cost,

    /// Of the baseline cost, `None` when the baseline costs nothing.
    pub percent: Option<f64>,
}

impl Savings {
    pub fn between(baseline: Cost, plan: Cost) -> Self {
        let absolute = baseline - plan;
        let percent = (baseline != Cost::ZERO).then(|| absolute / baseline * 100.0);
        Self { absolute, percent }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OptimizationPlan {
    pub target_date: NaiveDate,

    pub tier: String,

    #[serde(rename = "target_kg")]
    pub target: Kilograms,

    #[serde(rename = "achieved_kg")]
    pub achieved: Kilograms,

    /// Batches placed.
    pub num_batches: usize,

    pub requested_batches: usize,

    /// Fewer batches than requested fit within the horizon.
    pub partial: bool,

    pub price_source: PriceSource,

    pub plan: Schedule,

    pub baseline: Baseline,

    pub savings: Savings,

    pub hourly_timeline: Vec<TimelineEntry>,

    pub recommendations: Vec<String>,

    pub sanitization: Vec<SanitizationNote>,
}

impl OptimizationPlan {
    const BASELINE_COST_FIELD: &str = "baseline.total_cost";

    /// Whether the baseline cost came from the forecast rather than from sanitization.
    #[must_use]
    pub fn is_baseline_priced(&self) -> bool {
        !self.sanitization.iter().any(|note| note.field == Self::BASELINE_COST_FIELD)
    }

    /// Replace every non-finite number in a single pass, noting each replacement.
    ///
    /// Derived numbers fall back to values recomputed from their sanitized sources.
    pub fn sanitize(&mut self) {
        let mut sanitizer = Sanitizer::default();

        for (index, batch) in self.plan.batches.iter_mut().enumerate() {
            batch.sanitize(&format!("plan.batches[{index}]"), &mut sanitizer);
        }
        let plan_cost = self.plan.batches.iter().map(|batch| batch.total_cost.0).sum();
        sanitizer.fallback(
            || "plan.total_cost".to_owned(),
            &mut self.plan.total_cost.0,
            plan_cost,
            "summed over the sanitized batches",
        );
        let plan_energy = self.plan.batches.iter().map(|batch| batch.total_energy.0).sum();
        sanitizer.fallback(
            || "plan.total_energy_kwh".to_owned(),
            &mut self.plan.total_energy.0,
            plan_energy,
            "summed over the sanitized batches",
        );

        sanitizer.fallback(
            || Self::BASELINE_COST_FIELD.to_owned(),
            &mut self.baseline.total_cost.0,
            self.plan.total_cost.0,
            "the baseline covers hours without a finite price, so it is taken equal to the plan",
        );
        sanitizer.fallback(
            || "baseline.total_energy_kwh".to_owned(),
            &mut self.baseline.total_energy.0,
            0.0,
            "baseline energy is not a number",
        );
        sanitizer.nullify(
            || "baseline.avg_price".to_owned(),
            &mut self.baseline.average_price,
            "the baseline cost or energy is not finite",
        );

        sanitizer.fallback(
            || "savings.absolute".to_owned(),
            &mut self.savings.absolute.0,
            self.baseline.total_cost.0 - self.plan.total_cost.0,
            "recomputed from the sanitized costs",
        );
        sanitizer.nullify(
            || "savings.percent".to_owned(),
            &mut self.savings.percent,
            "the baseline cost is not usable as a reference",
        );

        for (index, entry) in self.hourly_timeline.iter_mut().enumerate() {
            entry.sanitize(&format!("hourly_timeline[{index}]"), &mut sanitizer);
        }

        let notes = sanitizer.into_notes();
        self.recommendations.extend(
            notes.iter().map(|note| format!("`{}` was not a finite number: {}.", note.field, note.reason)),
        );
        self.sanitization.extend(notes);
    }
}

/// JSON document as returned to the callers.
#[derive(Serialize)]
pub struct Report<'a> {
    pub optimization: &'a OptimizationPlan,
}
