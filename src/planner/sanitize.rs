use serde::Serialize;

use crate::{
    batch::{Batch, ScheduledStage},
    planner::timeline::TimelineEntry,
    prelude::*,
};

/// Non-finite number replaced before the plan left the engine.
#[derive(Clone, Debug, Serialize)]
pub struct SanitizationNote {
    pub field: String,
    pub reason: String,

    /// `None` when the field was set to `null`.
    pub replacement: Option<f64>,
}

#[derive(Default)]
pub struct Sanitizer {
    notes: Vec<SanitizationNote>,
}

impl Sanitizer {
    /// Replace a non-finite value with `fallback`, or with zero when the fallback is not finite either.
    pub fn fallback(
        &mut self,
        field: impl FnOnce() -> String,
        value: &mut f64,
        fallback: f64,
        reason: &str,
    ) {
        if value.is_finite() {
            return;
        }
        if fallback.is_finite() {
            self.record(field(), reason, Some(fallback));
            *value = fallback;
        } else {
            self.record(field(), &format!("{reason}, which is not finite either, so zero is used"), Some(0.0));
            *value = 0.0;
        }
    }

    pub fn nullify(&mut self, field: impl FnOnce() -> String, value: &mut Option<f64>, reason: &str) {
        if value.is_some_and(|value| !value.is_finite()) {
            self.record(field(), reason, None);
            *value = None;
        }
    }

    fn record(&mut self, field: String, reason: &str, replacement: Option<f64>) {
        warn!(%field, reason, ?replacement, "replaced a non-finite number");
        self.notes.push(SanitizationNote { field, reason: reason.to_owned(), replacement });
    }

    pub fn into_notes(self) -> Vec<SanitizationNote> {
        self.notes
    }
}

pub trait Sanitize {
    fn sanitize(&mut self, path: &str, sanitizer: &mut Sanitizer);
}

impl Sanitize for ScheduledStage {
    fn sanitize(&mut self, path: &str, sanitizer: &mut Sanitizer) {
        sanitizer.fallback(
            || format!("{path}.energy_kwh"),
            &mut self.energy.0,
            0.0,
            "stage energy is not a number",
        );
        sanitizer.fallback(
            || format!("{path}.cost"),
            &mut self.cost.0,
            0.0,
            "the price forecast is not finite within the stage",
        );
    }
}

impl Sanitize for Batch {
    fn sanitize(&mut self, path: &str, sanitizer: &mut Sanitizer) {
        for (index, stage) in self.stages.iter_mut().enumerate() {
            stage.sanitize(&format!("{path}.stages[{index}]"), sanitizer);
        }
        let total_energy = self.stages.iter().map(|stage| stage.energy.0).sum();
        sanitizer.fallback(
            || format!("{path}.total_energy_kwh"),
            &mut self.total_energy.0,
            total_energy,
            "summed over the sanitized stages",
        );
        let total_cost = self.stages.iter().map(|stage| stage.cost.0).sum();
        sanitizer.fallback(
            || format!("{path}.total_cost"),
            &mut self.total_cost.0,
            total_cost,
            "summed over the sanitized stages",
        );
    }
}

impl Sanitize for TimelineEntry {
    fn sanitize(&mut self, path: &str, sanitizer: &mut Sanitizer) {
        sanitizer.nullify(
            || format!("{path}.price_eur_kwh"),
            &mut self.price,
            "the price forecast is not finite",
        );
        sanitizer.nullify(
            || format!("{path}.temperature"),
            &mut self.temperature,
            "the weather forecast is not finite",
        );
        sanitizer.nullify(
            || format!("{path}.humidity"),
            &mut self.humidity,
            "the weather forecast is not finite",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback() {
        let mut sanitizer = Sanitizer::default();
        let mut finite = 1.5;
        sanitizer.fallback(|| unreachable!(), &mut finite, 0.0, "unused");
        assert_eq!(finite, 1.5);

        let mut infinite = f64::INFINITY;
        sanitizer.fallback(|| "plan.total_cost".into(), &mut infinite, 2.0, "overflow");
        assert_eq!(infinite, 2.0);

        let notes = sanitizer.into_notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].field, "plan.total_cost");
        assert_eq!(notes[0].replacement, Some(2.0));
    }

    #[test]
    fn test_non_finite_fallback_becomes_zero() {
        let mut sanitizer = Sanitizer::default();
        let mut value = f64::NAN;
        sanitizer.fallback(
            || "savings.absolute".into(),
            &mut value,
            f64::INFINITY - f64::INFINITY,
            "recomputed from the sanitized costs",
        );
        assert_eq!(value, 0.0);

        let notes = sanitizer.into_notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].replacement, Some(0.0));
        assert!(notes[0].reason.starts_with("recomputed from the sanitized costs, which is not finite"));
    }

    #[test]
    fn test_nullify() {
        let mut sanitizer = Sanitizer::default();
        let mut missing = None;
        sanitizer.nullify(|| unreachable!(), &mut missing, "unused");
        let mut nan = Some(f64::NAN);
        sanitizer.nullify(|| "hourly_timeline[3].price_eur_kwh".into(), &mut nan, "no price");
        assert_eq!(nan, None);
        assert_eq!(sanitizer.into_notes()[0].replacement, None);
    }
}
