use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use comfy_table::Color;
use serde::{Deserialize, Serialize};

use crate::{error::PlanError, quantity::rate::KilowattHourRate};

#[derive(
    Copy,
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
)]
#[serde(rename_all = "kebab-case")]
pub enum TariffPeriod {
    #[display("peak")]
    Peak,

    #[display("standard")]
    Standard,

    #[display("off-peak")]
    OffPeak,
}

impl TariffPeriod {
    /// Timeline color, as shown by the dashboards.
    pub const fn hex_color(self) -> &'static str {
        match self {
            Self::Peak => "#e74c3c",
            Self::Standard => "#f39c12",
            Self::OffPeak => "#27ae60",
        }
    }

    pub const fn color(self) -> Color {
        match self {
            Self::Peak => Color::Red,
            Self::Standard => Color::DarkYellow,
            Self::OffPeak => Color::Green,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum DayType {
    #[display("weekday")]
    Weekday,

    /// Saturdays, Sundays, and holidays.
    #[display("weekend")]
    Weekend,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TariffConfig {
    pub weekday: Vec<TariffRange>,

    /// Falls back to the weekday table when omitted.
    #[serde(default)]
    pub weekend: Option<Vec<TariffRange>>,

    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct TariffRange {
    pub period: TariffPeriod,

    /// Inclusive.
    pub start_hour: u32,

    /// Exclusive.
    pub end_hour: u32,
}

/// Static price per tariff period, used when no price forecast is available.
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct PeriodPrices {
    pub peak: KilowattHourRate,
    pub standard: KilowattHourRate,
    pub off_peak: KilowattHourRate,
}

impl PeriodPrices {
    pub const fn get(&self, period: TariffPeriod) -> KilowattHourRate {
        match period {
            TariffPeriod::Peak => self.peak,
            TariffPeriod::Standard => self.standard,
            TariffPeriod::OffPeak => self.off_peak,
        }
    }
}

/// Hour-of-day to tariff period lookup, compiled from the configured ranges.
#[derive(Clone, Debug)]
pub struct TariffTable {
    weekday: [TariffPeriod; 24],
    weekend: [TariffPeriod; 24],
    holidays: BTreeSet<NaiveDate>,
}

impl TryFrom<&TariffConfig> for TariffTable {
    type Error = PlanError;

    fn try_from(config: &TariffConfig) -> Result<Self, Self::Error> {
        let weekday = compile(&config.weekday, DayType::Weekday)?;
        let weekend = match &config.weekend {
            Some(ranges) => compile(ranges, DayType::Weekend)?,
            None => weekday,
        };
        Ok(Self { weekday, weekend, holidays: config.holidays.iter().copied().collect() })
    }
}

impl TariffTable {
    pub fn classify(&self, time: NaiveDateTime) -> TariffPeriod {
        let slots = match self.day_type(time.date()) {
            DayType::Weekday => &self.weekday,
            DayType::Weekend => &self.weekend,
        };
        slots[time.hour() as usize]
    }

    pub fn day_type(&self, date: NaiveDate) -> DayType {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || self.holidays.contains(&date) {
            DayType::Weekend
        } else {
            DayType::Weekday
        }
    }
}

fn compile(ranges: &[TariffRange], day_type: DayType) -> Result<[TariffPeriod; 24], PlanError> {
    let mut slots: [Option<TariffPeriod>; 24] = [None; 24];
    for range in ranges {
        if range.start_hour >= range.end_hour || range.end_hour > 24 {
            return Err(PlanError::InvalidTariff(format!(
                "{day_type} range {}..{} is not a valid hour range",
                range.start_hour, range.end_hour,
            )));
        }
        for hour in range.start_hour..range.end_hour {
            let slot = &mut slots[hour as usize];
            if let Some(existing) = slot {
                return Err(PlanError::InvalidTariff(format!(
                    "{day_type} hour {hour} is both {existing} and {}",
                    range.period,
                )));
            }
            *slot = Some(range.period);
        }
    }

    let mut table = [TariffPeriod::OffPeak; 24];
    for (hour, slot) in slots.into_iter().enumerate() {
        table[hour] = slot.ok_or_else(|| {
            PlanError::InvalidTariff(format!("{day_type} hour {hour} is not covered"))
        })?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, date, tariff};

    fn range(period: TariffPeriod, start_hour: u32, end_hour: u32) -> TariffRange {
        TariffRange { period, start_hour, end_hour }
    }

    #[test]
    fn test_classify_weekday() {
        let tariff = tariff();
        assert_eq!(tariff.classify(at(0, 0)), TariffPeriod::OffPeak);
        assert_eq!(tariff.classify(at(7, 59)), TariffPeriod::OffPeak);
        assert_eq!(tariff.classify(at(8, 0)), TariffPeriod::Standard);
        assert_eq!(tariff.classify(at(11, 30)), TariffPeriod::Peak);
        assert_eq!(tariff.classify(at(19, 0)), TariffPeriod::Peak);
        assert_eq!(tariff.classify(at(23, 0)), TariffPeriod::Standard);
    }

    #[test]
    fn test_classify_weekend_and_holiday() {
        let tariff = tariff();
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(tariff.day_type(saturday), DayType::Weekend);
        assert_eq!(
            tariff.classify(saturday.and_hms_opt(19, 0, 0).unwrap()),
            TariffPeriod::OffPeak,
        );

        let christmas = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();
        assert_eq!(tariff.day_type(christmas), DayType::Weekend);
        assert_eq!(tariff.day_type(date()), DayType::Weekday);
    }

    #[test]
    fn test_weekend_defaults_to_weekday() {
        let config = TariffConfig {
            weekday: vec![range(TariffPeriod::OffPeak, 0, 12), range(TariffPeriod::Peak, 12, 24)],
            weekend: None,
            holidays: vec![],
        };
        let tariff = TariffTable::try_from(&config).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        assert_eq!(tariff.classify(sunday.and_hms_opt(13, 0, 0).unwrap()), TariffPeriod::Peak);
    }

    #[test]
    fn test_overlap_rejected() {
        let config = TariffConfig {
            weekday: vec![range(TariffPeriod::OffPeak, 0, 12), range(TariffPeriod::Peak, 11, 24)],
            weekend: None,
            holidays: vec![],
        };
        let error = TariffTable::try_from(&config).unwrap_err();
        assert!(matches!(error, PlanError::InvalidTariff(_)), "{error}");
    }

    #[test]
    fn test_gap_rejected() {
        let config = TariffConfig {
            weekday: vec![range(TariffPeriod::OffPeak, 0, 12), range(TariffPeriod::Peak, 13, 24)],
            weekend: None,
            holidays: vec![],
        };
        let error = TariffTable::try_from(&config).unwrap_err();
        assert_eq!(error.to_string(), "invalid tariff table: weekday hour 12 is not covered");
    }

    #[test]
    fn test_inverted_range_rejected() {
        let config = TariffConfig {
            weekday: vec![range(TariffPeriod::OffPeak, 24, 0)],
            weekend: None,
            holidays: vec![],
        };
        assert!(TariffTable::try_from(&config).is_err());
    }

    #[test]
    fn test_period_prices() {
        let prices = PeriodPrices {
            peak: KilowattHourRate(0.3),
            standard: KilowattHourRate(0.2),
            off_peak: KilowattHourRate(0.1),
        };
        assert_eq!(prices.get(TariffPeriod::Standard), KilowattHourRate(0.2));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&TariffPeriod::OffPeak).unwrap(), r#""off-peak""#);
        assert_eq!(TariffPeriod::OffPeak.to_string(), "off-peak");
    }
}
