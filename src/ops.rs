use std::{
    fmt::{Debug, Formatter},
    ops::Sub,
};

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

/// Plant-local wall-clock interval.
pub type Interval = RangeExclusive<NaiveDateTime>;

#[must_use]
#[derive(Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RangeExclusive<T: Copy> {
    /// Inclusive.
    pub start: T,

    /// Exclusive.
    pub end: T,
}

impl<T: Copy + Debug> Debug for RangeExclusive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

impl<T: Copy> RangeExclusive<T> {
    pub const fn new(start: T, end: T) -> Self {
        Self { start, end }
    }
}

impl<T: Copy + Sub> RangeExclusive<T> {
    #[must_use]
    pub fn len(self) -> <T as Sub>::Output {
        self.end - self.start
    }
}

impl<T: Copy + Ord> RangeExclusive<T> {
    #[must_use]
    pub fn contains(self, other: T) -> bool {
        (self.start <= other) && (other < self.end)
    }

    /// Empty ranges never intersect anything.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        (self.start < other.end) && (other.start < self.end)
    }

    /// Intersection of both ranges, if it is not empty.
    pub fn intersection(self, other: Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Self { start, end })
    }
}

impl Interval {
    /// Split the interval at the hour boundaries.
    ///
    /// Yields the start of each touched hour along with the part of the interval inside it.
    pub fn split_hourly(self) -> impl Iterator<Item = (NaiveDateTime, Self)> {
        let first_hour = truncate_to_hour(self.start);
        (0..)
            .map(move |index| first_hour + TimeDelta::hours(index))
            .take_while(move |hour_start| *hour_start < self.end)
            .filter_map(move |hour_start| {
                let hour = Self::new(hour_start, hour_start + TimeDelta::hours(1));
                self.intersection(hour).map(|part| (hour_start, part))
            })
    }
}

#[must_use]
pub fn truncate_to_hour(time: NaiveDateTime) -> NaiveDateTime {
    time.with_nanosecond(0)
        .and_then(|time| time.with_second(0))
        .and_then(|time| time.with_minute(0))
        .unwrap_or(time)
}

#[must_use]
#[derive(Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RangeInclusive<T: Copy> {
    pub min: T,
    pub max: T,
}

impl<T: Copy + Debug> Debug for RangeInclusive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..={:?}", self.min, self.max)
    }
}

impl<T: Copy> From<std::ops::RangeInclusive<T>> for RangeInclusive<T> {
    fn from(range: std::ops::RangeInclusive<T>) -> Self {
        Self { min: *range.start(), max: *range.end() }
    }
}

impl<T: Copy + PartialOrd> RangeInclusive<T> {
    #[must_use]
    pub fn contains(self, other: T) -> bool {
        (self.min <= other) && (other <= self.max)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use itertools::Itertools;

    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_intersects() {
        let lhs = Interval::new(at(1, 0), at(2, 0));
        assert!(lhs.intersects(Interval::new(at(1, 30), at(3, 0))));
        assert!(!lhs.intersects(Interval::new(at(2, 0), at(3, 0))), "touching is not overlapping");
        assert!(!lhs.intersects(Interval::new(at(1, 30), at(1, 30))), "empty range");
    }

    #[test]
    fn test_split_hourly() {
        let parts = Interval::new(at(0, 45), at(2, 15)).split_hourly().collect_vec();
        assert_eq!(
            parts,
            [
                (at(0, 0), Interval::new(at(0, 45), at(1, 0))),
                (at(1, 0), Interval::new(at(1, 0), at(2, 0))),
                (at(2, 0), Interval::new(at(2, 0), at(2, 15))),
            ]
        );
    }

    #[test]
    fn test_split_hourly_empty() {
        assert_eq!(Interval::new(at(3, 0), at(3, 0)).split_hourly().count(), 0);
    }

    #[test]
    fn test_inclusive_contains() {
        let range = RangeInclusive::from(15.0..=28.0);
        assert!(range.contains(15.0));
        assert!(range.contains(28.0));
        assert!(!range.contains(28.1));
        assert!(!range.contains(f64::NAN));
    }
}
