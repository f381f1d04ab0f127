//! Common types used across the platform

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// GPS coordinates in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Where a set of coordinates came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// Reported by the client device
    #[default]
    Device,
    /// Typed in by the user
    Manual,
    /// Representative coordinate of a selected region
    Region,
}

/// Calendar month, always in 1..=12
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u32", into = "u32")]
pub struct Month(u32);

impl Month {
    /// Strict constructor; `None` outside 1..=12.
    pub fn new(month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self(month))
    }

    /// Wraps any integer into 1..=12 so month arithmetic stays total.
    pub fn wrapping(month: i64) -> Self {
        Self(((month - 1).rem_euclid(12) + 1) as u32)
    }

    pub fn of(date: NaiveDate) -> Self {
        Self(date.month())
    }

    pub const fn number(self) -> u32 {
        self.0
    }

    /// Zero-based index for month tables.
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn name(self) -> &'static str {
        const NAMES: [&str; 12] = [
            "January",
            "February",
            "March",
            "April",
            "May",
            "June",
            "July",
            "August",
            "September",
            "October",
            "November",
            "December",
        ];
        NAMES[self.index()]
    }
}

impl TryFrom<u32> for Month {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Month::new(value).ok_or_else(|| format!("month must be between 1 and 12, got {}", value))
    }
}

impl From<Month> for u32 {
    fn from(month: Month) -> Self {
        month.0
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive date range for queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Default for DateRange {
    /// 2020-01-01 through 2025-12-31, the span covered by the historical flow.
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_wrapping_is_total() {
        assert_eq!(Month::wrapping(0).number(), 12);
        assert_eq!(Month::wrapping(13).number(), 1);
        assert_eq!(Month::wrapping(-1).number(), 11);
        assert_eq!(Month::wrapping(7).number(), 7);
    }

    #[test]
    fn month_rejects_out_of_range() {
        assert!(Month::new(0).is_none());
        assert!(Month::new(13).is_none());
        assert_eq!(Month::new(3).map(Month::name), Some("March"));
    }

    #[test]
    fn month_deserializes_from_number() {
        let m: Month = serde_json::from_str("8").unwrap();
        assert_eq!(m.number(), 8);
        assert!(serde_json::from_str::<Month>("14").is_err());
    }

    #[test]
    fn default_date_range_bounds() {
        let range = DateRange::default();
        assert!(range.contains(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }

    #[test]
    fn coordinates_validity() {
        assert!(GpsCoordinates::new(14.5995, 120.9842).is_valid());
        assert!(!GpsCoordinates::new(91.0, 0.0).is_valid());
        assert!(!GpsCoordinates::new(f64::NAN, 0.0).is_valid());
    }
}
