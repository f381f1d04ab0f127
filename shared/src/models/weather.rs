//! Weather data models

use serde::{Deserialize, Serialize};

use crate::types::Month;

/// Weather conditions fed into a forecast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub rainfall_mm: f64,
    /// Station / place name or the table the values came from
    pub source_label: String,
    /// True when the values were derived rather than observed
    pub is_synthetic: bool,
}

impl WeatherReading {
    /// An observed reading
    pub fn observed(
        temperature_c: f64,
        humidity_pct: f64,
        rainfall_mm: f64,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            temperature_c,
            humidity_pct,
            rainfall_mm,
            source_label: source_label.into(),
            is_synthetic: false,
        }
    }
}

/// Philippine climate season
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    /// November through April
    Dry,
    /// May through October
    Wet,
}

impl Season {
    pub fn of(month: Month) -> Self {
        match month.number() {
            5..=10 => Season::Wet,
            _ => Season::Dry,
        }
    }

    /// Multiplier applied to the baseline case estimate when the model is
    /// unavailable.
    pub fn heuristic_factor(self) -> f64 {
        match self {
            Season::Wet => 1.3,
            Season::Dry => 0.7,
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Dry => write!(f, "Dry season"),
            Season::Wet => write!(f, "Wet season"),
        }
    }
}

/// How synthesized rainfall is computed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RainfallMode {
    /// Observed rainfall plus the month's delta
    #[default]
    Additive,
    /// The month's average, ignoring the observation
    MonthlyAverage,
}
