//! Seasonal weather synthesis
//!
//! Derives an approximate reading for a calendar month from a current
//! observation by applying fixed per-month adjustments. When no observation is
//! available the monthly averages are used directly, so synthesis never fails.

use serde::{Deserialize, Serialize};

use crate::models::{RainfallMode, Season, WeatherReading};
use crate::types::Month;

pub const HUMIDITY_FLOOR: f64 = 30.0;
pub const HUMIDITY_CEILING: f64 = 100.0;

/// Adjustments and averages for one calendar month
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MonthProfile {
    /// °C added to the observed temperature
    pub temp_delta: f64,
    /// Percentage points added to the observed humidity
    pub humidity_delta: f64,
    /// mm added to the observed rainfall
    pub rain_delta: f64,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
    pub avg_rainfall: f64,
}

const fn profile(
    temp_delta: f64,
    humidity_delta: f64,
    rain_delta: f64,
    avg_temperature: f64,
    avg_humidity: f64,
    avg_rainfall: f64,
) -> MonthProfile {
    MonthProfile {
        temp_delta,
        humidity_delta,
        rain_delta,
        avg_temperature,
        avg_humidity,
        avg_rainfall,
    }
}

/// Lowland Philippine climatology, January first.
pub const MONTH_PROFILES: [MonthProfile; 12] = [
    profile(-1.5, -5.0, -2.0, 26.0, 75.0, 20.0),
    profile(-1.0, -7.0, -3.0, 26.5, 72.0, 12.0),
    profile(0.0, -10.0, -4.0, 27.8, 68.0, 10.0),
    profile(1.5, -10.0, -4.0, 29.2, 67.0, 15.0),
    profile(1.5, -3.0, 2.0, 29.5, 72.0, 110.0),
    profile(0.5, 5.0, 8.0, 28.5, 80.0, 250.0),
    profile(-0.5, 10.0, 12.0, 27.8, 84.0, 400.0),
    profile(-0.5, 12.0, 14.0, 27.6, 85.0, 420.0),
    profile(-0.5, 10.0, 10.0, 27.7, 84.0, 350.0),
    profile(0.0, 5.0, 5.0, 27.6, 81.0, 200.0),
    profile(-0.5, 0.0, 1.0, 27.2, 79.0, 130.0),
    profile(-1.0, -2.0, -1.0, 26.4, 77.0, 70.0),
];

/// Applies month profiles to readings
#[derive(Debug, Clone)]
pub struct SeasonalWeatherSynthesizer {
    profiles: [MonthProfile; 12],
    rainfall_mode: RainfallMode,
}

impl SeasonalWeatherSynthesizer {
    pub fn new(rainfall_mode: RainfallMode) -> Self {
        Self {
            profiles: MONTH_PROFILES,
            rainfall_mode,
        }
    }

    pub fn profile(&self, month: Month) -> &MonthProfile {
        &self.profiles[month.index()]
    }

    pub fn rainfall_mode(&self) -> RainfallMode {
        self.rainfall_mode
    }

    /// Reading for `month` derived from `raw`, or from the monthly averages
    /// when there is no usable observation.
    pub fn synthesize(&self, raw: Option<&WeatherReading>, month: Month) -> WeatherReading {
        let p = self.profile(month);

        let Some(raw) = raw.filter(|r| is_usable(r)) else {
            return self.monthly_average(month);
        };

        let rainfall_mm = match self.rainfall_mode {
            RainfallMode::Additive => (raw.rainfall_mm + p.rain_delta).max(0.0),
            RainfallMode::MonthlyAverage => p.avg_rainfall,
        };

        WeatherReading {
            temperature_c: raw.temperature_c + p.temp_delta,
            humidity_pct: clamp_humidity(raw.humidity_pct + p.humidity_delta),
            rainfall_mm,
            source_label: format!("{} adjusted to {}", raw.source_label, month),
            is_synthetic: true,
        }
    }

    /// Pure climatology for `month`.
    pub fn monthly_average(&self, month: Month) -> WeatherReading {
        let p = self.profile(month);
        WeatherReading {
            temperature_c: p.avg_temperature,
            humidity_pct: clamp_humidity(p.avg_humidity),
            rainfall_mm: p.avg_rainfall.max(0.0),
            source_label: format!("{} monthly average", month),
            is_synthetic: true,
        }
    }

    pub fn season(&self, month: Month) -> Season {
        Season::of(month)
    }
}

impl Default for SeasonalWeatherSynthesizer {
    fn default() -> Self {
        Self::new(RainfallMode::default())
    }
}

fn clamp_humidity(value: f64) -> f64 {
    value.clamp(HUMIDITY_FLOOR, HUMIDITY_CEILING)
}

fn is_usable(reading: &WeatherReading) -> bool {
    reading.temperature_c.is_finite()
        && reading.humidity_pct.is_finite()
        && reading.rainfall_mm.is_finite()
}
