//! Input validation for forecast requests

use chrono::NaiveDate;

use crate::models::{RegionCatalog, WeatherReading};
use crate::types::{DateRange, GpsCoordinates};

// ============================================================================
// Location Validations
// ============================================================================

/// Validate latitude / longitude are finite and within WGS84 bounds
pub fn validate_coordinates(coordinates: &GpsCoordinates) -> Result<(), &'static str> {
    if !coordinates.latitude.is_finite() || !coordinates.longitude.is_finite() {
        return Err("Coordinates must be finite numbers");
    }
    if !(-90.0..=90.0).contains(&coordinates.latitude) {
        return Err("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&coordinates.longitude) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Check if coordinates fall inside the Philippine archipelago's bounding box
pub fn is_in_philippines(coordinates: &GpsCoordinates) -> bool {
    (4.5..=21.5).contains(&coordinates.latitude) && (116.0..=127.0).contains(&coordinates.longitude)
}

/// Validate a region code exists in the catalog
pub fn validate_region_code(catalog: &RegionCatalog, code: i32) -> Result<(), &'static str> {
    match catalog.get(code) {
        Some(_) => Ok(()),
        None => Err("Unknown region code"),
    }
}

// ============================================================================
// Date Validations
// ============================================================================

/// Validate a forecast date lies inside the supported range
pub fn validate_target_date(date: NaiveDate, range: &DateRange) -> Result<(), &'static str> {
    if date < range.start {
        return Err("Date is before the supported range");
    }
    if date > range.end {
        return Err("Date is after the supported range");
    }
    Ok(())
}

// ============================================================================
// Weather Validations
// ============================================================================

/// Validate manually entered weather values
pub fn validate_weather(reading: &WeatherReading) -> Result<(), &'static str> {
    if !reading.temperature_c.is_finite() {
        return Err("Temperature must be a finite number");
    }
    if !(-60.0..=60.0).contains(&reading.temperature_c) {
        return Err("Temperature must be between -60 and 60 °C");
    }
    if !reading.humidity_pct.is_finite() || !(0.0..=100.0).contains(&reading.humidity_pct) {
        return Err("Humidity must be between 0 and 100%");
    }
    if !reading.rainfall_mm.is_finite() || reading.rainfall_mm < 0.0 {
        return Err("Rainfall cannot be negative");
    }
    Ok(())
}
