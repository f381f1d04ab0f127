//! Model feature vectors
//!
//! Two shapes exist. The basic vector carries region, month and weather. The
//! lagged vector adds six monthly case-count lags and their 3- and 6-month
//! moving averages. Column names match the ones the model was trained on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Region, RegionCatalog, WeatherReading};
use crate::types::Month;

/// Columns of the basic feature vector, in model order
pub const BASIC_FEATURES: [&str; 5] = [
    "region_encoded",
    "month_num",
    "rainfall",
    "temperature",
    "humidity",
];

/// Columns of the lagged feature vector, in model order
pub const LAGGED_FEATURES: [&str; 13] = [
    "region_encoded",
    "month_num",
    "rainfall",
    "temperature",
    "humidity",
    "prev_cases_1",
    "prev_cases_2",
    "prev_cases_3",
    "prev_cases_4",
    "prev_cases_5",
    "prev_cases_6",
    "ma_3",
    "ma_6",
];

/// Number of monthly lags the model uses
pub const MAX_LAGS: usize = 6;

/// Decay applied to `prev_cases_2` to stand in for a missing `prev_cases_4`
pub const LAG4_DECAY: f64 = 0.95;
/// Decay applied to `prev_cases_3` to stand in for a missing `prev_cases_5`
pub const LAG5_DECAY: f64 = 0.90;
/// Decay applied to `prev_cases_3` to stand in for a missing `prev_cases_6`
pub const LAG6_DECAY: f64 = 0.85;

/// Feature construction failed on a specific field
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid feature '{field}': {message}")]
pub struct FeatureError {
    pub field: String,
    pub message: String,
}

impl FeatureError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Case-count lags and their moving averages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LagFeatures {
    /// `prev_cases_1..=6`, most recent first
    pub prev_cases: [f64; MAX_LAGS],
    pub ma_3: f64,
    pub ma_6: f64,
    /// How many of the six lags were observed rather than extrapolated
    pub observed_lags: usize,
}

/// Model input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    pub region_encoded: i32,
    pub month_num: u32,
    pub rainfall: f64,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lags: Option<LagFeatures>,
}

impl FeatureVector {
    /// Column names for this vector's shape.
    pub fn names(&self) -> &'static [&'static str] {
        if self.lags.is_some() {
            &LAGGED_FEATURES
        } else {
            &BASIC_FEATURES
        }
    }

    /// Values in the same order as [`FeatureVector::names`].
    pub fn values(&self) -> Vec<f64> {
        let mut values = vec![
            f64::from(self.region_encoded),
            f64::from(self.month_num),
            self.rainfall,
            self.temperature,
            self.humidity,
        ];
        if let Some(lags) = &self.lags {
            values.extend_from_slice(&lags.prev_cases);
            values.push(lags.ma_3);
            values.push(lags.ma_6);
        }
        values
    }

    /// Value of a named column, if this vector has it.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names()
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values()[idx])
    }

    pub fn month(&self) -> Option<Month> {
        Month::new(self.month_num)
    }
}

/// Assembles feature vectors against a region catalog
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder<'a> {
    catalog: &'a RegionCatalog,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(catalog: &'a RegionCatalog) -> Self {
        Self { catalog }
    }

    /// Region, month and weather only.
    pub fn build_basic(
        &self,
        region: &Region,
        month_num: u32,
        weather: &WeatherReading,
    ) -> Result<FeatureVector, FeatureError> {
        let month = Month::new(month_num)
            .ok_or_else(|| FeatureError::new("month_num", format!("{} is not in 1..=12", month_num)))?;

        Ok(FeatureVector {
            region_encoded: self.catalog.encode(region),
            month_num: month.number(),
            rainfall: non_negative("rainfall", weather.rainfall_mm)?,
            temperature: finite("temperature", weather.temperature_c)?,
            humidity: percentage("humidity", weather.humidity_pct)?,
            lags: None,
        })
    }

    /// Basic features plus case-count lags.
    ///
    /// `history` holds up to six monthly counts, most recent first. Missing
    /// positions 1-3 default to 0. Missing positions 4-6 are extrapolated
    /// from `prev_cases_2` and `prev_cases_3`; this approximates deep
    /// history, it is not a real lag.
    pub fn build_lagged(
        &self,
        region: &Region,
        month_num: u32,
        weather: &WeatherReading,
        history: &[f64],
    ) -> Result<FeatureVector, FeatureError> {
        let mut vector = self.build_basic(region, month_num, weather)?;
        vector.lags = Some(lag_features(history)?);
        Ok(vector)
    }
}

/// Derive lags and moving averages from a most-recent-first history.
pub fn lag_features(history: &[f64]) -> Result<LagFeatures, FeatureError> {
    if history.len() > MAX_LAGS {
        return Err(FeatureError::new(
            "recent_case_history",
            format!("at most {} months are used, got {}", MAX_LAGS, history.len()),
        ));
    }

    let mut prev_cases = [0.0; MAX_LAGS];
    for (idx, value) in history.iter().enumerate() {
        prev_cases[idx] = non_negative(&format!("prev_cases_{}", idx + 1), *value)?;
    }

    if history.len() < 4 {
        prev_cases[3] = prev_cases[1] * LAG4_DECAY;
    }
    if history.len() < 5 {
        prev_cases[4] = prev_cases[2] * LAG5_DECAY;
    }
    if history.len() < 6 {
        prev_cases[5] = prev_cases[2] * LAG6_DECAY;
    }

    let ma_3 = prev_cases[..3].iter().sum::<f64>() / 3.0;
    let ma_6 = prev_cases.iter().sum::<f64>() / MAX_LAGS as f64;

    Ok(LagFeatures {
        prev_cases,
        ma_3,
        ma_6,
        observed_lags: history.len(),
    })
}

/// Parse form-entered case counts, most recent first.
///
/// Each entry must be a non-negative number; failures name the
/// `prev_cases_N` field they came from.
pub fn parse_case_history<S: AsRef<str>>(raw: &[S]) -> Result<Vec<f64>, FeatureError> {
    raw.iter()
        .enumerate()
        .map(|(idx, s)| {
            let field = format!("prev_cases_{}", idx + 1);
            let text = s.as_ref().trim().replace(',', "");
            let value = text
                .parse::<f64>()
                .map_err(|_| FeatureError::new(&field, format!("'{}' is not a number", s.as_ref())))?;
            non_negative(&field, value)
        })
        .collect()
}

fn finite(field: &str, value: f64) -> Result<f64, FeatureError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FeatureError::new(field, "must be a finite number"))
    }
}

fn non_negative(field: &str, value: f64) -> Result<f64, FeatureError> {
    let value = finite(field, value)?;
    if value < 0.0 {
        return Err(FeatureError::new(field, "must not be negative"));
    }
    Ok(value)
}

fn percentage(field: &str, value: f64) -> Result<f64, FeatureError> {
    let value = non_negative(field, value)?;
    if value > 100.0 {
        return Err(FeatureError::new(field, "must not exceed 100"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather() -> WeatherReading {
        WeatherReading::observed(28.0, 70.0, 2.5, "Manila")
    }

    #[test]
    fn basic_vector_layout() {
        let catalog = RegionCatalog::builtin();
        let ncr = catalog.get(3).unwrap();
        let v = FeatureBuilder::new(&catalog).build_basic(ncr, 7, &weather()).unwrap();
        assert_eq!(v.names(), &BASIC_FEATURES);
        assert_eq!(v.values(), vec![3.0, 7.0, 2.5, 28.0, 70.0]);
        assert_eq!(v.get("humidity"), Some(70.0));
        assert_eq!(v.get("ma_3"), None);
    }

    #[test]
    fn extrapolates_missing_deep_lags() {
        let lags = lag_features(&[300.0, 250.0, 200.0]).unwrap();
        assert_eq!(lags.prev_cases[3], 237.5);
        assert_eq!(lags.prev_cases[4], 180.0);
        assert_eq!(lags.prev_cases[5], 170.0);
        assert_eq!(lags.ma_3, 250.0);
        assert!((lags.ma_6 - 222.916_666_7).abs() < 1e-6);
        assert_eq!(lags.observed_lags, 3);
    }

    #[test]
    fn full_history_used_verbatim() {
        let lags = lag_features(&[6.0, 5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
        assert_eq!(lags.prev_cases, [6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(lags.ma_6, 3.5);
    }

    #[test]
    fn partial_deep_history_keeps_observed_values() {
        let lags = lag_features(&[10.0, 20.0, 40.0, 99.0]).unwrap();
        assert_eq!(lags.prev_cases[3], 99.0);
        assert_eq!(lags.prev_cases[4], 36.0);
        assert_eq!(lags.prev_cases[5], 34.0);
    }

    #[test]
    fn empty_history_is_all_zero() {
        let lags = lag_features(&[]).unwrap();
        assert_eq!(lags.prev_cases, [0.0; 6]);
        assert_eq!(lags.ma_3, 0.0);
        assert_eq!(lags.ma_6, 0.0);
    }

    #[test]
    fn rejects_bad_inputs_with_field_names() {
        let err = lag_features(&[1.0, -2.0]).unwrap_err();
        assert_eq!(err.field, "prev_cases_2");

        let err = lag_features(&[1.0; 7]).unwrap_err();
        assert_eq!(err.field, "recent_case_history");

        let catalog = RegionCatalog::builtin();
        let region = catalog.default_region();
        let builder = FeatureBuilder::new(&catalog);

        let err = builder.build_basic(region, 13, &weather()).unwrap_err();
        assert_eq!(err.field, "month_num");

        let mut w = weather();
        w.humidity_pct = 120.0;
        assert_eq!(builder.build_basic(region, 1, &w).unwrap_err().field, "humidity");

        let mut w = weather();
        w.temperature_c = f64::NAN;
        assert_eq!(builder.build_basic(region, 1, &w).unwrap_err().field, "temperature");
    }

    #[test]
    fn parses_form_history() {
        assert_eq!(parse_case_history(&["1,200", " 80 "]).unwrap(), vec![1200.0, 80.0]);
        let err = parse_case_history(&["12", "abc"]).unwrap_err();
        assert_eq!(err.field, "prev_cases_2");
        let err = parse_case_history(&["-4"]).unwrap_err();
        assert_eq!(err.field, "prev_cases_1");
    }

    #[test]
    fn lagged_vector_layout() {
        let catalog = RegionCatalog::builtin();
        let region = catalog.get(14).unwrap();
        let v = FeatureBuilder::new(&catalog)
            .build_lagged(region, 9, &weather(), &[300.0, 250.0, 200.0])
            .unwrap();
        assert_eq!(v.names().len(), 13);
        assert_eq!(v.values().len(), 13);
        assert_eq!(v.get("prev_cases_4"), Some(237.5));
        assert_eq!(v.get("region_encoded"), Some(14.0));
    }
}
