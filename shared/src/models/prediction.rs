//! Prediction models and results

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{clamp_estimate, FeatureVector, RiskThresholds, RiskTier, Season};
use crate::types::Month;

/// Baseline monthly case count used when the model cannot be evaluated
pub const HEURISTIC_BASE_CASES: f64 = 45.0;

/// Model evaluation failed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictionError {
    #[error("model expects feature '{0}' which the input does not provide")]
    MissingFeature(String),

    #[error("model expects {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("model produced a non-finite estimate")]
    NonFiniteOutput,

    #[error("model evaluation failed: {0}")]
    Evaluation(String),
}

/// A regression model mapping features to an expected case count.
///
/// Implementations are loaded once and only read afterwards, so they must be
/// shareable across request handlers.
pub trait PredictionModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictionError>;

    /// Short description for health output and logs.
    fn describe(&self) -> String {
        "prediction model".to_string()
    }
}

/// Which path produced an estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionOrigin {
    Model,
    SeasonalHeuristic,
}

/// Final estimate and tier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub expected_cases: f64,
    pub risk_tier: RiskTier,
    pub origin: PredictionOrigin,
    pub is_fallback: bool,
    /// Unclamped model output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Seasonal stand-in estimate: the baseline scaled by the month's season.
pub fn seasonal_heuristic(month: Month) -> f64 {
    HEURISTIC_BASE_CASES * Season::of(month).heuristic_factor()
}

/// Runs a model and classifies its output
pub struct Forecaster<'a> {
    model: &'a dyn PredictionModel,
    thresholds: RiskThresholds,
}

impl<'a> Forecaster<'a> {
    pub fn new(model: &'a dyn PredictionModel, thresholds: RiskThresholds) -> Self {
        Self { model, thresholds }
    }

    /// Predict, clamp at zero and classify.
    ///
    /// A model failure yields the seasonal heuristic, flagged as a fallback
    /// with the failure as its reason.
    pub fn forecast(&self, features: &FeatureVector) -> PredictionResult {
        match self.model.predict(features) {
            Ok(raw) if raw.is_finite() => {
                let expected_cases = clamp_estimate(raw);
                PredictionResult {
                    expected_cases,
                    risk_tier: self.thresholds.classify(expected_cases),
                    origin: PredictionOrigin::Model,
                    is_fallback: false,
                    raw_output: Some(raw),
                    fallback_reason: None,
                }
            }
            Ok(_) => self.fallback(features, PredictionError::NonFiniteOutput),
            Err(e) => self.fallback(features, e),
        }
    }

    fn fallback(&self, features: &FeatureVector, error: PredictionError) -> PredictionResult {
        let month = features.month().unwrap_or_else(|| Month::wrapping(features.month_num as i64));
        let expected_cases = seasonal_heuristic(month);
        PredictionResult {
            expected_cases,
            risk_tier: self.thresholds.classify(expected_cases),
            origin: PredictionOrigin::SeasonalHeuristic,
            is_fallback: true,
            raw_output: None,
            fallback_reason: Some(error.to_string()),
        }
    }
}
