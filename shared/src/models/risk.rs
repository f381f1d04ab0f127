//! Dengue risk tiers

use serde::{Deserialize, Serialize};

/// Ordinal risk bucket for an expected case count
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "Low"),
            RiskTier::Medium => write!(f, "Medium"),
            RiskTier::High => write!(f, "High"),
        }
    }
}

/// Tier boundaries; each is the inclusive lower bound of its tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
}

impl RiskThresholds {
    pub const DEFAULT: RiskThresholds = RiskThresholds {
        medium: 30.0,
        high: 70.0,
    };

    /// Thresholds must be finite, non-negative and strictly increasing.
    pub fn new(medium: f64, high: f64) -> Result<Self, &'static str> {
        if !medium.is_finite() || !high.is_finite() {
            return Err("Risk thresholds must be finite");
        }
        if medium < 0.0 {
            return Err("Risk thresholds cannot be negative");
        }
        if medium >= high {
            return Err("Medium threshold must be below high threshold");
        }
        Ok(Self { medium, high })
    }

    /// `[0, medium)` Low, `[medium, high)` Medium, `[high, ∞)` High.
    pub fn classify(&self, expected_cases: f64) -> RiskTier {
        let cases = clamp_estimate(expected_cases);
        if cases >= self.high {
            RiskTier::High
        } else if cases >= self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Classify with the default thresholds.
pub fn classify_risk(expected_cases: f64) -> RiskTier {
    RiskThresholds::DEFAULT.classify(expected_cases)
}

/// Model outputs can dip slightly below zero; case counts cannot.
pub fn clamp_estimate(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.max(0.0)
    }
}

/// Public-health guidance shown with a risk tier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Advisory {
    pub headline: String,
    pub actions: Vec<String>,
    pub watch_for: String,
}

impl RiskTier {
    pub fn advisory(self) -> Advisory {
        match self {
            RiskTier::Low => build_advisory(
                "Low risk area",
                &[
                    "Keep containers free of stagnant water",
                    "Use mosquito repellent outdoors, especially at dawn and dusk",
                    "Install screens on windows and doors",
                    "Wear long sleeves and pants when possible",
                    "Check regularly for breeding sites around your home",
                ],
                "Risk can change with the weather, stay vigilant",
            ),
            RiskTier::Medium => build_advisory(
                "Medium risk area, stay alert",
                &[
                    "Eliminate all stagnant water sources",
                    "Sleep under mosquito nets",
                    "Apply insect repellent daily",
                    "Report suspected cases to local health authorities",
                    "Organize a community cleanup of breeding grounds",
                ],
                "Fever, headache, muscle or joint pain, rash",
            ),
            RiskTier::High => build_advisory(
                "High risk area, act now",
                &[
                    "Seek medical advice immediately if fever develops",
                    "Request fogging or misting in the area",
                    "Avoid outdoor activity at dawn and dusk",
                    "Use mosquito nets day and night",
                    "Keep the local health center hotline at hand",
                    "Isolate suspected cases to prevent spread",
                ],
                "Severe abdominal pain, persistent vomiting, bleeding, difficulty breathing",
            ),
        }
    }
}

fn build_advisory(headline: &str, actions: &[&str], watch_for: &str) -> Advisory {
    Advisory {
        headline: headline.to_string(),
        actions: actions.iter().map(|a| a.to_string()).collect(),
        watch_for: watch_for.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive_lower() {
        assert_eq!(classify_risk(29.999), RiskTier::Low);
        assert_eq!(classify_risk(30.0), RiskTier::Medium);
        assert_eq!(classify_risk(69.999), RiskTier::Medium);
        assert_eq!(classify_risk(70.0), RiskTier::High);
    }

    #[test]
    fn negative_output_clamps_to_low() {
        assert_eq!(clamp_estimate(-5.2), 0.0);
        assert_eq!(classify_risk(-5.2), RiskTier::Low);
        assert_eq!(clamp_estimate(f64::NAN), 0.0);
    }

    #[test]
    fn custom_thresholds() {
        let t = RiskThresholds::new(10.0, 20.0).unwrap();
        assert_eq!(t.classify(15.0), RiskTier::Medium);
        assert_eq!(t.classify(20.0), RiskTier::High);
        assert!(RiskThresholds::new(50.0, 50.0).is_err());
        assert!(RiskThresholds::new(-1.0, 50.0).is_err());
    }

    #[test]
    fn advisories_differ_per_tier() {
        assert_eq!(RiskTier::High.advisory().actions.len(), 6);
        assert_ne!(RiskTier::Low.advisory(), RiskTier::Medium.advisory());
    }
}
