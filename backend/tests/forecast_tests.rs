//! Forecast rule tests
//!
//! Property-based and unit tests for:
//! - Seasonal synthesis keeps humidity inside [30, 100] for every month
//! - Region lookup is total over all valid coordinates
//! - Risk classification is monotonic in the estimate
//! - Lag extrapolation and moving averages

use proptest::prelude::*;
use shared::{
    classify_risk, lag_features, Month, RainfallMode, RegionCatalog, RiskThresholds, RiskTier,
    SeasonalWeatherSynthesizer, WeatherReading,
};

// ============================================================================
// Property Test Strategies
// ============================================================================

fn month_strategy() -> impl Strategy<Value = Month> {
    (1u32..=12).prop_map(|m| Month::new(m).unwrap())
}

fn raw_reading_strategy() -> impl Strategy<Value = WeatherReading> {
    (-10.0f64..45.0, 0.0f64..=100.0, 0.0f64..500.0)
        .prop_map(|(t, h, r)| WeatherReading::observed(t, h, r, "station"))
}

fn rainfall_mode_strategy() -> impl Strategy<Value = RainfallMode> {
    prop_oneof![Just(RainfallMode::Additive), Just(RainfallMode::MonthlyAverage)]
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_manila_resolves_to_ncr() {
        let catalog = RegionCatalog::builtin();
        let region = catalog.lookup_by_coordinate(14.5995, 120.9842);
        assert_eq!(region.canonical_name, "National Capital Region");
        assert_eq!(catalog.encode(region), 3);
    }

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(classify_risk(29.999), RiskTier::Low);
        assert_eq!(classify_risk(30.0), RiskTier::Medium);
        assert_eq!(classify_risk(69.999), RiskTier::Medium);
        assert_eq!(classify_risk(70.0), RiskTier::High);
    }

    #[test]
    fn test_negative_estimate_is_low() {
        assert_eq!(classify_risk(-5.2), RiskTier::Low);
    }

    #[test]
    fn test_lag_extrapolation_from_three_points() {
        let lags = lag_features(&[300.0, 250.0, 200.0]).unwrap();
        assert_eq!(lags.prev_cases[3], 237.5);
        assert_eq!(lags.prev_cases[4], 180.0);
        assert_eq!(lags.prev_cases[5], 170.0);
        assert_eq!(lags.ma_3, 250.0);
        assert!((lags.ma_6 - 222.916_666_7).abs() < 1e-6);
    }

    #[test]
    fn test_synthesis_without_reading_is_populated() {
        let synth = SeasonalWeatherSynthesizer::default();
        for m in 1..=12 {
            let reading = synth.synthesize(None, Month::new(m).unwrap());
            assert!(reading.is_synthetic);
            assert!(reading.temperature_c.is_finite());
            assert!(reading.rainfall_mm >= 0.0);
            assert!(!reading.source_label.is_empty());
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        /// Synthesized humidity never leaves [30, 100]
        #[test]
        fn prop_humidity_clamped_for_all_months(
            month in month_strategy(),
            raw in raw_reading_strategy(),
            mode in rainfall_mode_strategy(),
        ) {
            let synth = SeasonalWeatherSynthesizer::new(mode);
            let adjusted = synth.synthesize(Some(&raw), month);
            prop_assert!(adjusted.humidity_pct >= 30.0);
            prop_assert!(adjusted.humidity_pct <= 100.0);
            prop_assert!(adjusted.rainfall_mm >= 0.0);
            prop_assert!(adjusted.is_synthetic);
        }

        /// Every valid coordinate maps to a catalog region
        #[test]
        fn prop_lookup_is_total(
            lat in -90.0f64..=90.0,
            lon in -180.0f64..=180.0,
        ) {
            let catalog = RegionCatalog::builtin();
            let region = catalog.lookup_by_coordinate(lat, lon);
            prop_assert!(catalog.get(region.code).is_some());
        }

        /// A larger estimate never yields a lower tier
        #[test]
        fn prop_classification_is_monotonic(
            a in -100.0f64..500.0,
            b in -100.0f64..500.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify_risk(lo) <= classify_risk(hi));
        }

        /// Configured thresholds split the range into three ordered bands
        #[test]
        fn prop_custom_thresholds_respected(
            medium in 1.0f64..100.0,
            gap in 1.0f64..100.0,
            estimate in 0.0f64..300.0,
        ) {
            let thresholds = RiskThresholds::new(medium, medium + gap).unwrap();
            let tier = thresholds.classify(estimate);
            let expected = if estimate < medium {
                RiskTier::Low
            } else if estimate < medium + gap {
                RiskTier::Medium
            } else {
                RiskTier::High
            };
            prop_assert_eq!(tier, expected);
        }

        /// Moving averages are the means of the lag slots
        #[test]
        fn prop_moving_averages_match_lags(
            history in prop::collection::vec(0.0f64..5000.0, 0..=6),
        ) {
            let lags = lag_features(&history).unwrap();
            let ma_3 = lags.prev_cases[..3].iter().sum::<f64>() / 3.0;
            let ma_6 = lags.prev_cases.iter().sum::<f64>() / 6.0;
            prop_assert!((lags.ma_3 - ma_3).abs() < 1e-9);
            prop_assert!((lags.ma_6 - ma_6).abs() < 1e-9);
            for (i, v) in history.iter().enumerate() {
                prop_assert_eq!(lags.prev_cases[i], *v);
            }
        }
    }
}
