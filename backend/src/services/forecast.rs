//! Forecast service
//!
//! Runs the location, manual and historical flows: resolve where and when,
//! obtain weather (live or synthesized), build features, evaluate the model
//! and classify. Every approximation made along the way is disclosed in the
//! forecast's `notes`.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    is_in_philippines, parse_case_history, validate_coordinates, validate_region_code,
    validate_target_date, validate_weather, Advisory, DateRange, FeatureBuilder, FeatureError,
    FeatureVector, Forecaster, GpsCoordinates, LocationSource, Month, PredictionModel,
    PredictionResult, Region, RegionCatalog, RiskThresholds, Season, SeasonalWeatherSynthesizer,
    WeatherReading, MAX_LAGS,
};

use crate::error::{AppError, AppResult};
use crate::external::weather::{WeatherClient, WeatherError};
use crate::services::history::CaseHistoryStore;

/// Where a forecast is for
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub region: Region,
    pub coordinates: GpsCoordinates,
    pub source: LocationSource,
}

/// When a forecast is for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub month: Month,
    /// Explicitly requested date; `None` means "now"
    pub date: Option<NaiveDate>,
}

/// Input for the location flow
#[derive(Debug, Clone, Deserialize)]
pub struct LocationForecastInput {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub source: LocationSource,
}

/// Weather typed in by the user
#[derive(Debug, Clone, Deserialize)]
pub struct ManualWeatherInput {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub rainfall_mm: f64,
}

/// A case count as entered: a number or free text such as `"1,250"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CaseCountInput {
    Count(f64),
    Text(String),
}

impl CaseCountInput {
    pub fn as_text(&self) -> String {
        match self {
            CaseCountInput::Count(v) => v.to_string(),
            CaseCountInput::Text(s) => s.clone(),
        }
    }
}

/// Input for the manual flow
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManualForecastInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region_code: Option<i32>,
    /// Target month; defaults to the current month
    pub month: Option<u32>,
    pub weather: Option<ManualWeatherInput>,
    /// Monthly counts, most recent first
    #[serde(default)]
    pub recent_cases: Vec<CaseCountInput>,
    /// Look the history up in the recorded case data when none is supplied
    #[serde(default)]
    pub use_recorded_history: bool,
}

/// Input for the historical flow
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalForecastInput {
    pub region_code: i32,
    pub date: NaiveDate,
}

/// A completed forecast
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub region: Region,
    pub coordinates: GpsCoordinates,
    pub source: LocationSource,
    pub month: Month,
    pub month_name: String,
    pub season: Season,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    pub weather: WeatherReading,
    pub features: FeatureVector,
    pub prediction: PredictionResult,
    pub advisory: Advisory,
    pub notes: Vec<String>,
}

/// Forecast service holding the startup-loaded resources
pub struct ForecastService {
    catalog: Arc<RegionCatalog>,
    model: Arc<dyn PredictionModel>,
    weather_client: Option<WeatherClient>,
    synthesizer: SeasonalWeatherSynthesizer,
    thresholds: RiskThresholds,
    date_range: DateRange,
    history: CaseHistoryStore,
}

impl ForecastService {
    /// Create a new ForecastService with no live weather and no case history
    pub fn new(
        catalog: Arc<RegionCatalog>,
        model: Arc<dyn PredictionModel>,
        thresholds: RiskThresholds,
    ) -> Self {
        Self {
            catalog,
            model,
            weather_client: None,
            synthesizer: SeasonalWeatherSynthesizer::default(),
            thresholds,
            date_range: DateRange::default(),
            history: CaseHistoryStore::empty(),
        }
    }

    pub fn with_weather_client(mut self, client: Option<WeatherClient>) -> Self {
        self.weather_client = client;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: SeasonalWeatherSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_history(mut self, history: CaseHistoryStore) -> Self {
        self.history = history;
        self
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    pub fn model_description(&self) -> String {
        self.model.describe()
    }

    pub fn has_live_weather(&self) -> bool {
        self.weather_client.is_some()
    }

    pub fn history(&self) -> &CaseHistoryStore {
        &self.history
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    // ========================================================================
    // Flows
    // ========================================================================

    /// Coordinates, live weather, basic features.
    pub async fn forecast_location(&self, input: LocationForecastInput) -> AppResult<Forecast> {
        let mut notes = Vec::new();
        let mut placement = self.place(Some(input.latitude), Some(input.longitude), None, &mut notes)?;
        placement.source = input.source;
        let target = self.target(None)?;

        tracing::debug!(
            region = %placement.region.canonical_name,
            month = target.month.number(),
            "location forecast"
        );

        let weather = self.weather_for(placement.coordinates, target, &mut notes).await;
        let (features, prediction) =
            self.predict(&placement.region, target.month, &weather, None, &mut notes)?;
        Ok(assemble(placement, target, weather, features, prediction, notes))
    }

    /// Coordinates or region, optional manual weather, lagged features.
    pub async fn forecast_manual(&self, input: ManualForecastInput) -> AppResult<Forecast> {
        let mut notes = Vec::new();
        let placement = self.place(input.latitude, input.longitude, input.region_code, &mut notes)?;

        let target = match input.month {
            Some(m) => Target {
                month: Month::new(m).ok_or_else(|| {
                    FeatureError::new("month_num", format!("{} is not in 1..=12", m))
                })?,
                date: None,
            },
            None => self.target(None)?,
        };

        let weather = match input.weather {
            Some(w) => {
                let reading =
                    WeatherReading::observed(w.temperature_c, w.humidity_pct, w.rainfall_mm, "Manual entry");
                validate_weather(&reading).map_err(|m| AppError::validation("weather", m))?;
                reading
            }
            None => self.weather_for(placement.coordinates, target, &mut notes).await,
        };

        let history = if !input.recent_cases.is_empty() {
            let raw: Vec<String> = input.recent_cases.iter().map(CaseCountInput::as_text).collect();
            parse_case_history(&raw)?
        } else if input.use_recorded_history {
            let year = target.date.unwrap_or_else(today).year();
            let recorded = self.history.recent(&placement.region, year, target.month);
            if recorded.is_empty() {
                notes.push(format!(
                    "No recorded case history for {}; recent cases treated as zero",
                    placement.region.display_name
                ));
            } else {
                notes.push(format!(
                    "Recent cases taken from recorded data ({} months)",
                    recorded.len()
                ));
            }
            recorded
        } else {
            notes.push("No recent case history supplied; recent cases treated as zero".to_string());
            Vec::new()
        };

        let (features, prediction) = self.predict(
            &placement.region,
            target.month,
            &weather,
            Some(&history),
            &mut notes,
        )?;
        Ok(assemble(placement, target, weather, features, prediction, notes))
    }

    /// Region and date, current weather shifted to the target month.
    pub async fn forecast_historical(&self, input: HistoricalForecastInput) -> AppResult<Forecast> {
        let mut notes = Vec::new();
        let placement = self.place(None, None, Some(input.region_code), &mut notes)?;
        let target = self.target(Some(input.date))?;

        let weather = self.weather_for(placement.coordinates, target, &mut notes).await;
        let (features, prediction) =
            self.predict(&placement.region, target.month, &weather, None, &mut notes)?;
        Ok(assemble(placement, target, weather, features, prediction, notes))
    }

    // ========================================================================
    // Steps
    // ========================================================================

    /// Resolve a region and the coordinate to fetch weather for.
    ///
    /// A region code wins over coordinates for the region; coordinates, when
    /// given, are still used for weather.
    pub fn place(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
        region_code: Option<i32>,
        notes: &mut Vec<String>,
    ) -> AppResult<Placement> {
        let coordinates = match (latitude, longitude) {
            (Some(lat), Some(lon)) => {
                let c = GpsCoordinates::new(lat, lon);
                validate_coordinates(&c).map_err(|m| AppError::validation("coordinates", m))?;
                Some(c)
            }
            (Some(_), None) => {
                return Err(AppError::validation("longitude", "longitude is required with latitude"))
            }
            (None, Some(_)) => {
                return Err(AppError::validation("latitude", "latitude is required with longitude"))
            }
            (None, None) => None,
        };

        if let Some(code) = region_code {
            validate_region_code(&self.catalog, code)
                .map_err(|m| AppError::validation("region_code", m))?;
            let region = self
                .catalog
                .get(code)
                .cloned()
                .ok_or_else(|| AppError::validation("region_code", "unknown region code"))?;
            return Ok(match coordinates {
                Some(c) => Placement {
                    region,
                    coordinates: c,
                    source: LocationSource::Manual,
                },
                None => Placement {
                    coordinates: region.coordinates,
                    region,
                    source: LocationSource::Region,
                },
            });
        }

        let coordinates = coordinates.ok_or_else(|| {
            AppError::validation("location", "provide coordinates or a region code")
        })?;
        Ok(Placement {
            region: self.locate(coordinates, notes),
            coordinates,
            source: LocationSource::Manual,
        })
    }

    /// Region for a validated coordinate.
    pub fn locate(&self, coordinates: GpsCoordinates, notes: &mut Vec<String>) -> Region {
        let region = self
            .catalog
            .lookup_by_coordinate(coordinates.latitude, coordinates.longitude)
            .clone();
        if !is_in_philippines(&coordinates) {
            notes.push(format!(
                "Location is outside the Philippines; using {}",
                region.display_name
            ));
        }
        region
    }

    /// Current month, or the month of a date inside the configured range.
    pub fn target(&self, date: Option<NaiveDate>) -> AppResult<Target> {
        match date {
            Some(d) => {
                validate_target_date(d, &self.date_range)
                    .map_err(|m| AppError::validation("date", m))?;
                Ok(Target {
                    month: Month::of(d),
                    date: Some(d),
                })
            }
            None => Ok(Target {
                month: Month::of(today()),
                date: None,
            }),
        }
    }

    /// Weather for `coordinates` in the target month. Never fails.
    ///
    /// Live conditions are used as-is for the current month and shifted by
    /// the seasonal tables otherwise. When the provider is unavailable the
    /// month's averages are used.
    pub async fn weather_for(
        &self,
        coordinates: GpsCoordinates,
        target: Target,
        notes: &mut Vec<String>,
    ) -> WeatherReading {
        let adjust = target.date.is_some() || target.month != Month::of(today());

        match self.live_weather(coordinates).await {
            Ok(reading) if !adjust => reading,
            Ok(reading) => {
                notes.push(format!(
                    "Weather adjusted from current conditions to the {} seasonal pattern",
                    target.month
                ));
                self.synthesizer.synthesize(Some(&reading), target.month)
            }
            Err(e) => {
                tracing::warn!("Live weather unavailable, synthesizing: {}", e);
                notes.push(format!(
                    "Live weather unavailable; using {} averages",
                    target.month
                ));
                self.synthesizer.synthesize(None, target.month)
            }
        }
    }

    async fn live_weather(&self, coordinates: GpsCoordinates) -> Result<WeatherReading, WeatherError> {
        let client = self.weather_client.as_ref().ok_or(WeatherError::MissingApiKey)?;
        let reading: WeatherReading = client.get_current_weather(coordinates).await?.into();
        validate_weather(&reading).map_err(|m| WeatherError::Implausible(m.to_string()))?;
        Ok(reading)
    }

    /// Build features, evaluate the model and classify.
    ///
    /// `history` selects the lagged feature set. A model failure is not an
    /// error: the seasonal estimate is returned and noted instead.
    pub fn predict(
        &self,
        region: &Region,
        month: Month,
        weather: &WeatherReading,
        history: Option<&[f64]>,
        notes: &mut Vec<String>,
    ) -> AppResult<(FeatureVector, PredictionResult)> {
        let builder = FeatureBuilder::new(&self.catalog);
        let features = match history {
            Some(h) => {
                let features = builder.build_lagged(region, month.number(), weather, h)?;
                if !h.is_empty() && h.len() < MAX_LAGS {
                    notes.push(format!(
                        "Case history covers {} of {} months; older months are approximated",
                        h.len(),
                        MAX_LAGS
                    ));
                }
                features
            }
            None => builder.build_basic(region, month.number(), weather)?,
        };

        let prediction = Forecaster::new(self.model.as_ref(), self.thresholds).forecast(&features);
        if let Some(reason) = prediction.fallback_reason.as_deref() {
            tracing::warn!("Model evaluation failed, using seasonal estimate: {}", reason);
            notes.push(format!(
                "Model could not be evaluated ({}); showing the seasonal estimate",
                reason
            ));
        }

        Ok((features, prediction))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn assemble(
    placement: Placement,
    target: Target,
    weather: WeatherReading,
    features: FeatureVector,
    prediction: PredictionResult,
    notes: Vec<String>,
) -> Forecast {
    Forecast {
        region: placement.region,
        coordinates: placement.coordinates,
        source: placement.source,
        month: target.month,
        month_name: target.month.name().to_string(),
        season: Season::of(target.month),
        target_date: target.date,
        weather,
        features,
        advisory: prediction.risk_tier.advisory(),
        prediction,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{PredictionError, PredictionOrigin, RiskTier};

    struct Fixed(f64);

    impl PredictionModel for Fixed {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
            Ok(self.0)
        }
    }

    struct Failing;

    impl PredictionModel for Failing {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, PredictionError> {
            Err(PredictionError::FeatureCount {
                expected: 13,
                actual: 5,
            })
        }
    }

    fn service(model: Arc<dyn PredictionModel>) -> ForecastService {
        ForecastService::new(
            Arc::new(RegionCatalog::builtin()),
            model,
            RiskThresholds::DEFAULT,
        )
    }

    #[test]
    fn place_prefers_region_code() {
        let svc = service(Arc::new(Fixed(10.0)));
        let mut notes = Vec::new();
        let p = svc.place(None, None, Some(11), &mut notes).unwrap();
        assert_eq!(p.region.canonical_name, "Region VI");
        assert_eq!(p.source, LocationSource::Region);
        assert_eq!(p.coordinates, p.region.coordinates);
    }

    #[test]
    fn place_requires_both_coordinates() {
        let svc = service(Arc::new(Fixed(10.0)));
        let mut notes = Vec::new();
        assert!(matches!(
            svc.place(Some(14.6), None, None, &mut notes),
            Err(AppError::Validation { field, .. }) if field == "longitude"
        ));
        assert!(matches!(
            svc.place(None, None, None, &mut notes),
            Err(AppError::Validation { field, .. }) if field == "location"
        ));
        assert!(matches!(
            svc.place(Some(95.0), Some(121.0), None, &mut notes),
            Err(AppError::Validation { field, .. }) if field == "coordinates"
        ));
    }

    #[test]
    fn foreign_coordinates_are_noted() {
        let svc = service(Arc::new(Fixed(10.0)));
        let mut notes = Vec::new();
        let region = svc.locate(GpsCoordinates::new(51.5, -0.12), &mut notes);
        assert_eq!(region.code, svc.catalog().default_region().code);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn target_rejects_dates_outside_range() {
        let svc = service(Arc::new(Fixed(10.0)));
        let inside = NaiveDate::from_ymd_opt(2023, 7, 15).unwrap();
        assert_eq!(svc.target(Some(inside)).unwrap().month.number(), 7);
        let outside = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
        assert!(matches!(
            svc.target(Some(outside)),
            Err(AppError::Validation { field, .. }) if field == "date"
        ));
    }

    #[tokio::test]
    async fn weather_without_provider_is_synthetic() {
        let svc = service(Arc::new(Fixed(10.0)));
        let mut notes = Vec::new();
        let target = Target {
            month: Month::new(8).unwrap(),
            date: None,
        };
        let reading = svc
            .weather_for(GpsCoordinates::new(14.6, 121.0), target, &mut notes)
            .await;
        assert!(reading.is_synthetic);
        assert!((30.0..=100.0).contains(&reading.humidity_pct));
        assert!(reading.rainfall_mm >= 0.0);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn negative_output_clamps_to_low() {
        let svc = service(Arc::new(Fixed(-5.2)));
        let catalog = RegionCatalog::builtin();
        let region = catalog.resolve_name("National Capital Region");
        let weather = WeatherReading::observed(29.0, 70.0, 3.0, "test");
        let mut notes = Vec::new();
        let (_, result) = svc
            .predict(region, Month::new(3).unwrap(), &weather, None, &mut notes)
            .unwrap();
        assert_eq!(result.expected_cases, 0.0);
        assert_eq!(result.risk_tier, RiskTier::Low);
        assert!(notes.is_empty());
    }

    #[test]
    fn model_failure_falls_back_with_note() {
        let svc = service(Arc::new(Failing));
        let catalog = RegionCatalog::builtin();
        let region = catalog.resolve_name("Region X");
        let weather = WeatherReading::observed(28.0, 82.0, 12.0, "test");
        let mut notes = Vec::new();
        let (_, result) = svc
            .predict(region, Month::new(7).unwrap(), &weather, None, &mut notes)
            .unwrap();
        assert!(result.is_fallback);
        assert_eq!(result.origin, PredictionOrigin::SeasonalHeuristic);
        assert!((result.expected_cases - 58.5).abs() < 1e-9);
        assert_eq!(result.risk_tier, RiskTier::Medium);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn invalid_weather_is_a_feature_error() {
        let svc = service(Arc::new(Fixed(10.0)));
        let catalog = RegionCatalog::builtin();
        let region = catalog.default_region();
        let weather = WeatherReading::observed(28.0, 120.0, 12.0, "test");
        let mut notes = Vec::new();
        assert!(matches!(
            svc.predict(region, Month::new(7).unwrap(), &weather, None, &mut notes),
            Err(AppError::FeatureConstruction(e)) if e.field == "humidity"
        ));
    }

    #[tokio::test]
    async fn manual_flow_uses_supplied_history() {
        let svc = service(Arc::new(Fixed(120.0)));
        let input = ManualForecastInput {
            region_code: Some(3),
            month: Some(8),
            weather: Some(ManualWeatherInput {
                temperature_c: 28.0,
                humidity_pct: 85.0,
                rainfall_mm: 20.0,
            }),
            recent_cases: vec![
                CaseCountInput::Count(300.0),
                CaseCountInput::Text("250".into()),
                CaseCountInput::Text("200".into()),
            ],
            ..Default::default()
        };
        let forecast = svc.forecast_manual(input).await.unwrap();
        let lags = forecast.features.lags.unwrap();
        assert_eq!(lags.prev_cases[3], 237.5);
        assert_eq!(lags.ma_3, 250.0);
        assert!(!forecast.weather.is_synthetic);
        assert_eq!(forecast.prediction.risk_tier, RiskTier::High);
        assert_eq!(forecast.season, Season::Wet);
    }

    #[tokio::test]
    async fn manual_flow_reports_bad_case_entry() {
        let svc = service(Arc::new(Fixed(10.0)));
        let input = ManualForecastInput {
            region_code: Some(3),
            recent_cases: vec![CaseCountInput::Count(10.0), CaseCountInput::Text("lots".into())],
            ..Default::default()
        };
        assert!(matches!(
            svc.forecast_manual(input).await,
            Err(AppError::FeatureConstruction(e)) if e.field == "prev_cases_2"
        ));
    }

    #[tokio::test]
    async fn manual_flow_rejects_bad_month() {
        let svc = service(Arc::new(Fixed(10.0)));
        let input = ManualForecastInput {
            region_code: Some(3),
            month: Some(13),
            ..Default::default()
        };
        assert!(matches!(
            svc.forecast_manual(input).await,
            Err(AppError::FeatureConstruction(e)) if e.field == "month_num"
        ));
    }

    #[tokio::test]
    async fn manual_flow_reads_recorded_history() {
        let mut history = CaseHistoryStore::empty();
        let year = today().year();
        history.insert("Region VII", year - 1, 12, 90.0);
        history.insert("Region VII", year - 1, 11, 60.0);
        let svc = service(Arc::new(Fixed(10.0))).with_history(history);
        let input = ManualForecastInput {
            region_code: Some(12),
            month: Some(1),
            use_recorded_history: true,
            ..Default::default()
        };
        let forecast = svc.forecast_manual(input).await.unwrap();
        let lags = forecast.features.lags.unwrap();
        assert_eq!(lags.observed_lags, 2);
        assert_eq!(lags.prev_cases[0], 90.0);
        assert_eq!(lags.prev_cases[1], 60.0);
    }

    #[tokio::test]
    async fn historical_flow_synthesizes_for_target_month() {
        let svc = service(Arc::new(Fixed(40.0)));
        let input = HistoricalForecastInput {
            region_code: 14,
            date: NaiveDate::from_ymd_opt(2022, 8, 1).unwrap(),
        };
        let forecast = svc.forecast_historical(input).await.unwrap();
        assert_eq!(forecast.month.number(), 8);
        assert!(forecast.weather.is_synthetic);
        assert_eq!(forecast.features.region_encoded, 14);
        assert_eq!(forecast.prediction.risk_tier, RiskTier::Medium);
        assert_eq!(forecast.advisory, RiskTier::Medium.advisory());
        assert_eq!(forecast.target_date, NaiveDate::from_ymd_opt(2022, 8, 1));
    }

    #[tokio::test]
    async fn historical_flow_rejects_unknown_region() {
        let svc = service(Arc::new(Fixed(40.0)));
        let input = HistoricalForecastInput {
            region_code: 99,
            date: NaiveDate::from_ymd_opt(2022, 8, 1).unwrap(),
        };
        assert!(matches!(
            svc.forecast_historical(input).await,
            Err(AppError::Validation { field, .. }) if field == "region_code"
        ));
    }
}
