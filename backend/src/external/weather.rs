//! Weather API client for current conditions
//!
//! Integrates with the OpenWeatherMap current-weather endpoint. Every failure
//! mode (transport, timeout, HTTP status, API error code, malformed body) is
//! reported as a [`WeatherError`]; callers treat all of them as "provider
//! unavailable" and fall back to seasonal synthesis.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use shared::{GpsCoordinates, WeatherReading};
use thiserror::Error;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Weather provider unavailable
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather API key not configured")]
    MissingApiKey,

    #[error("weather API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("weather API returned code {code}: {message}")]
    Api { code: String, message: String },

    #[error("failed to parse weather response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("weather API returned an implausible reading: {0}")]
    Implausible(String),
}

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Current conditions as returned by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub rain_1h_mm: f64,
    pub location_name: String,
}

impl From<CurrentConditions> for WeatherReading {
    fn from(c: CurrentConditions) -> Self {
        WeatherReading::observed(c.temperature_c, c.humidity_pct, c.rain_1h_mm, c.location_name)
    }
}

/// OpenWeatherMap API response for current weather
#[derive(Debug, Deserialize)]
struct OWMCurrentResponse {
    #[serde(default)]
    cod: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    main: Option<OWMMain>,
    rain: Option<OWMRain>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OWMMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OWMRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

impl WeatherClient {
    /// Create a new WeatherClient
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, WeatherError> {
        Self::with_base_url(
            api_key,
            "https://api.openweathermap.org/data/2.5".to_string(),
            timeout,
        )
    }

    /// Create a new WeatherClient with custom base URL (for testing)
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch current weather conditions by GPS coordinates.
    ///
    /// One attempt, bounded by the client timeout.
    pub async fn get_current_weather(
        &self,
        coordinates: GpsCoordinates,
    ) -> Result<CurrentConditions, WeatherError> {
        if self.api_key.is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let url = format!("{}/weather", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Status { status, body });
        }

        let body = response.bytes().await?;
        parse_current_response(&body)
    }
}

/// Decode a current-weather body, honouring the in-body `cod` status.
fn parse_current_response(body: &[u8]) -> Result<CurrentConditions, WeatherError> {
    let data: OWMCurrentResponse = serde_json::from_slice(body)?;

    if let Some(code) = data.cod.as_ref().map(code_string) {
        if code != "200" {
            return Err(WeatherError::Api {
                code,
                message: data.message.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
    }

    let main = data.main.ok_or_else(|| WeatherError::Api {
        code: "200".to_string(),
        message: "response has no 'main' block".to_string(),
    })?;

    Ok(CurrentConditions {
        temperature_c: main.temp,
        humidity_pct: main.humidity,
        rain_1h_mm: data.rain.and_then(|r| r.one_hour).unwrap_or(0.0),
        location_name: data
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown location".to_string()),
    })
}

// `cod` is a number on success and a string on most errors.
fn code_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_response() {
        let body = br#"{
            "coord": {"lon": 120.98, "lat": 14.6},
            "main": {"temp": 31.2, "feels_like": 36.0, "pressure": 1008, "humidity": 66},
            "rain": {"1h": 2.4},
            "name": "Manila",
            "cod": 200
        }"#;
        let c = parse_current_response(body).unwrap();
        assert_eq!(c.temperature_c, 31.2);
        assert_eq!(c.humidity_pct, 66.0);
        assert_eq!(c.rain_1h_mm, 2.4);
        assert_eq!(c.location_name, "Manila");
    }

    #[test]
    fn missing_rain_and_name_default() {
        let body = br#"{"main": {"temp": 27.0, "humidity": 80}, "cod": 200}"#;
        let c = parse_current_response(body).unwrap();
        assert_eq!(c.rain_1h_mm, 0.0);
        assert_eq!(c.location_name, "Unknown location");
    }

    #[test]
    fn error_code_in_body_is_unavailable() {
        let body = br#"{"cod": "401", "message": "Invalid API key"}"#;
        match parse_current_response(body) {
            Err(WeatherError::Api { code, message }) => {
                assert_eq!(code, "401");
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn malformed_body_is_decode_error() {
        assert!(matches!(
            parse_current_response(b"<html>"),
            Err(WeatherError::Decode(_))
        ));
        assert!(matches!(
            parse_current_response(br#"{"main": {"temp": "hot"}}"#),
            Err(WeatherError::Decode(_))
        ));
    }

    #[test]
    fn missing_key_short_circuits() {
        let client = WeatherClient::new(String::new(), DEFAULT_TIMEOUT).unwrap();
        let result = tokio_test::block_on(
            client.get_current_weather(GpsCoordinates::new(14.6, 121.0)),
        );
        assert!(matches!(result, Err(WeatherError::MissingApiKey)));
    }

    #[test]
    fn conditions_convert_to_observed_reading() {
        let reading: WeatherReading = CurrentConditions {
            temperature_c: 30.0,
            humidity_pct: 75.0,
            rain_1h_mm: 1.0,
            location_name: "Cebu City".into(),
        }
        .into();
        assert!(!reading.is_synthetic);
        assert_eq!(reading.source_label, "Cebu City");
    }
}
