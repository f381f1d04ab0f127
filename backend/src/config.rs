//! Configuration management for the dengue forecast server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with DENGUE_ prefix

use std::time::Duration;

use chrono::NaiveDate;
use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{DateRange, RainfallMode, RiskThresholds};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Weather API configuration
    pub weather: WeatherConfig,

    /// Forecast model artifact
    pub model: ModelConfig,

    /// Region map
    pub regions: RegionsConfig,

    /// Historical case counts
    pub history: HistoryConfig,

    /// Risk tier thresholds
    pub risk: RiskConfig,

    /// Forecast behaviour
    pub forecast: ForecastConfig,

    /// Session lifetime
    pub sessions: SessionsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Weather API endpoint
    pub api_endpoint: String,

    /// Weather API key; empty disables live weather
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Path to the XGBoost JSON model
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegionsConfig {
    /// Path to the `{"code": "name"}` region map
    pub map_path: String,

    /// Region used when a location matches nothing; defaults to the first entry
    pub default_code: Option<i32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    /// CSV with `region,year,month,cases` rows
    pub csv_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RiskConfig {
    /// Lowest case count classified Medium
    pub medium: f64,

    /// Lowest case count classified High
    pub high: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    /// Earliest date accepted by the historical flow
    pub start_date: NaiveDate,

    /// Latest date accepted by the historical flow
    pub end_date: NaiveDate,

    /// How synthesized rainfall is derived
    pub rainfall_mode: RainfallMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionsConfig {
    /// Seconds without a transition before a session is dropped
    pub idle_timeout_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("DENGUE_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("weather.api_endpoint", "https://api.openweathermap.org/data/2.5")?
            .set_default("weather.api_key", "")?
            .set_default("weather.timeout_secs", 10)?
            .set_default("model.path", "dengue_xgb_model.json")?
            .set_default("regions.map_path", "region_map.json")?
            .set_default("history.csv_path", "dengue_cases.csv")?
            .set_default("risk.medium", 30.0)?
            .set_default("risk.high", 70.0)?
            .set_default("forecast.start_date", "2020-01-01")?
            .set_default("forecast.end_date", "2025-12-31")?
            .set_default("forecast.rainfall_mode", "additive")?
            .set_default("sessions.idle_timeout_secs", 1800)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (DENGUE_ prefix)
            .add_source(
                Environment::with_prefix("DENGUE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.risk_thresholds()?;
        if self.forecast.start_date > self.forecast.end_date {
            return Err(ConfigError::Message(
                "forecast.start_date must not be after forecast.end_date".to_string(),
            ));
        }
        if self.sessions.idle_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "sessions.idle_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.sessions.idle_timeout_secs)
    }

    pub fn risk_thresholds(&self) -> Result<RiskThresholds, ConfigError> {
        RiskThresholds::new(self.risk.medium, self.risk.high)
            .map_err(|e| ConfigError::Message(e.to_string()))
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.forecast.start_date,
            end: self.forecast.end_date,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let range = DateRange::default();
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            weather: WeatherConfig {
                api_endpoint: "https://api.openweathermap.org/data/2.5".to_string(),
                api_key: String::new(),
                timeout_secs: 10,
            },
            model: ModelConfig {
                path: "dengue_xgb_model.json".to_string(),
            },
            regions: RegionsConfig {
                map_path: "region_map.json".to_string(),
                default_code: None,
            },
            history: HistoryConfig {
                csv_path: "dengue_cases.csv".to_string(),
            },
            risk: RiskConfig {
                medium: RiskThresholds::DEFAULT.medium,
                high: RiskThresholds::DEFAULT.high,
            },
            forecast: ForecastConfig {
                start_date: range.start,
                end_date: range.end,
                rainfall_mode: RainfallMode::default(),
            },
            sessions: SessionsConfig {
                idle_timeout_secs: 1800,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.risk_thresholds().unwrap(), RiskThresholds::DEFAULT);
        assert_eq!(config.date_range(), DateRange::default());
        assert_eq!(config.session_idle_timeout(), Duration::from_secs(1800));
    }

    #[test]
    fn inverted_settings_are_rejected() {
        let mut config = Config::default();
        config.risk.medium = 80.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.forecast.start_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sessions.idle_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
