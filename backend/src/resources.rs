//! Startup resource loading
//!
//! The model is required. The region map and the case history degrade to
//! built-in / empty data with a warning.

use std::path::Path;
use std::time::Duration;

use shared::RegionCatalog;

use crate::config::{Config, HistoryConfig, ModelConfig, RegionsConfig, WeatherConfig};
use crate::error::AppError;
use crate::external::{WeatherClient, XgbModel};
use crate::services::CaseHistoryStore;

pub fn load_region_catalog(config: &RegionsConfig) -> RegionCatalog {
    let path = Path::new(&config.map_path);
    let catalog = match std::fs::read_to_string(path) {
        Ok(json) => match RegionCatalog::from_json_str(&json) {
            Ok(catalog) => {
                tracing::info!("Loaded {} regions from {}", catalog.len(), path.display());
                catalog
            }
            Err(e) => {
                tracing::warn!(
                    "Region map {} is unreadable ({}); using built-in regions",
                    path.display(),
                    e
                );
                RegionCatalog::builtin()
            }
        },
        Err(e) => {
            tracing::warn!(
                "Region map {} not loaded ({}); using built-in regions",
                path.display(),
                e
            );
            RegionCatalog::builtin()
        }
    };

    match config.default_code {
        Some(code) => catalog.with_default_code(code),
        None => catalog,
    }
}

pub fn load_model(config: &ModelConfig) -> Result<XgbModel, AppError> {
    let model = XgbModel::load(&config.path)
        .map_err(|e| AppError::ResourceMissing(format!("forecast model ({})", e)))?;
    tracing::info!(
        "Loaded model from {}: {} trees, {} features",
        config.path,
        model.n_trees(),
        model.num_features()
    );
    Ok(model)
}

pub fn load_case_history(config: &HistoryConfig) -> CaseHistoryStore {
    match CaseHistoryStore::load(&config.csv_path) {
        Ok(store) => {
            tracing::info!("Loaded {} case history rows from {}", store.len(), config.csv_path);
            store
        }
        Err(e) => {
            tracing::warn!("Case history unavailable ({}); recorded lookups return nothing", e);
            CaseHistoryStore::empty()
        }
    }
}

/// `None` when no API key is configured; forecasts then use seasonal data.
pub fn build_weather_client(config: &WeatherConfig) -> Result<Option<WeatherClient>, AppError> {
    if config.api_key.trim().is_empty() {
        tracing::warn!("No weather API key configured; weather will be synthesized");
        return Ok(None);
    }
    let client = WeatherClient::with_base_url(
        config.api_key.clone(),
        config.api_endpoint.clone(),
        Duration::from_secs(config.timeout_secs),
    )
    .map_err(|e| AppError::Configuration(e.to_string()))?;
    Ok(Some(client))
}

/// Everything the forecast service needs, or the first fatal failure.
pub struct Resources {
    pub catalog: RegionCatalog,
    pub model: XgbModel,
    pub history: CaseHistoryStore,
    pub weather_client: Option<WeatherClient>,
}

impl Resources {
    pub fn load(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            catalog: load_region_catalog(&config.regions),
            model: load_model(&config.model)?,
            history: load_case_history(&config.history),
            weather_client: build_weather_client(&config.weather)?,
        })
    }
}
