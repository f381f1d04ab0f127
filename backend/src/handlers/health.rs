//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub regions: usize,
    pub live_weather: bool,
    pub case_history_rows: usize,
    pub active_sessions: usize,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.forecast.model_description(),
        regions: state.forecast.catalog().len(),
        live_weather: state.forecast.has_live_weather(),
        case_history_rows: state.forecast.history().len(),
        active_sessions: state.sessions.len().await,
    })
}
