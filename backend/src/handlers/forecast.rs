//! HTTP handlers for prediction endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::forecast::{
    Forecast, HistoricalForecastInput, LocationForecastInput, ManualForecastInput,
};
use crate::AppState;

/// Predict from the device's (or a typed-in) location
pub async fn predict_location(
    State(state): State<AppState>,
    Json(input): Json<LocationForecastInput>,
) -> AppResult<Json<Forecast>> {
    let forecast = state.forecast.forecast_location(input).await?;
    Ok(Json(forecast))
}

/// Predict from manually entered weather and recent case counts
pub async fn predict_manual(
    State(state): State<AppState>,
    Json(input): Json<ManualForecastInput>,
) -> AppResult<Json<Forecast>> {
    let forecast = state.forecast.forecast_manual(input).await?;
    Ok(Json(forecast))
}

/// Predict for a region on a chosen date
pub async fn predict_historical(
    State(state): State<AppState>,
    Json(input): Json<HistoricalForecastInput>,
) -> AppResult<Json<Forecast>> {
    let forecast = state.forecast.forecast_historical(input).await?;
    Ok(Json(forecast))
}
