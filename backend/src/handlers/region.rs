//! HTTP handlers for region endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{is_in_philippines, validate_coordinates, GpsCoordinates, Region};

use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RegionListResponse {
    pub default_code: i32,
    pub regions: Vec<Region>,
}

/// List all regions
pub async fn list_regions(State(state): State<AppState>) -> Json<RegionListResponse> {
    let catalog = state.forecast.catalog();
    Json(RegionListResponse {
        default_code: catalog.default_region().code,
        regions: catalog.all().to_vec(),
    })
}

/// Query parameters for region lookup
#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct RegionLookupResponse {
    pub region: Region,
    pub in_philippines: bool,
    pub notes: Vec<String>,
}

/// Resolve the region for a coordinate
pub async fn lookup_region(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> AppResult<Json<RegionLookupResponse>> {
    let coordinates = GpsCoordinates::new(query.latitude, query.longitude);
    validate_coordinates(&coordinates).map_err(|m| AppError::validation("coordinates", m))?;

    let mut notes = Vec::new();
    let region = state.forecast.locate(coordinates, &mut notes);
    Ok(Json(RegionLookupResponse {
        region,
        in_philippines: is_in_philippines(&coordinates),
        notes,
    }))
}
