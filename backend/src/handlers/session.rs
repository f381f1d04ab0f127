//! HTTP handlers for forecast sessions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::{Advisory, SessionContext};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::session::AnalyzeInput;
use crate::AppState;

/// Start a new session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionContext>) {
    let session = state.sessions.create().await;
    (StatusCode::CREATED, Json(session))
}

/// Get a session by ID
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionContext>> {
    let session = state.sessions.get(session_id).await?;
    Ok(Json(session))
}

/// Collect input, fetch weather and predict
pub async fn analyze_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(input): Json<AnalyzeInput>,
) -> AppResult<Json<SessionContext>> {
    let session = state
        .sessions
        .analyze(&state.forecast, session_id, input)
        .await?;
    Ok(Json(session))
}

#[derive(Debug, Serialize)]
pub struct DisplayResponse {
    pub session: SessionContext,
    pub advisory: Advisory,
}

/// Mark the result as shown and return its advisory
pub async fn display_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<DisplayResponse>> {
    let (session, advisory) = state.sessions.display(session_id).await?;
    Ok(Json(DisplayResponse { session, advisory }))
}

/// Discard collected data and start over
pub async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionContext>> {
    let session = state.sessions.reset(session_id).await?;
    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.sessions.remove(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
