//! Route definitions for the dengue forecast API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/regions", region_routes())
        .nest("/predictions", prediction_routes())
        .nest("/sessions", session_routes())
}

/// Region catalog routes
fn region_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_regions))
        .route("/lookup", get(handlers::lookup_region))
}

/// One-shot prediction routes
fn prediction_routes() -> Router<AppState> {
    Router::new()
        .route("/location", post(handlers::predict_location))
        .route("/manual", post(handlers::predict_manual))
        .route("/historical", post(handlers::predict_historical))
}

/// Session routes
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_session))
        .route(
            "/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/:id/analyze", post(handlers::analyze_session))
        .route("/:id/display", post(handlers::display_session))
        .route("/:id/reset", post(handlers::reset_session))
}
