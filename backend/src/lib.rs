//! Dengue Forecast - Backend Library
//!
//! Estimates monthly dengue cases and a risk tier for a location in the
//! Philippines from current weather and a pre-trained tree-ensemble model.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod resources;
pub mod routes;
pub mod services;

pub use config::Config;

use services::{ForecastService, SessionStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forecast: Arc<ForecastService>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, forecast: ForecastService) -> Self {
        let sessions = SessionStore::with_idle_timeout(config.session_idle_timeout());
        Self {
            config: Arc::new(config),
            forecast: Arc::new(forecast),
            sessions,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Dengue Forecast API v1.0"
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
