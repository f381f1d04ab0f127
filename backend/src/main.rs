//! Dengue Forecast - Backend Server

use std::{net::SocketAddr, sync::Arc};

use dengue_backend::{create_app, resources::Resources, services::ForecastService, AppState, Config};
use shared::SeasonalWeatherSynthesizer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dengue_server=debug,dengue_backend=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Dengue Forecast Server");
    tracing::info!("Environment: {}", config.environment);

    // Model is required; region map and case history degrade
    let resources = Resources::load(&config)?;
    let thresholds = config.risk_thresholds()?;

    let forecast = ForecastService::new(
        Arc::new(resources.catalog),
        Arc::new(resources.model),
        thresholds,
    )
    .with_weather_client(resources.weather_client)
    .with_synthesizer(SeasonalWeatherSynthesizer::new(config.forecast.rainfall_mode))
    .with_date_range(config.date_range())
    .with_history(resources.history);

    tracing::info!("Model: {}", forecast.model_description());

    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(host, config.server.port);
    let state = AppState::new(config, forecast);

    // Build application
    let app = create_app(state);

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
