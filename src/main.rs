use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use careslot_core::{
    BookingService, CoreConfig,
    config::{booking_window_days_from_env_value, prepare_data_dir},
};

/// Main entry point for the careslot booking server
///
/// Restores booking state from the data directory and serves the REST API.
///
/// # Environment Variables
/// - `CARESLOT_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CARESLOT_DATA_DIR`: Directory for the booking snapshot (default: "booking_data")
/// - `CARESLOT_BOOKING_WINDOW_DAYS`: Default look-ahead for `GET /slots` (default: 7)
/// - `API_KEY`: When set, required in the `x-api-key` header of every route but `/health`
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the data directory cannot be created,
/// - the stored snapshot cannot be restored, or
/// - the server address cannot be bound or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("careslot=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CARESLOT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let data_dir = std::env::var("CARESLOT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(careslot_core::DEFAULT_DATA_DIR));
    prepare_data_dir(&data_dir)?;

    let window_days =
        booking_window_days_from_env_value(std::env::var("CARESLOT_BOOKING_WINDOW_DAYS").ok())?;
    let cfg = Arc::new(CoreConfig::new(Some(data_dir), window_days)?);

    let service = BookingService::open(cfg)?;
    let api_key = std::env::var("API_KEY").ok();
    if api_key.as_deref().is_none_or(str::is_empty) {
        tracing::warn!("API_KEY is not set; REST routes are open");
    }

    let app = api_rest::app(AppState::new(service, api_key));

    tracing::info!("++ Starting careslot REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("careslot stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
