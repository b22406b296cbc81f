//! station-relay server entry point.
//!
//! Starts the Axum HTTP server with the device/viewer WebSocket relay and
//! the REST introspection endpoints.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use station_relay::app_state::AppState;
use station_relay::build_app;
use station_relay::config::RelayConfig;
use station_relay::domain::EventBus;
use station_relay::domain::event_bus::spawn_event_logger;
use station_relay::service::RelayService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Arc::new(RelayConfig::from_env()?);
    tracing::info!(
        addr = %config.listen_addr,
        device_path = %format!("/{}/<id>", config.device_path_prefix),
        viewer_path = %config.viewer_path,
        "starting station-relay"
    );

    // Build relay context
    let event_bus = EventBus::new(config.event_bus_capacity);
    let _event_logger = spawn_event_logger(&event_bus);
    let relay = Arc::new(RelayService::new(&config, event_bus));

    let app = build_app(AppState {
        relay,
        config: Arc::clone(&config),
    });

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
