use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use vibefinder_api::{
    db::{create_pool, MemoryStore, PgStore, Store},
    services::{Geocoder, GoogleMapsGeocoder},
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vibefinder_api=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to Postgres");
            Arc::new(PgStore::new(create_pool(url).await?))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let geocoder: Option<Arc<dyn Geocoder>> = match &config.google_maps_api_key {
        Some(key) => Some(Arc::new(GoogleMapsGeocoder::new(
            key.clone(),
            config.google_maps_api_url.clone(),
        ))),
        None => {
            tracing::warn!("GOOGLE_MAPS_API_KEY not set, venue geocoding disabled");
            None
        }
    };

    let app = vibefinder_api::create_router(AppState::new(&config, store, geocoder));

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}
