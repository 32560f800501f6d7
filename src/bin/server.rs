//! Fishcast Server - HTTP forecast service
//!
//! Loads every configured species model once, then serves forecasts and
//! the prediction history over HTTP.
//!
//! # Usage
//! ```sh
//! MODELS_DIR=models DATABASE_URL=sqlite://data/fishcast.db cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `HOST` / `PORT` - Bind address (default: 0.0.0.0:8000)
//! - `DATABASE_URL` - Enables prediction history when set
//! - `RUST_LOG` - Log filter (default: info)

use anyhow::{Context, Result};
use fishcast::application::system::Application;
use fishcast::config::Config;
use fishcast::interfaces::http::{AppState, router};
use std::net::SocketAddr;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Fishcast Server {} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Environment={:?}, Species={:?}, Prefix={}",
        config.environment,
        config.supported_species(),
        config.api_prefix
    );
    let bind_address = config.bind_address();

    // Build the application (models, optional database)
    let app = Application::build(config).await;
    let routes = router(AppState::from(&app));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on {}. Press Ctrl+C to shutdown.", bind_address);

    axum::serve(
        listener,
        routes.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received. Exiting...");
    })
    .await
    .context("Server error")?;

    if let Some(persistence) = app.persistence {
        persistence.db.pool.close().await;
    }

    Ok(())
}
