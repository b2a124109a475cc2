// SPDX-License-Identifier: MIT

//! NXO Mining API Server
//!
//! Serves the mining simulation backend: signup/login delegation to the
//! identity service, mining session lifecycle, and the background accrual
//! job that keeps every running session paid out.

use nxo_mining_api::{
    cache::ReadCache,
    config::Config,
    db::StoreDb,
    services::{accrual, IdentityService, MailerService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting NXO Mining API");

    // Initialize the keyed store
    let db = StoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Process-local read cache
    let cache = ReadCache::new(config.cache_ttl_secs);
    tracing::info!(ttl_secs = config.cache_ttl_secs, "Read cache initialized");

    // External collaborators
    let identity = IdentityService::new(&config.identity_api_url, &config.identity_api_key);
    let mailer = MailerService::new(&config.mail_api_url, &config.mail_api_key, &config.mail_from);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        cache,
        identity,
        mailer,
    });

    // Background accrual job
    accrual::spawn(state.clone());

    // Build router
    let app = nxo_mining_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nxo_mining_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
