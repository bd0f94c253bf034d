// SPDX-License-Identifier: MIT

//! Santa-Exchange API Server
//!
//! Manages a secret santa gift exchange: participants, gift preferences,
//! match generation, and email notifications.

use santa_exchange::{
    config::Config, middleware::auth::hash_password, services::MailService, store::UserStore,
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
    tracing::info!(port = config.port, "Starting Santa-Exchange API");

    // Initialize the JSON store and seed the admin account
    let store = UserStore::open(&config.data_dir);
    let admin_hash = hash_password(&config.admin_password).expect("Failed to hash admin password");
    store
        .initialize(&admin_hash)
        .await
        .expect("Failed to initialize store");
    tracing::info!(data_dir = %config.data_dir, "Store initialized");

    // Initialize mail service (disabled if SMTP is unconfigured)
    let mail = MailService::from_config(&config).expect("Failed to initialize mail service");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        mail,
    });

    // Build router
    let app = santa_exchange::routes::create_router(state);

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
                .add_directive("santa_exchange=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
