// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Learnrithm API Server

use learnrithm_backend::{config::Config, db::FirestoreDb, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often expired rate-limit windows are dropped.
const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Learnrithm API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tracing::info!(path = %config.upload_dir, "Upload directory ready");

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, chat is disabled");
    }

    let port = config.port;
    let state = Arc::new(AppState::new(config, db));

    spawn_rate_limit_pruner(state.clone());

    // Build router
    let app = learnrithm_backend::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Periodically drop expired rate-limit windows so idle clients don't
/// accumulate in memory.
fn spawn_rate_limit_pruner(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let now = Instant::now();
            let removed =
                state.rate_limiter.prune(now) + state.auth_rate_limiter.prune(now);
            if removed > 0 {
                tracing::debug!(removed, "Pruned rate limit windows");
            }
        }
    });
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,learnrithm_backend=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
