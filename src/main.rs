// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stride-Coach API Server
//!
//! Authenticates runners, links their Strava account, ingests and
//! classifies workouts, and serves them back with ETag-aware responses.

use std::sync::Arc;
use stride_coach::{
    cache::InMemoryKv,
    config::Config,
    db::MemoryStore,
    services::classifier::ClassifierConfig,
    services::{
        AccountService, CredentialVault, ProviderTokenManager, ResponseCache, StravaClient,
        SyncPipeline, TokenService,
    },
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Stride-Coach API");

    // Resource handles are constructed here and injected; nothing holds
    // implicit global state.
    let store = Arc::new(MemoryStore::new());
    let kv = Arc::new(InMemoryKv::new());

    let vault = CredentialVault::new(
        &config.encryption_key_refresh,
        &config.encryption_key_provider,
    )
    .expect("Failed to initialize credential vault");

    let token_service = TokenService::new(
        &config.jwt_secret,
        config.access_token_ttl_mins,
        config.refresh_token_ttl_days,
    );

    let account_service =
        AccountService::new(store.clone(), vault.clone(), token_service.clone());

    let strava = Arc::new(StravaClient::new(
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
    ));

    let provider_tokens = Arc::new(ProviderTokenManager::new(
        store.clone(),
        strava.clone(),
        vault.clone(),
    ));

    let response_cache = Arc::new(ResponseCache::new(kv, config.etag_ttl_secs));

    let sync_pipeline = SyncPipeline::new(
        store.clone(),
        strava,
        provider_tokens.clone(),
        response_cache.clone(),
        ClassifierConfig {
            max_heart_rate: config.max_heart_rate,
            interval_pace_gap: config.interval_pace_gap,
        },
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        token_service,
        account_service,
        provider_tokens,
        sync_pipeline,
        response_cache,
    });

    // Build router
    let app = stride_coach::routes::create_router(state);

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
                .add_directive("stride_coach=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
