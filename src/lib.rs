// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Stride-Coach: running-coach backend.
//!
//! This crate provides the API for account sessions, Strava token
//! management, workout ingestion and classification, and cache-aware reads.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Storage;
use services::{AccountService, ProviderTokenManager, ResponseCache, SyncPipeline, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Storage>,
    pub token_service: TokenService,
    pub account_service: AccountService,
    pub provider_tokens: Arc<ProviderTokenManager>,
    pub sync_pipeline: SyncPipeline,
    pub response_cache: Arc<ResponseCache>,
}
