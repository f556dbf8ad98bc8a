// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test fixtures: an in-memory application state and a mock
//! provider client with call counters.
//!
//! Each test binary uses a different slice of this module.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stride_coach::cache::InMemoryKv;
use stride_coach::config::Config;
use stride_coach::db::MemoryStore;
use stride_coach::error::AppError;
use stride_coach::models::{Lap, StreamData};
use stride_coach::services::classifier::ClassifierConfig;
use stride_coach::services::provider::{ProviderActivity, ProviderClient, ProviderGrant};
use stride_coach::services::{
    AccountService, CredentialVault, ProviderTokenManager, ResponseCache, SyncPipeline,
    TokenService,
};
use stride_coach::AppState;

/// Scripted provider client. Grants are numbered so tests can tell which
/// refresh cycle produced a token.
pub struct MockProvider {
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    /// Lifetime applied to issued grants; negative means already expired.
    pub grant_ttl_secs: AtomicI64,
    pub activities: Mutex<Vec<ProviderActivity>>,
    pub laps: Mutex<Vec<Lap>>,
    pub stream: Mutex<StreamData>,
    /// Activity id whose stream fetch should fail with an upstream error.
    pub fail_stream_for: Mutex<Option<i64>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            grant_ttl_secs: AtomicI64::new(3600),
            activities: Mutex::new(Vec::new()),
            laps: Mutex::new(Vec::new()),
            stream: Mutex::new(StreamData::default()),
            fail_stream_for: Mutex::new(None),
        }
    }
}

impl MockProvider {
    fn grant(&self, index: usize, with_athlete: bool) -> ProviderGrant {
        ProviderGrant {
            access_token: format!("access-{}", index),
            refresh_token: format!("refresh-{}", index),
            expires_at: Utc::now().timestamp() + self.grant_ttl_secs.load(Ordering::SeqCst),
            provider_user_id: with_athlete.then(|| "athlete-1".to_string()),
        }
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn name(&self) -> &'static str {
        "strava"
    }

    async fn exchange_code(&self, _code: &str) -> Result<ProviderGrant, AppError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.grant(0, true))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<ProviderGrant, AppError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.grant(n, false))
    }

    async fn list_activities(
        &self,
        _access_token: &str,
        _after: i64,
    ) -> Result<Vec<ProviderActivity>, AppError> {
        Ok(self.activities.lock().unwrap().clone())
    }

    async fn fetch_laps(
        &self,
        _access_token: &str,
        _activity_id: i64,
    ) -> Result<Vec<Lap>, AppError> {
        Ok(self.laps.lock().unwrap().clone())
    }

    async fn fetch_stream(
        &self,
        _access_token: &str,
        activity_id: i64,
    ) -> Result<StreamData, AppError> {
        if *self.fail_stream_for.lock().unwrap() == Some(activity_id) {
            return Err(AppError::Upstream("stream fetch failed".to_string()));
        }
        Ok(self.stream.lock().unwrap().clone())
    }

    async fn deauthorize(&self, _access_token: &str) -> Result<(), AppError> {
        Ok(())
    }
}

/// Fully wired in-memory application plus handles the tests poke at.
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub provider: Arc<MockProvider>,
}

/// Build an app around an in-memory store and the mock provider.

pub fn test_harness() -> TestHarness {
    let config = Config::default();
    let store = Arc::new(MemoryStore::new());
    let kv = Arc::new(InMemoryKv::new());

    let vault = CredentialVault::new(
        &config.encryption_key_refresh,
        &config.encryption_key_provider,
    )
    .expect("test vault");

    let token_service = TokenService::new(
        &config.jwt_secret,
        config.access_token_ttl_mins,
        config.refresh_token_ttl_days,
    );

    let account_service = AccountService::new(store.clone(), vault.clone(), token_service.clone());

    let provider = Arc::new(MockProvider::default());

    let provider_tokens = Arc::new(ProviderTokenManager::new(
        store.clone(),
        provider.clone(),
        vault,
    ));

    let response_cache = Arc::new(ResponseCache::new(kv, config.etag_ttl_secs));

    let sync_pipeline = SyncPipeline::new(
        store.clone(),
        provider.clone(),
        provider_tokens.clone(),
        response_cache.clone(),
        ClassifierConfig::default(),
    );

    let state = Arc::new(AppState {
        config,
        store,
        token_service,
        account_service,
        provider_tokens,
        sync_pipeline,
        response_cache,
    });

    TestHarness { state, provider }
}

/// Router over the harness state.

pub fn test_router(harness: &TestHarness) -> axum::Router {
    stride_coach::routes::create_router(harness.state.clone())
}

/// A provider activity with sensible running defaults.

pub fn provider_activity(id: i64) -> ProviderActivity {
    ProviderActivity {
        id,
        sport_type: "Run".to_string(),
        start_date: Utc::now(),
        distance: Some(8000.0),
        elapsed_time: Some(2400),
        average_speed: Some(3.33),
        max_speed: Some(4.2),
        average_heartrate: Some(120.0),
        max_heartrate: Some(150.0),
        average_cadence: Some(168.0),
    }
}
