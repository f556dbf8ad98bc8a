// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitness-data provider integration.
//!
//! [`ProviderClient`] is the wire boundary (token exchange/refresh and data
//! fetches); [`StravaClient`] is the bundled reqwest implementation;
//! [`ProviderTokenManager`] owns the encrypted token triple per user and the
//! expiry-triggered refresh cycle.

use crate::db::Storage;
use crate::error::AppError;
use crate::models::{Lap, ProviderTokenRecord, StreamData};
use crate::services::vault::{CredentialVault, KeyPurpose};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Token triple returned by the provider's token endpoint.
///
/// `provider_user_id` is present on the initial code exchange and absent on
/// refresh responses.
#[derive(Debug, Clone)]
pub struct ProviderGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp
    pub expires_at: i64,
    pub provider_user_id: Option<String>,
}

/// One activity from the provider's listing endpoint.
#[derive(Debug, Clone)]
pub struct ProviderActivity {
    pub id: i64,
    pub sport_type: String,
    pub start_date: DateTime<Utc>,
    pub distance: Option<f64>,
    pub elapsed_time: Option<i64>,
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
}

/// Outbound provider API surface. All transport failures map to
/// [`AppError::Upstream`]; no retries at this layer.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Provider key used in stored records, e.g. "strava".
    fn name(&self) -> &'static str;

    async fn exchange_code(&self, code: &str) -> Result<ProviderGrant, AppError>;

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderGrant, AppError>;

    async fn list_activities(
        &self,
        access_token: &str,
        after: i64,
    ) -> Result<Vec<ProviderActivity>, AppError>;

    async fn fetch_laps(&self, access_token: &str, activity_id: i64)
        -> Result<Vec<Lap>, AppError>;

    async fn fetch_stream(
        &self,
        access_token: &str,
        activity_id: i64,
    ) -> Result<StreamData, AppError>;

    /// Revoke the grant upstream.
    async fn deauthorize(&self, access_token: &str) -> Result<(), AppError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaClient
// ─────────────────────────────────────────────────────────────────────────────

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    token_url: String,
    deauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: "https://www.strava.com/api/v3".to_string(),
            token_url: "https://www.strava.com/oauth/token".to_string(),
            deauth_url: "https://www.strava.com/oauth/deauthorize".to_string(),
            client_id,
            client_secret,
        }
    }

    /// Point all endpoints at a different base URL (test stubs).
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.api_url = format!("{}/api/v3", base);
        self.token_url = format!("{}/oauth/token", base);
        self.deauth_url = format!("{}/oauth/deauthorize", base);
        self
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<StravaGrant, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Token request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(AppError::Upstream("rate_limited".to_string()));
            }

            return Err(AppError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl ProviderClient for StravaClient {
    fn name(&self) -> &'static str {
        "strava"
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderGrant, AppError> {
        let grant = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .await?;
        Ok(grant.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderGrant, AppError> {
        let grant = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        Ok(grant.into())
    }

    async fn list_activities(
        &self,
        access_token: &str,
        after: i64,
    ) -> Result<Vec<ProviderActivity>, AppError> {
        let url = format!("{}/athlete/activities", self.api_url);
        let raw: Vec<StravaActivity> = self
            .get_json(
                &url,
                access_token,
                &[
                    ("after", after.to_string()),
                    ("per_page", "100".to_string()),
                ],
            )
            .await?;

        Ok(raw.into_iter().map(ProviderActivity::from).collect())
    }

    async fn fetch_laps(
        &self,
        access_token: &str,
        activity_id: i64,
    ) -> Result<Vec<Lap>, AppError> {
        let url = format!("{}/activities/{}/laps", self.api_url, activity_id);
        let raw: Vec<StravaLap> = self.get_json(&url, access_token, &[]).await?;
        Ok(raw.into_iter().map(Lap::from).collect())
    }

    async fn fetch_stream(
        &self,
        access_token: &str,
        activity_id: i64,
    ) -> Result<StreamData, AppError> {
        let url = format!("{}/activities/{}/streams", self.api_url, activity_id);
        let raw: StravaStreams = self
            .get_json(
                &url,
                access_token,
                &[
                    (
                        "keys",
                        "heartrate,cadence,distance,velocity_smooth,time,altitude".to_string(),
                    ),
                    ("key_by_type", "true".to_string()),
                ],
            )
            .await?;
        Ok(raw.into())
    }

    async fn deauthorize(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(&self.deauth_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Deauthorization request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!("Deauthorize HTTP {}", status)));
        }
        tracing::info!("Strava deauthorization successful");
        Ok(())
    }
}

// ─── Strava wire types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StravaGrant {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    athlete: Option<StravaAthlete>,
}

#[derive(Debug, Deserialize)]
struct StravaAthlete {
    id: i64,
}

impl From<StravaGrant> for ProviderGrant {
    fn from(grant: StravaGrant) -> Self {
        ProviderGrant {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at: grant.expires_at,
            provider_user_id: grant.athlete.map(|a| a.id.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StravaActivity {
    id: i64,
    sport_type: String,
    start_date: DateTime<Utc>,
    distance: Option<f64>,
    elapsed_time: Option<i64>,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
    average_heartrate: Option<f64>,
    max_heartrate: Option<f64>,
    average_cadence: Option<f64>,
}

impl From<StravaActivity> for ProviderActivity {
    fn from(raw: StravaActivity) -> Self {
        ProviderActivity {
            id: raw.id,
            sport_type: raw.sport_type,
            start_date: raw.start_date,
            distance: raw.distance,
            elapsed_time: raw.elapsed_time,
            average_speed: raw.average_speed,
            max_speed: raw.max_speed,
            average_heartrate: raw.average_heartrate,
            max_heartrate: raw.max_heartrate,
            // Strava reports single-leg running cadence.
            average_cadence: raw.average_cadence.map(|c| c * 2.0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StravaLap {
    lap_index: i32,
    distance: f64,
    elapsed_time: i64,
    average_speed: f64,
    max_speed: f64,
    average_heartrate: Option<f64>,
    max_heartrate: Option<f64>,
    average_cadence: Option<f64>,
    total_elevation_gain: Option<f64>,
}

impl From<StravaLap> for Lap {
    fn from(raw: StravaLap) -> Self {
        Lap {
            lap_index: raw.lap_index,
            distance: raw.distance,
            elapsed_time: raw.elapsed_time,
            average_speed: raw.average_speed,
            max_speed: raw.max_speed,
            average_heartrate: raw.average_heartrate,
            max_heartrate: raw.max_heartrate,
            average_cadence: raw.average_cadence.map(|c| c * 2.0),
            elevation_gain: raw.total_elevation_gain,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StravaStreams {
    heartrate: Option<StravaSeries<f64>>,
    cadence: Option<StravaSeries<f64>>,
    distance: Option<StravaSeries<f64>>,
    velocity_smooth: Option<StravaSeries<f64>>,
    altitude: Option<StravaSeries<f64>>,
    time: Option<StravaSeries<i64>>,
}

#[derive(Debug, Deserialize)]
struct StravaSeries<T> {
    data: Vec<T>,
}

impl From<StravaStreams> for StreamData {
    fn from(raw: StravaStreams) -> Self {
        StreamData {
            heartrate: raw.heartrate.map(|s| s.data),
            cadence: raw
                .cadence
                .map(|s| s.data.into_iter().map(|c| c * 2.0).collect()),
            distance: raw.distance.map(|s| s.data),
            velocity: raw.velocity_smooth.map(|s| s.data),
            altitude: raw.altitude.map(|s| s.data),
            time: raw.time.map(|s| s.data),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProviderTokenManager
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the per-(user, provider) encrypted token triple and its refresh
/// cycle.
///
/// Concurrent callers for the same user are serialized through a per-user
/// async mutex, so an expired token triggers exactly one refresh call even
/// under simultaneous sync requests.
pub struct ProviderTokenManager {
    store: Arc<dyn Storage>,
    client: Arc<dyn ProviderClient>,
    vault: CredentialVault,
    /// Per-user mutex to single-flight token refresh operations.
    refresh_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ProviderTokenManager {
    pub fn new(
        store: Arc<dyn Storage>,
        client: Arc<dyn ProviderClient>,
        vault: CredentialVault,
    ) -> Self {
        Self {
            store,
            client,
            vault,
            refresh_locks: DashMap::new(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.name()
    }

    /// Exchange an authorization code and store the encrypted triple.
    /// A reconnect overwrites the previous grant entirely.
    pub async fn connect(&self, user_id: Uuid, code: &str) -> Result<(), AppError> {
        let grant = self.client.exchange_code(code).await?;

        let record = ProviderTokenRecord {
            user_id,
            provider: self.client.name().to_string(),
            provider_user_id: grant.provider_user_id.unwrap_or_default(),
            encrypted_access: self.vault.encrypt(&grant.access_token, KeyPurpose::Provider)?,
            encrypted_refresh: self
                .vault
                .encrypt(&grant.refresh_token, KeyPurpose::Provider)?,
            expires_at: grant.expires_at,
        };
        self.store.upsert_provider_token(&record).await?;

        tracing::info!(user_id = %user_id, provider = self.client.name(), "Provider connected");
        Ok(())
    }

    /// Get a valid (non-expired) plaintext access token for the user.
    ///
    /// Fails with NotFound when the user never connected. While the stored
    /// token is fresh this performs no network call; once expired it runs
    /// one refresh against the provider, re-encrypts and overwrites the
    /// stored triple, and returns the new access token.
    pub async fn get_valid_access_token(&self, user_id: Uuid) -> Result<String, AppError> {
        // Serialize refresh attempts per user. Most providers invalidate the
        // old refresh token on rotation, so two racing refreshes would leave
        // the loser with a dead grant.
        let lock = self
            .refresh_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let record = self
            .store
            .get_provider_token(user_id, self.client.name())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("{} token for user {}", self.client.name(), user_id))
            })?;

        let now = Utc::now().timestamp();
        if record.expires_at > now {
            return self.vault.decrypt(&record.encrypted_access, KeyPurpose::Provider);
        }

        tracing::info!(user_id = %user_id, "Provider access token expired, refreshing");

        let refresh_token = self
            .vault
            .decrypt(&record.encrypted_refresh, KeyPurpose::Provider)?;
        let grant = self.client.refresh(&refresh_token).await?;

        let updated = ProviderTokenRecord {
            user_id,
            provider: record.provider,
            provider_user_id: record.provider_user_id,
            encrypted_access: self.vault.encrypt(&grant.access_token, KeyPurpose::Provider)?,
            encrypted_refresh: self
                .vault
                .encrypt(&grant.refresh_token, KeyPurpose::Provider)?,
            expires_at: grant.expires_at,
        };
        self.store.upsert_provider_token(&updated).await?;

        tracing::info!(user_id = %user_id, "Provider token refreshed");
        Ok(grant.access_token)
    }

    /// Disconnect the provider: best-effort deauthorize upstream, then
    /// delete the stored row. Idempotent when no row exists.
    pub async fn disconnect(&self, user_id: Uuid) -> Result<(), AppError> {
        let record = match self
            .store
            .get_provider_token(user_id, self.client.name())
            .await?
        {
            Some(record) => record,
            None => return Ok(()), // already disconnected
        };

        match self.vault.decrypt(&record.encrypted_access, KeyPurpose::Provider) {
            Ok(access_token) => {
                if let Err(e) = self.client.deauthorize(&access_token).await {
                    tracing::warn!(user_id = %user_id, error = %e, "Provider deauthorize failed");
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Could not decrypt token for deauthorize");
            }
        }

        self.store
            .delete_provider_token(user_id, self.client.name())
            .await?;
        tracing::info!(user_id = %user_id, provider = self.client.name(), "Provider disconnected");
        Ok(())
    }
}
