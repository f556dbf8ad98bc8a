//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and cached in memory; nothing re-reads
//! the environment after boot.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Server ---
    /// Server port
    pub port: u16,
    /// Frontend URL for OAuth redirects and CORS
    pub frontend_url: String,

    // --- Account tokens ---
    /// JWT signing secret for access/refresh tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime in minutes
    pub access_token_ttl_mins: i64,
    /// Refresh token lifetime in days
    pub refresh_token_ttl_days: i64,

    // --- Encryption keys (32 bytes, hex-encoded) ---
    /// Key for account refresh tokens at rest
    pub encryption_key_refresh: String,
    /// Key for provider token pairs at rest
    pub encryption_key_provider: String,

    // --- Strava OAuth ---
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Signing key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,

    // --- Classifier ---
    /// Configured max heart rate used for effort percentages (bpm)
    pub max_heart_rate: f64,
    /// Pace gap (sec/km) between a work lap and its recovery lap that marks
    /// an interval boundary
    pub interval_pace_gap: f64,

    // --- Response cache ---
    /// ETag entry lifetime in seconds
    pub etag_ttl_secs: u64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            jwt_secret: b"test_jwt_secret_32_bytes_minimum".to_vec(),
            access_token_ttl_mins: 30,
            refresh_token_ttl_days: 30,
            encryption_key_refresh:
                "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f".to_string(),
            encryption_key_provider:
                "f1e2d3c4b5a6978877665544332211000011223344556677889900aabbccddee".to_string(),
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            max_heart_rate: 190.0,
            interval_pace_gap: 120.0,
            etag_ttl_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development, secrets can be set via a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),
            access_token_ttl_mins: parse_or("ACCESS_TOKEN_TTL_MINS", 30),
            refresh_token_ttl_days: parse_or("REFRESH_TOKEN_TTL_DAYS", 30),

            encryption_key_refresh: env::var("ENCRYPTION_KEY_REFRESH")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ENCRYPTION_KEY_REFRESH"))?,
            encryption_key_provider: env::var("ENCRYPTION_KEY_PROVIDER")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ENCRYPTION_KEY_PROVIDER"))?,

            strava_client_id: env::var("STRAVA_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_ID"))?,
            strava_client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_SECRET"))?,
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),

            max_heart_rate: parse_or("MAX_HEART_RATE", 190.0),
            interval_pace_gap: parse_or("INTERVAL_PACE_GAP", 120.0),

            etag_ttl_secs: parse_or("ETAG_TTL_SECS", 3600),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
