//! User account and credential models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 hash; `None` for accounts created through a social provider.
    pub hashed_pwd: Option<String>,
    pub name: Option<String>,
    /// Account origin: "local" for email/password, else the provider name.
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

/// Encrypted account refresh token, one row per (user, device).
///
/// A login on a new device creates a new row; a login on an existing device
/// overwrites it. Deleted on logout for that device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub user_id: Uuid,
    /// Scopes multi-device sessions. Minted server-side at login, presented
    /// by the client on refresh and logout.
    pub device_id: Uuid,
    /// Vault ciphertext of the signed refresh token.
    pub encrypted_token: String,
    /// Unix timestamp.
    pub expires_at: i64,
}

/// Encrypted provider OAuth token triple, one row per (user, provider).
///
/// Upserted on (re)connect and on every refresh cycle; mutated only by the
/// provider token manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTokenRecord {
    pub user_id: Uuid,
    pub provider: String,
    /// The user's id on the provider side.
    pub provider_user_id: String,
    pub encrypted_access: String,
    pub encrypted_refresh: String,
    /// Unix timestamp for the access token's expiry.
    pub expires_at: i64,
}
