// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account service: signup, login, token refresh and logout.
//!
//! Each (user, device) pair owns one encrypted refresh-token row. Login
//! mints a fresh device id and upserts the row; refresh compares the
//! client's decrypted token byte-for-byte against the decrypted stored
//! value and mints a new access token only (the refresh token is not
//! rotated); logout deletes the row and is idempotent.

use crate::db::Storage;
use crate::error::AppError;
use crate::models::{RefreshTokenRecord, User};
use crate::services::tokens::{TokenService, TokenType};
use crate::services::vault::{self, CredentialVault, KeyPurpose};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Public account fields returned to clients.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccountProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub provider: String,
}

impl AccountProfile {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            provider: user.provider.clone(),
        }
    }
}

/// A freshly opened session.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    /// Vault ciphertext of the refresh token; the client stores and presents
    /// this ciphertext, never the plaintext JWT.
    pub refresh_token: String,
    pub device_id: Uuid,
    pub user: AccountProfile,
    /// Names of providers the account is linked to.
    pub connected: Vec<String>,
}

/// Result of a successful refresh: a new access token, same session.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub device_id: Uuid,
    pub user: AccountProfile,
    pub connected: Vec<String>,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Storage>,
    vault: CredentialVault,
    tokens: TokenService,
}

impl AccountService {
    pub fn new(store: Arc<dyn Storage>, vault: CredentialVault, tokens: TokenService) -> Self {
        Self {
            store,
            vault,
            tokens,
        }
    }

    /// Create a local (email/password) account.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<AccountProfile, AppError> {
        if self.store.get_user_by_email(email).await?.is_some() {
            return Err(AppError::Validation(format!(
                "Email {} already registered",
                email
            )));
        }

        let hashed = vault::hash_password(password.to_string()).await?;
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_pwd: Some(hashed),
            name,
            provider: "local".to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(AccountProfile::from_user(&user))
    }

    /// Email/password login. Both "no such account" and "wrong password"
    /// collapse into the same validation error.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or_else(invalid_credentials)?;

        let hashed = user.hashed_pwd.clone().ok_or_else(invalid_credentials)?;
        if !vault::verify_password(password.to_string(), hashed).await? {
            return Err(invalid_credentials());
        }

        self.open_session(&user).await
    }

    /// Social-provider login: find or create a password-less account for the
    /// external identity, then open a session like any other login.
    pub async fn provider_login(
        &self,
        email: &str,
        provider: &str,
        name: Option<String>,
    ) -> Result<LoginOutcome, AppError> {
        let user = match self.store.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                let user = User {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    hashed_pwd: None,
                    name,
                    provider: provider.to_string(),
                    created_at: Utc::now(),
                };
                self.store.insert_user(&user).await?;
                tracing::info!(user_id = %user.id, provider, "Account created via provider");
                user
            }
        };

        self.open_session(&user).await
    }

    /// Mint a session for an authenticated user: access + refresh tokens,
    /// fresh server-side device id, encrypted refresh row upserted.
    async fn open_session(&self, user: &User) -> Result<LoginOutcome, AppError> {
        let access_token = self.tokens.issue_access(user.id)?;
        let (refresh_token, expires_at) = self.tokens.issue_refresh(user.id)?;

        let encrypted = self
            .vault
            .encrypt(&refresh_token, KeyPurpose::AccountRefresh)?;

        let device_id = Uuid::new_v4();
        self.store
            .upsert_refresh_token(&RefreshTokenRecord {
                user_id: user.id,
                device_id,
                encrypted_token: encrypted.clone(),
                expires_at,
            })
            .await?;

        let connected = self.connected_providers(user.id).await?;

        tracing::info!(user_id = %user.id, device_id = %device_id, "Session opened");
        Ok(LoginOutcome {
            access_token,
            refresh_token: encrypted,
            device_id,
            user: AccountProfile::from_user(user),
            connected,
        })
    }

    /// Resolve a valid access token to the account profile.
    pub async fn login_token(
        &self,
        access_token: &str,
    ) -> Result<(AccountProfile, Vec<String>), AppError> {
        let payload = self.tokens.verify(access_token, TokenType::Access)?;

        let user = self
            .store
            .get_user_by_id(payload.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", payload.user_id)))?;

        let connected = self.connected_providers(user.id).await?;
        Ok((AccountProfile::from_user(&user), connected))
    }

    /// Exchange a refresh credential for a new access token.
    ///
    /// The client presents the encrypted refresh token plus its device id.
    /// Any mismatch against the stored row (wrong device, revoked, or
    /// superseded by a re-login) is rejected as invalid, never silently
    /// accepted.
    pub async fn refresh(
        &self,
        encrypted_refresh: &str,
        device_id: Uuid,
    ) -> Result<RefreshOutcome, AppError> {
        let refresh_plain = self
            .vault
            .decrypt(encrypted_refresh, KeyPurpose::AccountRefresh)?;
        let payload = self.tokens.verify(&refresh_plain, TokenType::Refresh)?;

        let record = self
            .store
            .get_refresh_token(payload.user_id, device_id)
            .await?
            .ok_or(AppError::TokenInvalid)?;

        let stored_plain = self
            .vault
            .decrypt(&record.encrypted_token, KeyPurpose::AccountRefresh)?;
        if stored_plain != refresh_plain {
            return Err(AppError::TokenInvalid);
        }

        // Refresh tokens are not rotated on use; only a new access token.
        let access_token = self.tokens.issue_access(payload.user_id)?;

        let user = self
            .store
            .get_user_by_id(payload.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", payload.user_id)))?;
        let connected = self.connected_providers(user.id).await?;

        Ok(RefreshOutcome {
            access_token,
            device_id,
            user: AccountProfile::from_user(&user),
            connected,
        })
    }

    /// Delete the refresh row for this device. Idempotent.
    pub async fn logout(&self, user_id: Uuid, device_id: Uuid) -> Result<(), AppError> {
        self.store.delete_refresh_token(user_id, device_id).await?;
        tracing::info!(user_id = %user_id, device_id = %device_id, "Logged out");
        Ok(())
    }

    async fn connected_providers(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        Ok(self
            .store
            .list_provider_tokens(user_id)
            .await?
            .into_iter()
            .map(|record| record.provider)
            .collect())
    }
}

fn invalid_credentials() -> AppError {
    AppError::Validation("Invalid email or password".to_string())
}
