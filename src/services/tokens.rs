// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account token service: mints and verifies signed, typed, expiring
//! access and refresh tokens (HS256).
//!
//! Verification order matters: structural validity first, then the token
//! type, then expiry. An expired-but-well-formed token is a distinct
//! failure from a malformed one because the refresh flow reacts differently.

use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two token classes. Each is rejected where the other is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject (user id)
    sub: String,
    /// Expiration time (Unix timestamp)
    exp: i64,
    /// Issued at (Unix timestamp)
    iat: i64,
    token_type: TokenType,
}

/// Verified token contents. Never persisted.
#[derive(Debug, Clone)]
pub struct TokenPayload {
    pub user_id: Uuid,
    pub issued_at: i64,
    pub expires_at: i64,
    pub token_type: TokenType,
}

/// Stateless mint/verify over one signing secret and configured lifetimes.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], access_ttl_mins: i64, refresh_ttl_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: Duration::minutes(access_ttl_mins),
            refresh_ttl: Duration::days(refresh_ttl_days),
        }
    }

    /// Mint a short-lived access token.
    pub fn issue_access(&self, user_id: Uuid) -> Result<String, AppError> {
        Ok(self.issue(user_id, TokenType::Access, self.access_ttl)?.0)
    }

    /// Mint a refresh token; also returns its expiry for the stored row.
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<(String, i64), AppError> {
        self.issue(user_id, TokenType::Refresh, self.refresh_ttl)
    }

    fn issue(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<(String, i64), AppError> {
        let now = Utc::now();
        let expires_at = (now + ttl).timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires_at,
            iat: now.timestamp(),
            token_type,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Token encoding failed: {}", e)))?;
        Ok((token, expires_at))
    }

    /// Verify a token and require it to be of `expected` type.
    ///
    /// Fails with `TokenInvalid` for bad signature/structure or a type
    /// mismatch, and with `TokenExpired` for a well-formed token past its
    /// expiry.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<TokenPayload, AppError> {
        // Expiry is checked by hand after the type check, so a wrong-type
        // token reads as invalid even when it is also expired.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AppError::TokenInvalid)?;

        let user_id: Uuid = data.claims.sub.parse().map_err(|_| AppError::TokenInvalid)?;

        if data.claims.token_type != expected {
            return Err(AppError::TokenInvalid);
        }

        if data.claims.exp < Utc::now().timestamp() {
            return Err(AppError::TokenExpired);
        }

        Ok(TokenPayload {
            user_id,
            issued_at: data.claims.iat,
            expires_at: data.claims.exp,
            token_type: data.claims.token_type,
        })
    }
}
