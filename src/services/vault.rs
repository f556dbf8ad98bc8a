// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential vault: encryption of bearer secrets at rest.
//!
//! AES-256-GCM with a distinct key per secret class, so a compromise of one
//! key space does not expose the other. Ciphertext layout is
//! base64(nonce || ciphertext+tag). Also carries the password hash/verify
//! helpers, which run off the async scheduler.

use crate::error::AppError;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;

const NONCE_LEN: usize = 12;

/// Selects which symmetric key a secret is sealed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// Account refresh tokens
    AccountRefresh,
    /// Provider access/refresh token pairs
    Provider,
}

/// Purpose-keyed symmetric cipher. Holds no state beyond the keys and
/// performs no I/O.
#[derive(Clone)]
pub struct CredentialVault {
    account_refresh_key: [u8; 32],
    provider_key: [u8; 32],
}

impl CredentialVault {
    /// Build a vault from two hex-encoded 32-byte keys.
    pub fn new(refresh_key_hex: &str, provider_key_hex: &str) -> Result<Self, AppError> {
        Ok(Self {
            account_refresh_key: parse_key(refresh_key_hex)?,
            provider_key: parse_key(provider_key_hex)?,
        })
    }

    fn key_for(&self, purpose: KeyPurpose) -> &[u8; 32] {
        match purpose {
            KeyPurpose::AccountRefresh => &self.account_refresh_key,
            KeyPurpose::Provider => &self.provider_key,
        }
    }

    /// Encrypt a secret under the key for `purpose`.
    pub fn encrypt(&self, plaintext: &str, purpose: KeyPurpose) -> Result<String, AppError> {
        let cipher = Aes256Gcm::new_from_slice(self.key_for(purpose))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid cipher key: {:?}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Encryption failed: {:?}", e)))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    /// Decrypt a secret sealed by [`encrypt`](Self::encrypt).
    ///
    /// Tampered, truncated, or foreign-key ciphertext fails with
    /// [`AppError::TokenInvalid`], never a panic or an unrelated error.
    pub fn decrypt(&self, ciphertext_b64: &str, purpose: KeyPurpose) -> Result<String, AppError> {
        let raw = BASE64
            .decode(ciphertext_b64)
            .map_err(|_| AppError::TokenInvalid)?;
        if raw.len() <= NONCE_LEN {
            return Err(AppError::TokenInvalid);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new_from_slice(self.key_for(purpose))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid cipher key: {:?}", e)))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| AppError::TokenInvalid)?;

        String::from_utf8(plaintext).map_err(|_| AppError::TokenInvalid)
    }
}

/// Parse a 64-char hex string into a 32-byte key.
fn parse_key(key_hex: &str) -> Result<[u8; 32], AppError> {
    if key_hex.len() != 64 {
        return Err(AppError::Internal(anyhow::anyhow!(
            "Encryption key must be 64 hex chars (32 bytes), got {}",
            key_hex.len()
        )));
    }
    let bytes = hex::decode(key_hex)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Encryption key not hex: {}", e)))?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

// ─── Password hashing ────────────────────────────────────────────────────
//
// Argon2 is CPU-bound; both helpers run under spawn_blocking so concurrent
// requests keep making progress.

/// Hash a password for storage.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || password_auth::generate_hash(password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))
}

/// Check a password against a stored hash.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || {
        password_auth::verify_password(password, &hash).is_ok()
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Verify task failed: {}", e)))
}
