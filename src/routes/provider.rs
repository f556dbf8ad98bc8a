// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider (Strava) connection routes.
//!
//! The authorize redirect carries an HMAC-signed `state` so the public
//! callback can be tied back to the authenticated user that started it.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// How long a signed authorize `state` stays valid.
const STATE_MAX_AGE_SECS: i64 = 600;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/provider/callback", get(callback))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/provider/authorize", get(authorize))
        .route("/provider/connect", post(connect))
        .route("/provider/disconnect", delete(disconnect))
}

// ─── Handlers ────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct AuthorizeResponse {
    authorize_url: String,
}

/// Build the provider authorize URL for the current user.
async fn authorize(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: axum::http::HeaderMap,
) -> Result<Json<AuthorizeResponse>> {
    let oauth_state = sign_state(user.user_id, &state.config.oauth_state_key)?;

    // Callback lands on this API; derive its address from the request.
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");
    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };
    let callback_url = format!("{}://{}/provider/callback", scheme, host);
    let authorize_url = format!(
        "https://www.strava.com/oauth/authorize?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope=activity:read_all&\
         state={}",
        state.config.strava_client_id,
        urlencoding::encode(&callback_url),
        oauth_state
    );

    Ok(Json(AuthorizeResponse { authorize_url }))
}

#[derive(Deserialize)]
struct CallbackParams {
    code: String,
    state: String,
}

/// Public OAuth callback: verify the signed state, exchange the code and
/// store the token triple, then send the browser back to the frontend.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let user_id = verify_state(&params.state, &state.config.oauth_state_key)?;

    state.provider_tokens.connect(user_id, &params.code).await?;

    Ok(Redirect::temporary(&format!(
        "{}/?provider=connected",
        state.config.frontend_url
    )))
}

#[derive(Deserialize)]
struct ConnectRequest {
    code: String,
}

/// Direct connect for clients that ran the authorize flow themselves.
async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ConnectRequest>,
) -> Result<Json<serde_json::Value>> {
    state
        .provider_tokens
        .connect(user.user_id, &request.code)
        .await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Disconnect the provider for the current user.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>> {
    state.provider_tokens.disconnect(user.user_id).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

// ─── Signed state ────────────────────────────────────────────

/// Encode "user_id|timestamp|signature" as a URL-safe token.
fn sign_state(user_id: Uuid, key: &[u8]) -> Result<String> {
    let payload = format!("{}|{}", user_id, chrono::Utc::now().timestamp());

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Check the signature and age of a state token, returning the user id.
fn verify_state(state: &str, key: &[u8]) -> Result<Uuid> {
    let raw = URL_SAFE_NO_PAD
        .decode(state)
        .map_err(|_| AppError::Validation("Malformed state".to_string()))?;
    let decoded =
        String::from_utf8(raw).map_err(|_| AppError::Validation("Malformed state".to_string()))?;

    let mut parts = decoded.splitn(3, '|');
    let (user_part, ts_part, sig_part) = match (parts.next(), parts.next(), parts.next()) {
        (Some(u), Some(t), Some(s)) => (u, t, s),
        _ => return Err(AppError::Validation("Malformed state".to_string())),
    };

    let payload = format!("{}|{}", user_part, ts_part);
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    mac.verify_slice(
        &hex::decode(sig_part).map_err(|_| AppError::Validation("Malformed state".to_string()))?,
    )
    .map_err(|_| AppError::Validation("State signature mismatch".to_string()))?;

    let issued_at: i64 = ts_part
        .parse()
        .map_err(|_| AppError::Validation("Malformed state".to_string()))?;
    if chrono::Utc::now().timestamp() - issued_at > STATE_MAX_AGE_SECS {
        return Err(AppError::Validation("State expired".to_string()));
    }

    user_part
        .parse()
        .map_err(|_| AppError::Validation("Malformed state".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_oauth_state_key";

    #[test]
    fn test_state_roundtrip() {
        let user_id = Uuid::new_v4();
        let state = sign_state(user_id, KEY).unwrap();
        assert_eq!(verify_state(&state, KEY).unwrap(), user_id);
    }

    #[test]
    fn test_state_wrong_key_rejected() {
        let state = sign_state(Uuid::new_v4(), KEY).unwrap();
        assert!(verify_state(&state, b"another_key").is_err());
    }

    #[test]
    fn test_state_tamper_rejected() {
        let state = sign_state(Uuid::new_v4(), KEY).unwrap();
        let mut decoded = URL_SAFE_NO_PAD.decode(&state).unwrap();
        decoded[0] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(decoded);
        assert!(verify_state(&tampered, KEY).is_err());
    }

    #[test]
    fn test_garbage_state_rejected() {
        assert!(verify_state("%%%not-base64%%%", KEY).is_err());
    }
}
