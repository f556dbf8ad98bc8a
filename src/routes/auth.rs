// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account authentication routes.
//!
//! The encrypted refresh token travels only in an HttpOnly cookie; response
//! bodies never include it.

use axum::{
    extract::State,
    http::header,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::services::account::AccountProfile;
use crate::AppState;

const REFRESH_COOKIE: &str = "refresh_token";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/token", post(login_token))
        .route("/auth/refresh", post(refresh))
}

/// Routes that need a valid access token (wired behind `require_auth`).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/logout", post(logout))
}

// ─── Request/response bodies ─────────────────────────────────

#[derive(Deserialize)]
struct SignupRequest {
    email: String,
    pwd: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    pwd: String,
}

#[derive(Serialize)]
struct TokenBody {
    access_token: String,
}

#[derive(Serialize)]
struct LoginResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<TokenBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_id: Option<Uuid>,
    user: AccountProfile,
    connected: Vec<String>,
}

#[derive(Deserialize)]
struct DeviceRequest {
    device_id: Uuid,
}

// ─── Handlers ────────────────────────────────────────────────

/// Create a local account.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<AccountProfile>> {
    let profile = state
        .account_service
        .signup(&request.email, &request.pwd, request.name)
        .await?;
    Ok(Json(profile))
}

/// Email/password login. Returns the access token in the body and the
/// encrypted refresh token as an HttpOnly cookie.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let outcome = state
        .account_service
        .login(&request.email, &request.pwd)
        .await?;

    let jar = jar.add(refresh_cookie(
        outcome.refresh_token.clone(),
        state.config.refresh_token_ttl_days,
    ));

    Ok((
        jar,
        Json(LoginResponse {
            token: Some(TokenBody {
                access_token: outcome.access_token,
            }),
            device_id: Some(outcome.device_id),
            user: outcome.user,
            connected: outcome.connected,
        }),
    ))
}

/// Token login: a valid access token returns the account profile.
async fn login_token(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<LoginResponse>> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    let (user, connected) = state.account_service.login_token(token).await?;

    Ok(Json(LoginResponse {
        token: None,
        device_id: None,
        user,
        connected,
    }))
}

/// Mint a new access token from the refresh cookie + device id.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<DeviceRequest>,
) -> Result<Json<LoginResponse>> {
    let encrypted = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let outcome = state
        .account_service
        .refresh(&encrypted, request.device_id)
        .await?;

    Ok(Json(LoginResponse {
        token: Some(TokenBody {
            access_token: outcome.access_token,
        }),
        device_id: Some(outcome.device_id),
        user: outcome.user,
        connected: outcome.connected,
    }))
}

/// Revoke this device's session and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    Json(request): Json<DeviceRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    state
        .account_service
        .logout(user.user_id, request.device_id)
        .await?;

    let jar = jar.remove(Cookie::from(REFRESH_COOKIE));
    Ok((jar, Json(serde_json::json!({ "status": "ok" }))))
}

// ─── Helpers ─────────────────────────────────────────────────

fn refresh_cookie(value: String, ttl_days: i64) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::days(ttl_days))
        .build()
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}
