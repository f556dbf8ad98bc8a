// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Training activity routes (all behind authentication).

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{ActivityDetail, ActivitySummary};
use crate::services::etag::{CacheOutcome, SCHEDULES_RESOURCE};
use crate::services::sync::{ManualActivityRequest, SyncReport};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities/sync", post(sync_activities))
        .route("/api/activities", get(get_activities))
        .route("/api/activities/upload", post(upload_activity))
        .route("/api/activities/{id}", get(get_activity_detail))
}

#[derive(Deserialize)]
struct SinceParams {
    /// Unix timestamp; defaults to 14 days back.
    since: Option<i64>,
}

/// Pull new activities from the connected provider.
async fn sync_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<SinceParams>,
) -> Result<Json<SyncReport>> {
    let report = state
        .sync_pipeline
        .sync_new_activities(user.user_id, params.since)
        .await?;
    Ok(Json(report))
}

/// List stored activities with ETag support.
///
/// A matching `If-None-Match` returns 304 without touching the store.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<SinceParams>,
    headers: axum::http::HeaderMap,
) -> Result<Response> {
    let since = resolve_since(params.since)?;
    let client_etag = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|h| h.to_str().ok());

    let store = state.store.clone();
    let user_id = user.user_id;
    let outcome = state
        .response_cache
        .get_or_compute(user_id, SCHEDULES_RESOURCE, client_etag, move || async move {
            let activities = store.list_activities(user_id, since).await?;
            Ok(activities
                .iter()
                .map(ActivitySummary::from_activity)
                .collect::<Vec<_>>())
        })
        .await?;

    match outcome {
        CacheOutcome::NotModified => Err(AppError::NotModified),
        CacheOutcome::Fresh { etag, data } => {
            Ok(([(header::ETAG, etag)], Json(data)).into_response())
        }
    }
}

/// Laps and stream for one activity.
async fn get_activity_detail(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<ActivityDetail>> {
    let detail = state
        .store
        .get_activity_detail(user.user_id, activity_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))?;
    Ok(Json(detail))
}

/// Store a user-entered activity.
async fn upload_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ManualActivityRequest>,
) -> Result<Json<ActivitySummary>> {
    let activity = state
        .sync_pipeline
        .upload_manual_activity(user.user_id, request)
        .await?;
    Ok(Json(ActivitySummary::from_activity(&activity)))
}

fn resolve_since(since: Option<i64>) -> Result<DateTime<Utc>> {
    match since {
        Some(ts) => Utc
            .timestamp_opt(ts, 0)
            .single()
            .ok_or_else(|| AppError::Validation(format!("Invalid since timestamp {}", ts))),
        None => Ok(Utc::now() - Duration::days(14)),
    }
}
