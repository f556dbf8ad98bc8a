// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity sync pipeline.
//!
//! Pulls new activities from the provider, classifies them and persists
//! each (activity, laps, stream) unit idempotently. Activities are
//! processed sequentially to bound provider load; each unit commits before
//! the next starts, so a late failure never unwinds earlier work. The
//! user's cached schedule ETag is invalidated after the loop, on success
//! and on partial failure alike.

use crate::db::{InsertOutcome, Storage};
use crate::error::AppError;
use crate::models::TrainingActivity;
use crate::services::classifier::{classify, ActivityMetrics, ClassifierConfig};
use crate::services::etag::{ResponseCache, SCHEDULES_RESOURCE};
use crate::services::provider::{ProviderActivity, ProviderClient, ProviderTokenManager};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// How far back a sync reaches when the caller gives no start date.
const DEFAULT_SYNC_WINDOW_DAYS: i64 = 14;

/// Counts from one sync pass.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub ingested: usize,
    /// Activities already present (idempotent skips).
    pub skipped: usize,
}

/// A user-entered activity; no provider, no laps, no stream.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ManualActivityRequest {
    pub start_date: DateTime<Utc>,
    pub distance: Option<f64>,
    pub elapsed_time: Option<i64>,
    pub average_heartrate: Option<f64>,
    /// Overrides the classifier's title when present.
    pub title: Option<String>,
}

pub struct SyncPipeline {
    store: Arc<dyn Storage>,
    client: Arc<dyn ProviderClient>,
    provider_tokens: Arc<ProviderTokenManager>,
    response_cache: Arc<ResponseCache>,
    classifier_config: ClassifierConfig,
}

impl SyncPipeline {
    pub fn new(
        store: Arc<dyn Storage>,
        client: Arc<dyn ProviderClient>,
        provider_tokens: Arc<ProviderTokenManager>,
        response_cache: Arc<ResponseCache>,
        classifier_config: ClassifierConfig,
    ) -> Self {
        Self {
            store,
            client,
            provider_tokens,
            response_cache,
            classifier_config,
        }
    }

    /// Fetch and ingest activities started at or after `since` (Unix
    /// timestamp; defaults to 14 days back).
    pub async fn sync_new_activities(
        &self,
        user_id: Uuid,
        since: Option<i64>,
    ) -> Result<SyncReport, AppError> {
        let access_token = self.provider_tokens.get_valid_access_token(user_id).await?;

        let after = since.unwrap_or_else(|| {
            (Utc::now() - Duration::days(DEFAULT_SYNC_WINDOW_DAYS)).timestamp()
        });

        let activities = self.client.list_activities(&access_token, after).await?;

        let mut report = SyncReport {
            fetched: activities.len(),
            ..Default::default()
        };
        let mut failure = None;

        for activity in &activities {
            match self.ingest_one(user_id, &access_token, activity).await {
                Ok(InsertOutcome::Created) => report.ingested += 1,
                Ok(InsertOutcome::AlreadyExists) => {
                    tracing::debug!(
                        user_id = %user_id,
                        external_id = activity.id,
                        "Activity already ingested, skipping"
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        external_id = activity.id,
                        error = %e,
                        "Sync stopped mid-batch"
                    );
                    failure = Some(e);
                    break;
                }
            }
        }

        // Earlier activities are already committed, so the cached schedule
        // list is stale even when the loop died partway.
        let invalidated = self
            .response_cache
            .invalidate(user_id, SCHEDULES_RESOURCE)
            .await;

        if let Some(e) = failure {
            return Err(e);
        }
        invalidated?;

        tracing::info!(
            user_id = %user_id,
            fetched = report.fetched,
            ingested = report.ingested,
            skipped = report.skipped,
            "Sync complete"
        );
        Ok(report)
    }

    /// Fetch one activity's laps and stream, classify, persist as a unit.
    async fn ingest_one(
        &self,
        user_id: Uuid,
        access_token: &str,
        activity: &ProviderActivity,
    ) -> Result<InsertOutcome, AppError> {
        // Laps and stream are independent fetches.
        let (laps, stream) = tokio::try_join!(
            self.client.fetch_laps(access_token, activity.id),
            self.client.fetch_stream(access_token, activity.id),
        )?;

        let metrics = ActivityMetrics {
            distance: activity.distance,
            elapsed_time: activity.elapsed_time,
            average_heartrate: activity.average_heartrate,
        };
        let classification = classify(&metrics, &laps, &stream, &self.classifier_config);

        let record = TrainingActivity {
            id: Uuid::new_v4(),
            user_id,
            provider: Some(self.client.name().to_string()),
            external_activity_id: Some(activity.id),
            start_date: activity.start_date,
            distance: activity.distance,
            elapsed_time: activity.elapsed_time,
            average_speed: activity.average_speed,
            max_speed: activity.max_speed,
            average_heartrate: activity.average_heartrate,
            max_heartrate: activity.max_heartrate,
            average_cadence: activity.average_cadence,
            title: classification.title,
            detail: classification.detail,
            created_at: Utc::now(),
        };

        self.store
            .insert_activity(&record, &laps, Some(&stream))
            .await
    }

    /// Persist a user-entered activity under the same
    /// persist-then-invalidate contract as ingestion.
    pub async fn upload_manual_activity(
        &self,
        user_id: Uuid,
        request: ManualActivityRequest,
    ) -> Result<TrainingActivity, AppError> {
        if request.distance.is_some_and(|d| d <= 0.0) {
            return Err(AppError::Validation("distance must be positive".to_string()));
        }
        if request.elapsed_time.is_some_and(|t| t <= 0) {
            return Err(AppError::Validation(
                "elapsed_time must be positive".to_string(),
            ));
        }

        let metrics = ActivityMetrics {
            distance: request.distance,
            elapsed_time: request.elapsed_time,
            average_heartrate: request.average_heartrate,
        };
        let classification = classify(
            &metrics,
            &[],
            &Default::default(),
            &self.classifier_config,
        );

        let record = TrainingActivity {
            id: Uuid::new_v4(),
            user_id,
            provider: None,
            external_activity_id: None,
            start_date: request.start_date,
            distance: request.distance,
            elapsed_time: request.elapsed_time,
            average_speed: average_speed_of(&request),
            max_speed: None,
            average_heartrate: request.average_heartrate,
            max_heartrate: None,
            average_cadence: None,
            title: request.title.unwrap_or(classification.title),
            detail: classification.detail,
            created_at: Utc::now(),
        };

        self.store.insert_activity(&record, &[], None).await?;
        self.response_cache
            .invalidate(user_id, SCHEDULES_RESOURCE)
            .await?;

        tracing::info!(user_id = %user_id, activity_id = %record.id, "Manual activity uploaded");
        Ok(record)
    }
}

fn average_speed_of(request: &ManualActivityRequest) -> Option<f64> {
    match (request.distance, request.elapsed_time) {
        (Some(d), Some(t)) if t > 0 => Some(d / t as f64),
        _ => None,
    }
}
