//! Storage layer.
//!
//! Persistence plumbing lives behind the [`Storage`] trait; the bundled
//! adapter is the in-memory [`MemoryStore`]. The store enforces the
//! (provider, external_activity_id) uniqueness constraint and the
//! cascade-delete from an activity to its laps and stream.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{
    ActivityDetail, Lap, ProviderTokenRecord, RefreshTokenRecord, StreamData, TrainingActivity,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Outcome of an idempotent activity insert.
///
/// Duplicate detection happens inside the store (on its uniqueness
/// constraint), so the ingestion loop never races a pre-check against a
/// concurrent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    /// A row with the same (provider, external_activity_id) already exists.
    AlreadyExists,
}

/// Typed persistence operations for the five stored entity kinds.
#[async_trait]
pub trait Storage: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    // ─── Account refresh tokens ──────────────────────────────────

    /// Create or overwrite the row for (user_id, device_id).
    async fn upsert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<()>;

    async fn get_refresh_token(
        &self,
        user_id: Uuid,
        device_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>>;

    /// Idempotent: deleting an absent row is not an error.
    async fn delete_refresh_token(&self, user_id: Uuid, device_id: Uuid) -> Result<()>;

    // ─── Provider tokens ─────────────────────────────────────────

    /// Create or overwrite the row for (user_id, provider).
    async fn upsert_provider_token(&self, record: &ProviderTokenRecord) -> Result<()>;

    async fn get_provider_token(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<ProviderTokenRecord>>;

    /// Idempotent: deleting an absent row is not an error.
    async fn delete_provider_token(&self, user_id: Uuid, provider: &str) -> Result<()>;

    async fn list_provider_tokens(&self, user_id: Uuid) -> Result<Vec<ProviderTokenRecord>>;

    // ─── Training activities ─────────────────────────────────────

    /// Persist an activity with its laps and stream as one unit.
    ///
    /// Returns [`InsertOutcome::AlreadyExists`] without writing anything when
    /// the (provider, external_activity_id) pair is already present.
    async fn insert_activity(
        &self,
        activity: &TrainingActivity,
        laps: &[Lap],
        stream: Option<&StreamData>,
    ) -> Result<InsertOutcome>;

    /// Activities for a user starting at or after `since`, newest first.
    async fn list_activities(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrainingActivity>>;

    async fn get_activity(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<TrainingActivity>>;

    /// Laps and stream for one activity.
    async fn get_activity_detail(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<ActivityDetail>>;

    /// Delete an activity and cascade to its laps and stream.
    async fn delete_activity(&self, user_id: Uuid, activity_id: Uuid) -> Result<()>;
}
