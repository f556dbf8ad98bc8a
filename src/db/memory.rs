//! In-memory storage adapter.
//!
//! Backs tests and local development. Uniqueness on
//! (provider, external_activity_id) is enforced through a DashMap entry
//! reservation, so duplicate detection is atomic rather than
//! check-then-insert.

use crate::db::{InsertOutcome, Storage};
use crate::error::Result;
use crate::models::{
    ActivityDetail, Lap, ProviderTokenRecord, RefreshTokenRecord, StreamData, TrainingActivity,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// DashMap-backed store.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    refresh_tokens: DashMap<(Uuid, Uuid), RefreshTokenRecord>,
    provider_tokens: DashMap<(Uuid, String), ProviderTokenRecord>,
    activities: DashMap<Uuid, TrainingActivity>,
    /// Laps and stream keyed by parent activity id; removed with the parent.
    activity_children: DashMap<Uuid, (Vec<Lap>, Option<StreamData>)>,
    /// Uniqueness index for ingested activities.
    external_ids: DashMap<(String, i64), Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn upsert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<()> {
        self.refresh_tokens
            .insert((record.user_id, record.device_id), record.clone());
        Ok(())
    }

    async fn get_refresh_token(
        &self,
        user_id: Uuid,
        device_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>> {
        Ok(self
            .refresh_tokens
            .get(&(user_id, device_id))
            .map(|entry| entry.value().clone()))
    }

    async fn delete_refresh_token(&self, user_id: Uuid, device_id: Uuid) -> Result<()> {
        self.refresh_tokens.remove(&(user_id, device_id));
        Ok(())
    }

    async fn upsert_provider_token(&self, record: &ProviderTokenRecord) -> Result<()> {
        self.provider_tokens
            .insert((record.user_id, record.provider.clone()), record.clone());
        Ok(())
    }

    async fn get_provider_token(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<ProviderTokenRecord>> {
        Ok(self
            .provider_tokens
            .get(&(user_id, provider.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn delete_provider_token(&self, user_id: Uuid, provider: &str) -> Result<()> {
        self.provider_tokens.remove(&(user_id, provider.to_string()));
        Ok(())
    }

    async fn list_provider_tokens(&self, user_id: Uuid) -> Result<Vec<ProviderTokenRecord>> {
        Ok(self
            .provider_tokens
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn insert_activity(
        &self,
        activity: &TrainingActivity,
        laps: &[Lap],
        stream: Option<&StreamData>,
    ) -> Result<InsertOutcome> {
        // Reserve the external id first; an occupied entry is the duplicate
        // signal, equivalent to a uniqueness violation in a real database.
        if let (Some(provider), Some(external_id)) =
            (&activity.provider, activity.external_activity_id)
        {
            match self.external_ids.entry((provider.clone(), external_id)) {
                Entry::Occupied(_) => return Ok(InsertOutcome::AlreadyExists),
                Entry::Vacant(slot) => {
                    slot.insert(activity.id);
                }
            }
        }

        self.activities.insert(activity.id, activity.clone());
        self.activity_children
            .insert(activity.id, (laps.to_vec(), stream.cloned()));
        Ok(InsertOutcome::Created)
    }

    async fn list_activities(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrainingActivity>> {
        let mut activities: Vec<TrainingActivity> = self
            .activities
            .iter()
            .filter(|entry| entry.value().user_id == user_id && entry.value().start_date >= since)
            .map(|entry| entry.value().clone())
            .collect();
        activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(activities)
    }

    async fn get_activity(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<TrainingActivity>> {
        Ok(self
            .activities
            .get(&activity_id)
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn get_activity_detail(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<ActivityDetail>> {
        if self.get_activity(user_id, activity_id).await?.is_none() {
            return Ok(None);
        }
        Ok(self
            .activity_children
            .get(&activity_id)
            .map(|entry| ActivityDetail {
                laps: entry.value().0.clone(),
                stream: entry.value().1.clone(),
            }))
    }

    async fn delete_activity(&self, user_id: Uuid, activity_id: Uuid) -> Result<()> {
        let Some(activity) = self.get_activity(user_id, activity_id).await? else {
            return Ok(());
        };
        self.activities.remove(&activity_id);
        self.activity_children.remove(&activity_id);
        if let (Some(provider), Some(external_id)) =
            (activity.provider, activity.external_activity_id)
        {
            self.external_ids.remove(&(provider, external_id));
        }
        Ok(())
    }
}
