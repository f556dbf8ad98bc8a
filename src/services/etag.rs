// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ETag response cache.
//!
//! One cached ETag per (user, resource). A matching client ETag
//! short-circuits the read; otherwise the result set is recomputed, hashed
//! over its canonical compact serialization, stored with a TTL, and
//! returned. Writers invalidate by deleting the key; there is no partial
//! invalidation.

use crate::cache::KvCache;
use crate::error::AppError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Resource key for the activity-schedule list.
pub const SCHEDULES_RESOURCE: &str = "schedules";

/// Outcome of a cache-aware read.
#[derive(Debug)]
pub enum CacheOutcome<T> {
    /// The client already holds the current representation.
    NotModified,
    Fresh { etag: String, data: T },
}

pub struct ResponseCache {
    kv: Arc<dyn KvCache>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(kv: Arc<dyn KvCache>, ttl_secs: u64) -> Self {
        Self {
            kv,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    fn key(user_id: Uuid, resource: &str) -> String {
        format!("user:{}:page:{}:etag", user_id, resource)
    }

    /// Serve a read through the cache.
    ///
    /// `compute` runs only when the client's ETag misses; its result is
    /// hashed, the hash stored under a TTL, and both returned.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        user_id: Uuid,
        resource: &str,
        client_etag: Option<&str>,
        compute: F,
    ) -> Result<CacheOutcome<T>, AppError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let key = Self::key(user_id, resource);

        if let (Some(stored), Some(client)) = (self.kv.get(&key).await?, client_etag) {
            if stored == client {
                return Ok(CacheOutcome::NotModified);
            }
        }

        let data = compute().await?;
        let etag = compute_etag(&data).await?;

        self.kv.set_with_ttl(&key, &etag, self.ttl).await?;
        Ok(CacheOutcome::Fresh { etag, data })
    }

    /// Drop the stored ETag for (user, resource) so the next read
    /// recomputes. Called by every successful write to the underlying data.
    pub async fn invalidate(&self, user_id: Uuid, resource: &str) -> Result<(), AppError> {
        self.kv.delete(&Self::key(user_id, resource)).await
    }
}

/// Content hash over the canonical (compact, stable field order)
/// serialization. The hash runs off the async scheduler.
async fn compute_etag<T: Serialize>(data: &T) -> Result<String, AppError> {
    let canonical = serde_json::to_string(data)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("ETag serialization failed: {}", e)))?;

    tokio::task::spawn_blocking(move || hex::encode(Sha256::digest(canonical.as_bytes())))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("ETag hashing task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryKv;

    fn cache() -> ResponseCache {
        ResponseCache::new(Arc::new(InMemoryKv::new()), 60)
    }

    #[tokio::test]
    async fn test_fresh_then_not_modified() {
        let cache = cache();
        let user_id = Uuid::new_v4();

        let first = cache
            .get_or_compute(user_id, SCHEDULES_RESOURCE, None, || async {
                Ok(vec!["a", "b"])
            })
            .await
            .unwrap();
        let etag = match first {
            CacheOutcome::Fresh { etag, data } => {
                assert_eq!(data, vec!["a", "b"]);
                etag
            }
            CacheOutcome::NotModified => panic!("first read must compute"),
        };

        let recomputed = std::sync::atomic::AtomicBool::new(false);
        let second = cache
            .get_or_compute(user_id, SCHEDULES_RESOURCE, Some(&etag), || async {
                recomputed.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(vec!["a", "b"])
            })
            .await
            .unwrap();
        assert!(matches!(second, CacheOutcome::NotModified));
        assert!(!recomputed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stale_client_etag_recomputes() {
        let cache = cache();
        let user_id = Uuid::new_v4();

        cache
            .get_or_compute(user_id, SCHEDULES_RESOURCE, None, || async { Ok(1u32) })
            .await
            .unwrap();

        let outcome = cache
            .get_or_compute(user_id, SCHEDULES_RESOURCE, Some("stale"), || async {
                Ok(2u32)
            })
            .await
            .unwrap();
        assert!(matches!(outcome, CacheOutcome::Fresh { data: 2, .. }));
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let cache = cache();
        let user_id = Uuid::new_v4();

        let etag = match cache
            .get_or_compute(user_id, SCHEDULES_RESOURCE, None, || async { Ok(1u32) })
            .await
            .unwrap()
        {
            CacheOutcome::Fresh { etag, .. } => etag,
            CacheOutcome::NotModified => unreachable!(),
        };

        cache.invalidate(user_id, SCHEDULES_RESOURCE).await.unwrap();

        // Same client etag, but the stored entry is gone.
        let outcome = cache
            .get_or_compute(user_id, SCHEDULES_RESOURCE, Some(&etag), || async {
                Ok(2u32)
            })
            .await
            .unwrap();
        assert!(matches!(outcome, CacheOutcome::Fresh { data: 2, .. }));
    }

    #[tokio::test]
    async fn test_equal_content_produces_equal_etag() {
        let cache = cache();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();

        let etag_of = |outcome: CacheOutcome<Vec<u32>>| match outcome {
            CacheOutcome::Fresh { etag, .. } => etag,
            CacheOutcome::NotModified => unreachable!(),
        };

        let a = etag_of(
            cache
                .get_or_compute(user_a, SCHEDULES_RESOURCE, None, || async {
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap(),
        );
        let b = etag_of(
            cache
                .get_or_compute(user_b, SCHEDULES_RESOURCE, None, || async {
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap(),
        );
        assert_eq!(a, b);
    }
}
