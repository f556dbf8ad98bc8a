//! In-memory TTL cache adapter.

use crate::cache::KvCache;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// DashMap-backed cache with lazy expiry: entries past their deadline are
/// dropped on the read that finds them.
#[derive(Default)]
pub struct InMemoryKv {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvCache for InMemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            let (value, deadline) = entry.value();
            if Instant::now() < *deadline {
                return Ok(Some(value.clone()));
            }
        } else {
            return Ok(None);
        }
        // Expired; remove outside the read guard.
        self.entries.remove(key);
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
