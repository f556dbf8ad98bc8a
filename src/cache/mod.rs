//! Key-value cache layer.
//!
//! The read path stores ETags here; anything else that needs a TTL'd string
//! value can share the same seam. The bundled adapter is in-memory.

pub mod memory;

pub use memory::InMemoryKv;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Get / set-with-TTL / delete by string key.
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}
