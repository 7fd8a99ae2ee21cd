use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

pub(super) type Entries = HashMap<String, (CacheData, Option<DateTime<Utc>>)>;

pub(crate) struct InMemoryCacheStore {
    pub(super) entry: Mutex<Entries>,
}

pub(crate) struct RedisCacheStore {
    pub(super) client: redis::Client,
}

/// All methods take `&self` so concurrent requests never queue behind a
/// shared lock for the duration of a store round trip. Implementations
/// synchronize internally where they need to.
#[async_trait]
pub(crate) trait CacheStore: Send + Sync + 'static {
    /// Verify the store is usable. Called once at startup.
    async fn init(&self) -> Result<(), StorageError>;

    /// Put a value into the store without expiry.
    #[allow(dead_code)] // Used in tests
    async fn put(&self, prefix: &str, key: &str, value: CacheData) -> Result<(), StorageError>;

    /// Put a value into the store with a TTL in seconds.
    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError>;

    /// Get a value from the store. Expired entries read as absent.
    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError>;

    /// Remove a value from the store.
    async fn remove(&self, prefix: &str, key: &str) -> Result<(), StorageError>;
}
