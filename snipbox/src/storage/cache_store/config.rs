use std::{env, sync::LazyLock};

use super::types::{CacheStore, InMemoryCacheStore, RedisCacheStore};

pub static CACHE_STORE_TYPE: LazyLock<String> =
    LazyLock::new(|| env::var("CACHE_STORE_TYPE").unwrap_or_else(|_| "memory".to_string()));

pub static CACHE_STORE_URL: LazyLock<String> =
    LazyLock::new(|| env::var("CACHE_STORE_URL").unwrap_or_default());

// A bare trait object, no outer lock: the store methods take `&self` and
// synchronize internally, so callers never hold a global lock across a
// store round trip.
pub(crate) static GENERIC_CACHE_STORE: LazyLock<Box<dyn CacheStore>> = LazyLock::new(|| {
    let store_type = CACHE_STORE_TYPE.as_str();
    let store_url = CACHE_STORE_URL.as_str();

    tracing::info!("Initializing cache store with type: {}", store_type);

    let store: Box<dyn CacheStore> = match store_type {
        "memory" => Box::new(InMemoryCacheStore::new()),
        "redis" => {
            let client = match redis::Client::open(store_url) {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!("Failed to create Redis client: {}", e);
                    panic!("Failed to create Redis client: {e}");
                }
            };
            Box::new(RedisCacheStore { client })
        }
        t => panic!("Unsupported cache store type: {t}. Supported types are 'memory' and 'redis'"),
    };

    store
});
