use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{instrument, warn};

use forgecart_core::TenantId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Fire-and-forget key invalidation.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

/// Cached catalog listing for a tenant.
pub fn catalog_key(tenant_id: TenantId) -> String {
    format!("catalog:{tenant_id}")
}

/// Cached order listing for a tenant.
pub fn orders_key(tenant_id: TenantId) -> String {
    format!("orders:{tenant_id}")
}

/// Process-local cache for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, JsonValue>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, value: JsonValue) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.entries.read().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Unavailable("in-memory cache lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Redis-backed cache: invalidation is a `DEL`.
#[cfg(feature = "redis")]
#[derive(Debug, Clone)]
pub struct RedisCache {
    client: redis::Client,
}

#[cfg(feature = "redis")]
impl RedisCache {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl Cache for RedisCache {
    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        use redis::Commands;

        let client = self.client.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = client.get_connection().map_err(|e| CacheError::Unavailable(e.to_string()))?;
            let _: i64 = conn.del(&key).map_err(|e| CacheError::Unavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| CacheError::Unavailable(e.to_string()))?
    }
}

/// Clears a tenant's cached listings after an order commits.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Arc<dyn Cache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Best-effort: each key is attempted independently; failures are logged.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn invalidate_tenant(&self, tenant_id: TenantId) {
        for key in [catalog_key(tenant_id), orders_key(tenant_id)] {
            if let Err(e) = self.cache.invalidate(&key).await {
                warn!(error = %e, key = %key, "cache invalidation failed");
            }
        }
    }
}

impl core::fmt::Debug for CacheInvalidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CacheInvalidator").finish_non_exhaustive()
    }
}
