use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use tracing::debug;

use super::{CachedTarget, MappingCache};
use crate::config::CacheConfig;
use crate::errors::Result;

#[derive(Clone)]
struct CacheSlot {
    target: CachedTarget,
    ttl: Duration,
}

/// 按写入时给定的 TTL 过期
struct SlotExpiry;

impl Expiry<String, CacheSlot> for SlotExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheSlot,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheSlot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// 进程内缓存
pub struct MokaMappingCache {
    inner: Cache<String, CacheSlot>,
}

impl MokaMappingCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_capacity(config.memory.max_capacity)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(SlotExpiry)
            .build();

        debug!(
            "MokaMappingCache initialized with max capacity: {}",
            max_capacity
        );
        Self { inner }
    }
}

#[async_trait]
impl MappingCache for MokaMappingCache {
    async fn get(&self, key: &str) -> Result<Option<CachedTarget>> {
        Ok(self.inner.get(key).await.map(|slot| slot.target))
    }

    async fn insert(&self, key: &str, value: CachedTarget, ttl: Duration) -> Result<()> {
        self.inner
            .insert(key.to_string(), CacheSlot { target: value, ttl })
            .await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
