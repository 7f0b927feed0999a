use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use super::{CachedTarget, MappingCache};
use crate::errors::Result;

/// 不缓存任何内容，所有解析都走存储
pub struct NullMappingCache;

#[async_trait]
impl MappingCache for NullMappingCache {
    async fn get(&self, key: &str) -> Result<Option<CachedTarget>> {
        trace!("NullMappingCache.get called for key: {}", key);
        Ok(None)
    }

    async fn insert(&self, key: &str, _value: CachedTarget, _ttl: Duration) -> Result<()> {
        trace!("NullMappingCache.insert called for key: {}", key);
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}
