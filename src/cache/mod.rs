//! 解析缓存
//!
//! - memory: 进程内 moka 缓存，按条目 TTL 过期
//! - redis: 多实例共享
//! - none: 不缓存

mod moka;
mod null;
mod redis;
mod traits;

use std::sync::Arc;

use tracing::{info, warn};

pub use self::moka::MokaMappingCache;
pub use self::null::NullMappingCache;
pub use self::redis::RedisMappingCache;
pub use self::traits::{CachedTarget, MappingCache};

use crate::config::CacheConfig;
use crate::errors::{Result, ShortpoolError};

pub struct CacheFactory;

impl CacheFactory {
    /// 按配置创建缓存
    ///
    /// Redis 不可用时退化为不缓存，只损失延迟。
    pub async fn create(config: &CacheConfig) -> Result<Arc<dyn MappingCache>> {
        let cache: Arc<dyn MappingCache> = match config.cache_type.as_str() {
            "memory" => Arc::new(MokaMappingCache::new(config)),
            "redis" => match RedisMappingCache::connect(&config.redis).await {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    warn!(
                        "Redis cache unavailable ({}), resolving without a cache",
                        e
                    );
                    Arc::new(NullMappingCache)
                }
            },
            "none" => Arc::new(NullMappingCache),
            other => {
                return Err(ShortpoolError::config(format!(
                    "未知的缓存类型: '{}'. Valid: memory, redis, none",
                    other
                )));
            }
        };

        info!("Resolution cache backend: {}", cache.backend_name());
        Ok(cache)
    }
}
