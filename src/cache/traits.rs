use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::storage::UrlMapping;

/// 缓存中保存的解析目标
///
/// 携带 `expires_at`，命中时可以拒绝已过期的条目。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTarget {
    pub long_url: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedTarget {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

impl From<&UrlMapping> for CachedTarget {
    fn from(mapping: &UrlMapping) -> Self {
        Self {
            long_url: mapping.long_url.clone(),
            expires_at: mapping.expires_at,
        }
    }
}

/// 解析缓存
///
/// 从不作为权威数据；所有错误都由调用方记录后忽略。
#[async_trait]
pub trait MappingCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedTarget>>;

    async fn insert(&self, key: &str, value: CachedTarget, ttl: Duration) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}
