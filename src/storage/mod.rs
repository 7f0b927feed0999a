use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::DatabaseConfig;
use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::SeaOrmStorage;
pub use models::{ClaimOptions, KeyRecord, KeyStatus, MappingStats, PoolStats, UrlMapping};

/// 持久化 key 池
///
/// `claim` 是唯一的互斥点：任意并发下同一个 key 只会交给一个调用方。
#[async_trait]
pub trait KeyPool: Send + Sync {
    /// 原子地领取一个 Unused key
    ///
    /// 只有读不到任何 Unused key 时才返回 `PoolExhausted`；竞争失败会重新读取候选。
    async fn claim(&self, options: ClaimOptions) -> Result<String>;

    /// 以 Claimed 状态插入一个新 key；已存在时返回 `false`
    async fn insert_claimed(&self, key: &str) -> Result<bool>;

    /// 以 Unused 状态批量插入，跳过已存在的 key，返回实际插入数
    async fn insert_unused(&self, keys: &[String]) -> Result<u64>;

    async fn count_unused(&self) -> Result<u64>;

    async fn pool_stats(&self) -> Result<PoolStats>;

    async fn get_key(&self, key: &str) -> Result<Option<KeyRecord>>;
}

/// 映射存储（缓存未命中时的事实来源）
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn insert_mapping(&self, mapping: &UrlMapping) -> Result<()>;

    async fn get_mapping(&self, short_key: &str) -> Result<Option<UrlMapping>>;

    /// 仅当映射在 `now` 时已过期才删除
    async fn delete_if_expired(&self, short_key: &str, now: DateTime<Utc>) -> Result<bool>;

    /// 按 key 顺序返回最多 `limit` 个已过期映射的 key
    async fn find_expired(&self, now: DateTime<Utc>, limit: u64) -> Result<Vec<String>>;

    /// 删除给定 key 中在 `now` 时已过期的映射，返回删除数
    async fn delete_expired(&self, short_keys: &[String], now: DateTime<Utc>) -> Result<u64>;

    async fn mapping_stats(&self, now: DateTime<Utc>) -> Result<MappingStats>;
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &DatabaseConfig) -> Result<Arc<SeaOrmStorage>> {
        let storage = SeaOrmStorage::new(config).await?;
        Ok(Arc::new(storage))
    }
}
