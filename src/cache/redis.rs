use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::{CachedTarget, MappingCache};
use crate::config::RedisConfig;
use crate::errors::{Result, ShortpoolError};

/// 多实例共享的 Redis 缓存
pub struct RedisMappingCache {
    client: redis::Client,
    /// 持久化连接，出错时置空，下次调用重新建立
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisMappingCache {
    /// 创建客户端并 PING 一次，确认服务可用
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            ShortpoolError::cache_connection(format!("Redis URL 无效 ({}): {}", config.url, e))
        })?;

        let cache = Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: config.key_prefix.clone(),
        };

        let mut conn = cache.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(
            "Redis connection test successful: {} (prefix '{}')",
            pong, cache.key_prefix
        );

        Ok(cache)
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// 执行命令，连接级错误时重置连接
    async fn on_error<T>(&self, result: redis::RedisResult<T>) -> Result<T> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => {
                self.reset_connection().await;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl MappingCache for RedisMappingCache {
    async fn get(&self, key: &str) -> Result<Option<CachedTarget>> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = self.on_error(conn.get(self.make_key(key)).await).await?;

        match raw {
            Some(data) => {
                let target: CachedTarget = serde_json::from_str(&data)?;
                trace!("Redis cache hit: {}", key);
                Ok(Some(target))
            }
            None => {
                trace!("Redis cache miss: {}", key);
                Ok(None)
            }
        }
    }

    async fn insert(&self, key: &str, value: CachedTarget, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(&value)?;
        let ttl_ms = (ttl.as_millis() as u64).max(1);

        let mut conn = self.get_connection().await?;
        self.on_error(
            conn.pset_ex::<String, String, ()>(self.make_key(key), payload, ttl_ms)
                .await,
        )
        .await?;
        trace!("Redis cache insert: {} (ttl {} ms)", key, ttl_ms);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let deleted: i64 = self
            .on_error(conn.del::<String, i64>(self.make_key(key)).await)
            .await?;
        trace!("Redis cache remove: {} ({} deleted)", key, deleted);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
