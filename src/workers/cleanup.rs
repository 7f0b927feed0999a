use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{StreamExt, stream};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::wait_for_shutdown;
use crate::cache::MappingCache;
use crate::config::StaticConfig;
use crate::engine::with_timeout;
use crate::errors::Result;
use crate::storage::MappingStore;

/// 并发失效缓存的上限
const CACHE_INVALIDATION_CONCURRENCY: usize = 16;

#[derive(Debug, Clone)]
pub struct CleanupSettings {
    pub batch_size: u64,
    pub max_batches: u32,
    pub interval: Duration,
    pub store_timeout: Duration,
    /// 批次之间的停顿
    pub pause: Duration,
}

impl CleanupSettings {
    pub fn from_config(config: &StaticConfig) -> Self {
        Self {
            batch_size: config.workers.cleanup_batch_size,
            max_batches: config.workers.cleanup_max_batches,
            interval: Duration::from_secs(config.workers.cleanup_interval_secs),
            store_timeout: Duration::from_millis(config.engine.store_timeout_ms),
            pause: Duration::from_millis(100),
        }
    }
}

/// 一次清理的结果
#[derive(Debug, Default, Clone, Serialize)]
pub struct CleanupReport {
    pub scanned: u64,
    pub deleted: u64,
    pub cache_invalidated: u64,
    pub cache_failures: u64,
    pub batches: u32,
}

/// 过期映射清理任务
///
/// 只删除映射，key 永远保持 Claimed，不会回到 key 池。
pub struct CleanupWorker {
    store: Arc<dyn MappingStore>,
    cache: Arc<dyn MappingCache>,
    settings: CleanupSettings,
}

impl CleanupWorker {
    pub fn new(
        store: Arc<dyn MappingStore>,
        cache: Arc<dyn MappingCache>,
        settings: CleanupSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    /// 分批删除过期映射
    ///
    /// 某一批失败时结束本次运行并返回错误，下次运行会继续。
    pub async fn run_once(&self) -> Result<CleanupReport> {
        let now = Utc::now();
        let mut report = CleanupReport::default();

        loop {
            if report.batches >= self.settings.max_batches {
                warn!(
                    "Cleanup reached max batches {} (deleted {} mappings), continuing next run",
                    self.settings.max_batches, report.deleted
                );
                break;
            }

            let keys = match self.run_batch(now, &mut report).await {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(
                        "Cleanup batch {} failed after deleting {} mappings: {}",
                        report.batches + 1,
                        report.deleted,
                        e
                    );
                    return Err(e);
                }
            };
            if keys == 0 {
                break;
            }
            report.batches += 1;

            if keys < self.settings.batch_size {
                break;
            }
            tokio::time::sleep(self.settings.pause).await;
        }

        info!(
            "Cleanup completed: scanned {}, deleted {}, cache invalidated {}, cache failures {}",
            report.scanned, report.deleted, report.cache_invalidated, report.cache_failures
        );
        Ok(report)
    }

    /// 处理一批，返回本批扫描到的数量
    async fn run_batch(
        &self,
        now: chrono::DateTime<Utc>,
        report: &mut CleanupReport,
    ) -> Result<u64> {
        let keys = with_timeout(
            "find_expired",
            self.settings.store_timeout,
            self.store.find_expired(now, self.settings.batch_size),
        )
        .await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let scanned = keys.len() as u64;
        report.scanned += scanned;

        let deleted = with_timeout(
            "delete_expired",
            self.settings.store_timeout,
            self.store.delete_expired(&keys, now),
        )
        .await?;
        report.deleted += deleted;
        debug!("Cleanup batch: {} expired found, {} deleted", scanned, deleted);

        // 其他实例可能已删除同一批，缓存照样失效
        let limit = self.settings.store_timeout;
        let results: Vec<bool> = stream::iter(keys)
            .map(|key| {
                let cache = Arc::clone(&self.cache);
                async move {
                    match with_timeout("cache_remove", limit, cache.remove(&key)).await {
                        Ok(()) => true,
                        Err(e) => {
                            debug!("Failed to invalidate cache entry {}: {}", key, e);
                            false
                        }
                    }
                }
            })
            .buffer_unordered(CACHE_INVALIDATION_CONCURRENCY)
            .collect()
            .await;

        let ok = results.iter().filter(|ok| **ok).count() as u64;
        report.cache_invalidated += ok;
        report.cache_failures += results.len() as u64 - ok;
        if ok < results.len() as u64 {
            warn!(
                "Cache invalidation failed for {} keys in this batch",
                results.len() as u64 - ok
            );
        }

        Ok(scanned)
    }

    /// 启动后台任务：立即运行一次，之后按间隔运行，直到收到关闭信号
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        info!(
            "Cleanup worker started (interval: {:?}, batch: {})",
            self.settings.interval, self.settings.batch_size
        );

        tokio::spawn(async move {
            loop {
                if let Err(e) = self.run_once().await {
                    error!("Expired mapping cleanup failed: {}", e);
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.settings.interval) => {}
                    _ = wait_for_shutdown(&mut shutdown) => break,
                }
            }
            info!("Cleanup worker stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachedTarget, MokaMappingCache};
    use crate::config::DatabaseConfig;
    use crate::storage::{KeyPool, KeyStatus, SeaOrmStorage, UrlMapping};
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    async fn sqlite_store(dir: &TempDir) -> Arc<SeaOrmStorage> {
        let path = dir.path().join("cleanup.db");
        let config = DatabaseConfig {
            database_url: format!("sqlite://{}?mode=rwc", path.display()),
            ..Default::default()
        };
        Arc::new(SeaOrmStorage::new(&config).await.unwrap())
    }

    fn settings(batch_size: u64, max_batches: u32) -> CleanupSettings {
        CleanupSettings {
            batch_size,
            max_batches,
            interval: Duration::from_secs(3600),
            store_timeout: Duration::from_secs(5),
            pause: Duration::from_millis(1),
        }
    }

    async fn seed(store: &SeaOrmStorage, cache: &MokaMappingCache, key: &str, expired: bool) {
        let offset = if expired {
            ChronoDuration::seconds(-60)
        } else {
            ChronoDuration::hours(1)
        };
        let mapping = UrlMapping::new(key, "https://example.com/", Some(Utc::now() + offset));
        assert!(store.insert_claimed(key).await.unwrap());
        store.insert_mapping(&mapping).await.unwrap();
        cache
            .insert(key, CachedTarget::from(&mapping), Duration::from_secs(60))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deletes_only_expired_and_invalidates_cache() {
        let dir = TempDir::new().unwrap();
        let store = sqlite_store(&dir).await;
        let cache = Arc::new(MokaMappingCache::with_capacity(100));
        seed(&store, &cache, "old1", true).await;
        seed(&store, &cache, "old2", true).await;
        seed(&store, &cache, "live", false).await;

        let worker = CleanupWorker::new(
            Arc::clone(&store) as Arc<dyn MappingStore>,
            Arc::clone(&cache) as Arc<dyn MappingCache>,
            settings(100, 10),
        );
        let report = worker.run_once().await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.cache_invalidated, 2);
        assert_eq!(report.cache_failures, 0);
        assert!(store.get_mapping("old1").await.unwrap().is_none());
        assert!(store.get_mapping("live").await.unwrap().is_some());
        assert!(cache.get("old2").await.unwrap().is_none());
        assert!(cache.get("live").await.unwrap().is_some());

        // key 不会回到 key 池
        let record = store.get_key("old1").await.unwrap().unwrap();
        assert_eq!(record.status, KeyStatus::Claimed);
        assert_eq!(store.count_unused().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = sqlite_store(&dir).await;
        let cache = Arc::new(MokaMappingCache::with_capacity(100));
        seed(&store, &cache, "gone", true).await;

        let worker = CleanupWorker::new(
            Arc::clone(&store) as Arc<dyn MappingStore>,
            Arc::clone(&cache) as Arc<dyn MappingCache>,
            settings(100, 10),
        );
        assert_eq!(worker.run_once().await.unwrap().deleted, 1);

        let again = worker.run_once().await.unwrap();
        assert_eq!(again.scanned, 0);
        assert_eq!(again.deleted, 0);
        assert_eq!(again.batches, 0);
    }

    #[tokio::test]
    async fn test_batches_are_bounded() {
        let dir = TempDir::new().unwrap();
        let store = sqlite_store(&dir).await;
        let cache = Arc::new(MokaMappingCache::with_capacity(100));
        for i in 0..7 {
            seed(&store, &cache, &format!("exp{}", i), true).await;
        }

        let worker = CleanupWorker::new(
            Arc::clone(&store) as Arc<dyn MappingStore>,
            Arc::clone(&cache) as Arc<dyn MappingCache>,
            settings(2, 2),
        );
        let report = worker.run_once().await.unwrap();
        assert_eq!(report.batches, 2);
        assert_eq!(report.deleted, 4);

        let rest = worker.run_once().await.unwrap();
        assert_eq!(rest.deleted, 3);
        assert_eq!(store.mapping_stats(Utc::now()).await.unwrap().total, 0);
    }
}
