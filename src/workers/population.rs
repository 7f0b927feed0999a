use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::wait_for_shutdown;
use crate::config::StaticConfig;
use crate::engine::with_timeout;
use crate::errors::Result;
use crate::keys::KeyGenerator;
use crate::storage::KeyPool;

#[derive(Debug, Clone)]
pub struct PopulationSettings {
    pub low_water_mark: u64,
    pub batch_size: usize,
    pub insert_chunk_size: usize,
    pub interval: Duration,
    pub store_timeout: Duration,
}

impl PopulationSettings {
    pub fn from_config(config: &StaticConfig) -> Self {
        Self {
            low_water_mark: config.keys.low_water_mark,
            batch_size: config.keys.batch_size,
            insert_chunk_size: config.keys.insert_chunk_size,
            interval: Duration::from_secs(config.workers.population_interval_secs),
            store_timeout: Duration::from_millis(config.engine.store_timeout_ms),
        }
    }
}

/// 一次补充的结果
#[derive(Debug, Default, Clone, Serialize)]
pub struct PopulationReport {
    pub unused_before: u64,
    pub requested: usize,
    pub inserted: u64,
    /// 批内重复 + 与已有 key 冲突
    pub duplicates: u64,
    pub failed_chunks: usize,
    /// 高于水位，未生成
    pub skipped: bool,
}

/// key 池补充任务
pub struct PopulationWorker {
    pool: Arc<dyn KeyPool>,
    generator: KeyGenerator,
    settings: PopulationSettings,
    replenish: Arc<Notify>,
}

impl PopulationWorker {
    pub fn new(
        pool: Arc<dyn KeyPool>,
        generator: KeyGenerator,
        settings: PopulationSettings,
    ) -> Self {
        Self {
            pool,
            generator,
            settings,
            replenish: Arc::new(Notify::new()),
        }
    }

    /// 引擎在 key 池耗尽时通过它唤醒本任务
    pub fn replenish_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.replenish)
    }

    /// 低于水位时补充一批
    pub async fn run_once(&self) -> Result<PopulationReport> {
        self.run_with(false, None).await
    }

    /// `force` 忽略水位；`count` 覆盖批量大小
    pub async fn run_with(&self, force: bool, count: Option<usize>) -> Result<PopulationReport> {
        let unused = with_timeout(
            "count_unused",
            self.settings.store_timeout,
            self.pool.count_unused(),
        )
        .await?;

        let mut report = PopulationReport {
            unused_before: unused,
            ..Default::default()
        };

        if unused < self.settings.low_water_mark {
            warn!(
                "Key pool below low-water mark: {} unused (threshold {})",
                unused, self.settings.low_water_mark
            );
        } else if !force {
            debug!(
                "Key pool healthy: {} unused (threshold {})",
                unused, self.settings.low_water_mark
            );
            report.skipped = true;
            return Ok(report);
        }

        let requested = count.unwrap_or(self.settings.batch_size);
        report.requested = requested;

        let (keys, batch_duplicates) = self.generator.generate_batch(requested);
        report.duplicates = batch_duplicates as u64;

        for chunk in keys.chunks(self.settings.insert_chunk_size.max(1)) {
            match with_timeout(
                "insert_unused",
                self.settings.store_timeout,
                self.pool.insert_unused(chunk),
            )
            .await
            {
                Ok(inserted) => {
                    report.inserted += inserted;
                    report.duplicates += (chunk.len() as u64).saturating_sub(inserted);
                }
                Err(e) => {
                    report.failed_chunks += 1;
                    error!(
                        "Failed to insert key chunk of {} keys: {}",
                        chunk.len(),
                        e
                    );
                }
            }
        }

        info!(
            "Key pool populated: {} inserted, {} duplicates skipped, {} failed chunks (unused before: {})",
            report.inserted, report.duplicates, report.failed_chunks, report.unused_before
        );
        Ok(report)
    }

    /// 启动后台任务：立即运行一次，之后按间隔或被唤醒时运行，直到收到关闭信号
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        info!(
            "Population worker started (interval: {:?}, low-water mark: {}, batch: {})",
            self.settings.interval, self.settings.low_water_mark, self.settings.batch_size
        );

        tokio::spawn(async move {
            loop {
                if let Err(e) = self.run_once().await {
                    error!("Key pool population failed: {}", e);
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.settings.interval) => {}
                    _ = self.replenish.notified() => {
                        debug!("Population worker woken by replenish signal");
                    }
                    _ = wait_for_shutdown(&mut shutdown) => break,
                }
            }
            info!("Population worker stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::SeaOrmStorage;
    use tempfile::TempDir;

    async fn sqlite_pool(dir: &TempDir) -> Arc<SeaOrmStorage> {
        let path = dir.path().join("population.db");
        let config = DatabaseConfig {
            database_url: format!("sqlite://{}?mode=rwc", path.display()),
            ..Default::default()
        };
        Arc::new(SeaOrmStorage::new(&config).await.unwrap())
    }

    fn settings(low_water_mark: u64, batch_size: usize) -> PopulationSettings {
        PopulationSettings {
            low_water_mark,
            batch_size,
            insert_chunk_size: 40,
            interval: Duration::from_secs(3600),
            store_timeout: Duration::from_secs(5),
        }
    }

    fn worker(pool: Arc<SeaOrmStorage>, low: u64, batch: usize) -> PopulationWorker {
        let generator = KeyGenerator::new("abcdefghijklmnopqrstuvwxyz0123456789", 8).unwrap();
        PopulationWorker::new(pool, generator, settings(low, batch))
    }

    #[tokio::test]
    async fn test_populates_below_low_water_mark() {
        let dir = TempDir::new().unwrap();
        let pool = sqlite_pool(&dir).await;
        let worker = worker(Arc::clone(&pool), 50, 100);

        let report = worker.run_once().await.unwrap();
        assert!(!report.skipped);
        assert_eq!(report.unused_before, 0);
        assert_eq!(report.requested, 100);
        assert_eq!(report.failed_chunks, 0);
        assert_eq!(report.inserted, 100);
        assert_eq!(pool.count_unused().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_skips_at_or_above_low_water_mark() {
        let dir = TempDir::new().unwrap();
        let pool = sqlite_pool(&dir).await;
        let worker = worker(Arc::clone(&pool), 10, 100);

        worker.run_once().await.unwrap();
        let before = pool.count_unused().await.unwrap();
        assert!(before >= 10);

        let report = worker.run_once().await.unwrap();
        assert!(report.skipped);
        assert_eq!(report.inserted, 0);
        assert_eq!(pool.count_unused().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_force_with_explicit_count() {
        let dir = TempDir::new().unwrap();
        let pool = sqlite_pool(&dir).await;
        let worker = worker(Arc::clone(&pool), 0, 100);

        let report = worker.run_with(true, Some(30)).await.unwrap();
        assert!(!report.skipped);
        assert_eq!(report.requested, 30);
        assert_eq!(report.inserted, 30);
    }

    #[tokio::test]
    async fn test_duplicates_are_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let pool = sqlite_pool(&dir).await;
        // 2 个字符、长度 3：只有 8 个可能的 key
        let generator = KeyGenerator::new("ab", 3).unwrap();
        let worker = PopulationWorker::new(
            Arc::clone(&pool) as Arc<dyn KeyPool>,
            generator,
            settings(1000, 50),
        );

        let first = worker.run_once().await.unwrap();
        let second = worker.run_once().await.unwrap();

        assert_eq!(first.failed_chunks + second.failed_chunks, 0);
        assert!(second.duplicates > 0);
        let stats = pool.pool_stats().await.unwrap();
        assert!(stats.total <= 8);
        assert_eq!(stats.unused, first.inserted + second.inserted);
    }

    #[tokio::test]
    async fn test_spawn_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let pool = sqlite_pool(&dir).await;
        let worker = Arc::new(worker(Arc::clone(&pool), 20, 40));
        let shutdown = crate::workers::Shutdown::new();

        let handle = Arc::clone(&worker).spawn(shutdown.subscribe());
        for _ in 0..100 {
            if pool.count_unused().await.unwrap() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(pool.count_unused().await.unwrap() > 0);
    }
}
