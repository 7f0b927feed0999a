//! 解析引擎
//!
//! 对外提供三个操作：
//! - `claim`: 从 key 池原子领取一个 key
//! - `create_mapping`: 领取 key（必要时按需生成）→ 写映射 → 写穿缓存
//! - `resolve`: 缓存优先，未命中时回源映射存储并回填缓存
//!
//! 所有存储调用都带截止时间并经过熔断器；缓存错误只记录日志，不影响结果。

mod breaker;
mod deadline;
mod hits;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use deadline::with_timeout;
pub use hits::{HitRecorder, HitSink};

use crate::cache::{CachedTarget, MappingCache};
use crate::config::StaticConfig;
use crate::errors::{Result, ShortpoolError};
use crate::keys::KeyGenerator;
use crate::storage::{ClaimOptions, KeyPool, MappingStore, UrlMapping};
use crate::utils::normalize_url;

/// 引擎运行参数
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_cache_ttl: Duration,
    pub store_timeout: Duration,
    pub claim: ClaimOptions,
    pub fallback_enabled: bool,
    pub fallback_max_attempts: u32,
    pub breaker: BreakerConfig,
}

impl EngineSettings {
    pub fn from_config(config: &StaticConfig) -> Self {
        Self {
            max_cache_ttl: Duration::from_secs(config.cache.max_ttl),
            store_timeout: Duration::from_millis(config.engine.store_timeout_ms),
            claim: ClaimOptions {
                window: config.keys.claim_window,
            },
            fallback_enabled: config.keys.fallback_enabled,
            fallback_max_attempts: config.keys.fallback_max_attempts,
            breaker: BreakerConfig {
                failure_threshold: config.engine.breaker_failure_threshold,
                reset_timeout: Duration::from_secs(config.engine.breaker_reset_secs),
            },
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&StaticConfig::default())
    }
}

/// `create_mapping` 的结果
#[derive(Debug, Clone, Serialize)]
pub struct CreatedMapping {
    pub short_key: String,
    pub long_url: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// key 来自按需生成而不是 key 池
    pub generated_on_demand: bool,
}

pub struct ResolutionEngine {
    pool: Arc<dyn KeyPool>,
    store: Arc<dyn MappingStore>,
    cache: Arc<dyn MappingCache>,
    generator: KeyGenerator,
    settings: EngineSettings,
    breaker: CircuitBreaker,
    hits: Option<HitRecorder>,
    replenish: Option<Arc<Notify>>,
    pending_deletes: Mutex<JoinSet<()>>,
}

impl ResolutionEngine {
    pub fn new(
        pool: Arc<dyn KeyPool>,
        store: Arc<dyn MappingStore>,
        cache: Arc<dyn MappingCache>,
        generator: KeyGenerator,
        settings: EngineSettings,
    ) -> Self {
        Self {
            pool,
            store,
            cache,
            generator,
            breaker: CircuitBreaker::new(settings.breaker),
            settings,
            hits: None,
            replenish: None,
            pending_deletes: Mutex::new(JoinSet::new()),
        }
    }

    /// 解析命中时异步累计 hit_count
    pub fn with_hit_recorder(mut self, recorder: HitRecorder) -> Self {
        self.hits = Some(recorder);
        self
    }

    /// key 池耗尽时唤醒补充任务
    pub fn with_replenish_signal(mut self, signal: Arc<Notify>) -> Self {
        self.replenish = Some(signal);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// 经过熔断器并带截止时间的存储调用
    async fn guarded<T, F>(&self, operation_name: &str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        self.breaker.try_acquire()?;
        let result = with_timeout(operation_name, self.settings.store_timeout, fut).await;
        match &result {
            Err(ShortpoolError::StoreUnavailable(_)) | Err(ShortpoolError::Timeout(_)) => {
                self.breaker.record_failure()
            }
            _ => self.breaker.record_success(),
        }
        result
    }

    fn signal_replenish(&self) {
        if let Some(signal) = &self.replenish {
            signal.notify_one();
        }
    }

    /// 从 key 池领取一个 key
    pub async fn claim(&self) -> Result<String> {
        let result = self
            .guarded("claim", self.pool.claim(self.settings.claim))
            .await;
        if let Err(ShortpoolError::PoolExhausted(msg)) = &result {
            debug!("Key pool exhausted: {}", msg);
            self.signal_replenish();
        }
        result
    }

    /// 领取 key，key 池耗尽时按需生成
    ///
    /// 返回 (key, 是否按需生成)。
    pub async fn claim_or_generate(&self) -> Result<(String, bool)> {
        match self.claim().await {
            Ok(key) => Ok((key, false)),
            Err(ShortpoolError::PoolExhausted(msg)) => {
                if !self.settings.fallback_enabled {
                    return Err(ShortpoolError::PoolExhausted(msg));
                }
                warn!("Key pool exhausted ({}), generating key on demand", msg);
                let key = self.generate_on_demand().await?;
                Ok((key, true))
            }
            Err(e) => Err(e),
        }
    }

    async fn generate_on_demand(&self) -> Result<String> {
        let max_attempts = self.settings.fallback_max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let candidate = self.generator.generate();
            if self
                .guarded("insert_claimed", self.pool.insert_claimed(&candidate))
                .await?
            {
                debug!(
                    "Generated key {} on demand (attempt {}/{})",
                    candidate, attempt, max_attempts
                );
                return Ok(candidate);
            }
            trace!("On-demand key {} collided, retrying", candidate);
        }

        error!(
            "On-demand key generation failed after {} collisions",
            max_attempts
        );
        Err(ShortpoolError::key_generation_exhausted(format!(
            "连续 {} 次生成的 key 都已存在",
            max_attempts
        )))
    }

    /// 创建映射
    ///
    /// 映射写入成功即返回；写缓存失败只记录日志。
    /// 映射写入失败时已领取的 key 不会归还（泄漏），错误原样返回。
    pub async fn create_mapping(
        &self,
        long_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CreatedMapping> {
        let long_url = normalize_url(long_url)?;
        let now = Utc::now();
        if let Some(exp) = expires_at
            && exp <= now
        {
            return Err(ShortpoolError::validation(format!(
                "过期时间必须晚于当前时间: {}",
                exp.to_rfc3339()
            )));
        }

        let (short_key, generated_on_demand) = self.claim_or_generate().await?;
        let mapping = UrlMapping::new(short_key.clone(), long_url, expires_at);

        if let Err(e) = self
            .guarded("insert_mapping", self.store.insert_mapping(&mapping))
            .await
        {
            error!(
                "Failed to store mapping for claimed key {}, key leaked: {}",
                short_key, e
            );
            return Err(e);
        }

        self.write_cache(&mapping, Utc::now()).await;

        info!("Mapping created: {} -> {}", short_key, mapping.long_url);
        Ok(CreatedMapping {
            short_key,
            long_url: mapping.long_url,
            expires_at: mapping.expires_at,
            generated_on_demand,
        })
    }

    /// 解析短 key
    pub async fn resolve(&self, short_key: &str) -> Result<String> {
        if !KeyGenerator::is_well_formed(short_key) {
            return Err(ShortpoolError::not_found(format!(
                "短 key 不存在: {}",
                short_key
            )));
        }

        let now = Utc::now();
        match with_timeout(
            "cache_get",
            self.settings.store_timeout,
            self.cache.get(short_key),
        )
        .await
        {
            Ok(Some(target)) if !target.is_expired_at(now) => {
                trace!("Cache hit: {}", short_key);
                self.record_hit(short_key);
                return Ok(target.long_url);
            }
            Ok(Some(_)) => {
                debug!("Cached entry for {} has expired, evicting", short_key);
                self.evict_cache(short_key).await;
            }
            Ok(None) => trace!("Cache miss: {}", short_key),
            Err(e) => warn!("Cache read failed for {}, treating as miss: {}", short_key, e),
        }

        let mapping = self
            .guarded("get_mapping", self.store.get_mapping(short_key))
            .await?
            .ok_or_else(|| ShortpoolError::not_found(format!("短 key 不存在: {}", short_key)))?;

        if mapping.is_expired_at(now) {
            self.spawn_expired_delete(short_key.to_string());
            return Err(ShortpoolError::expired(format!(
                "短 key 已过期: {}",
                short_key
            )));
        }

        self.write_cache(&mapping, now).await;
        self.record_hit(short_key);
        Ok(mapping.long_url)
    }

    fn record_hit(&self, short_key: &str) {
        if let Some(hits) = &self.hits {
            hits.record(short_key);
        }
    }

    async fn write_cache(&self, mapping: &UrlMapping, now: DateTime<Utc>) {
        let Some(ttl) = mapping.cache_ttl(now, self.settings.max_cache_ttl) else {
            return;
        };
        if let Err(e) = with_timeout(
            "cache_insert",
            self.settings.store_timeout,
            self.cache
                .insert(&mapping.short_key, CachedTarget::from(mapping), ttl),
        )
        .await
        {
            warn!("Failed to cache mapping {}: {}", mapping.short_key, e);
        }
    }

    async fn evict_cache(&self, short_key: &str) {
        if let Err(e) = with_timeout(
            "cache_remove",
            self.settings.store_timeout,
            self.cache.remove(short_key),
        )
        .await
        {
            warn!("Failed to evict cache entry {}: {}", short_key, e);
        }
    }

    /// 等待所有尚未完成的过期删除
    ///
    /// 短生命周期的进程（CLI、关闭流程）退出前调用。
    pub async fn wait_pending_deletes(&self) {
        let mut pending = std::mem::take(&mut *self.pending_deletes.lock());
        if pending.is_empty() {
            return;
        }
        debug!("Waiting for {} pending expired deletes", pending.len());
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                warn!("Expired delete task failed: {}", e);
            }
        }
    }

    /// 后台删除已过期映射；与清理任务并发执行也安全
    fn spawn_expired_delete(&self, short_key: String) {
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let limit = self.settings.store_timeout;

        let mut pending = self.pending_deletes.lock();
        // 回收已完成的任务
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            match with_timeout(
                "delete_if_expired",
                limit,
                store.delete_if_expired(&short_key, Utc::now()),
            )
            .await
            {
                Ok(true) => debug!("Expired mapping {} deleted on read", short_key),
                Ok(false) => trace!("Expired mapping {} already gone", short_key),
                Err(e) => warn!("Failed to delete expired mapping {}: {}", short_key, e),
            }
            if let Err(e) = with_timeout("cache_remove", limit, cache.remove(&short_key)).await {
                warn!("Failed to evict cache entry {}: {}", short_key, e);
            }
        });
    }
}
