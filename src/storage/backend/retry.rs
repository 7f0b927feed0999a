//! 幂等存储操作的重试
//!
//! 只包裹可以安全重复执行的操作：读取、计数、窗口扫描、insert-if-absent、
//! 带 `expires_at` 条件的删除，以及允许少量重复计数的 hit_count 累加。
//! claim 的 CAS 更新和映射插入由调用方直接执行，失败即返回。

use std::future::Future;
use std::ops::Deref;
use std::time::Duration;

use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// 暂时性故障的类别，决定是否值得再试一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Transient {
    /// 连接池里拿不到连接
    #[strum(serialize = "pool starved")]
    PoolStarved,
    /// 已有连接断开
    #[strum(serialize = "connection lost")]
    ConnectionLost,
    /// 与并发的 claim / 清理事务发生锁冲突
    #[strum(serialize = "lock conflict")]
    LockConflict,
}

/// 各后端表示锁冲突的错误码
///
/// MySQL 1213/1205，PostgreSQL 40001/40P01，SQLite BUSY/LOCKED 及其扩展码。
const LOCK_CONFLICT_CODES: &[&str] = &[
    "1213", "1205", "40001", "40P01", "5", "6", "261", "262", "517",
];

/// 拿不到错误码时按消息识别锁冲突
const LOCK_CONFLICT_HINTS: &[&str] = &[
    "deadlock",
    "lock wait timeout",
    "database is locked",
    "database table is locked",
    "serialization failure",
];

/// 判断错误是否为暂时性故障；`None` 表示重试没有意义
pub fn classify(err: &DbErr) -> Option<Transient> {
    match err {
        DbErr::ConnectionAcquire(_) => Some(Transient::PoolStarved),
        DbErr::Conn(_) => Some(Transient::ConnectionLost),
        DbErr::Exec(runtime) | DbErr::Query(runtime) => {
            is_lock_conflict(runtime).then_some(Transient::LockConflict)
        }
        _ => None,
    }
}

fn is_lock_conflict(err: &RuntimeErr) -> bool {
    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            let code = sqlx_err
                .deref()
                .as_database_error()
                .and_then(|db_err| db_err.code());
            match code {
                Some(code) => {
                    let code: &str = &code;
                    LOCK_CONFLICT_CODES.contains(&code)
                }
                None => mentions_lock_conflict(&sqlx_err.to_string()),
            }
        }
        RuntimeErr::Internal(msg) => mentions_lock_conflict(msg),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn mentions_lock_conflict(message: &str) -> bool {
    let message = message.to_lowercase();
    LOCK_CONFLICT_HINTS.iter().any(|hint| message.contains(hint))
}

/// 重试次数与退避区间，来自 `[database]` 配置
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl From<&DatabaseConfig> for RetryConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    /// 第 `retry` 次重试前的等待时间（从 1 开始）
    ///
    /// 上限是 `base * 2^(retry-1)`（不超过 `max_delay_ms`），实际取上限的后半段随机值，
    /// 多个 worker 同时撞上锁冲突时会错开重试。
    pub fn delay_before(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(32);
        let ceiling = self
            .base_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        let floor = ceiling / 2;
        Duration::from_millis(rand::random_range(floor..=ceiling))
    }
}

/// 执行幂等存储操作，遇到暂时性故障时退避重试
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut retries = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    debug!("Store operation '{}' recovered after {} retries", operation_name, retries);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let Some(kind) = classify(&err) else {
            debug!("Store operation '{}' failed permanently: {}", operation_name, err);
            return Err(err);
        };
        if retries >= config.max_retries {
            warn!(
                "Store operation '{}' still failing ({}) after {} retries: {}",
                operation_name, kind, retries, err
            );
            return Err(err);
        }

        retries += 1;
        let delay = config.delay_before(retries);
        warn!(
            "Store operation '{}' hit {} (retry {}/{} in {:?}): {}",
            operation_name, kind, retries, config.max_retries, delay, err
        );
        tokio::time::sleep(delay).await;
    }
}
