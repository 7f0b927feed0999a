//! 命中计数
//!
//! 解析路径只做一次无锁自增；计数在内存中聚合后批量写回映射存储：
//! - 定时刷盘
//! - 阈值触发刷盘
//! - 刷盘失败时数据回填缓冲区，下次再写

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::sync::{Mutex, watch};
use tokio::time::{Duration, sleep};
use tracing::{debug, trace, warn};

use crate::errors::Result;

/// 命中计数的落盘目标
#[async_trait]
pub trait HitSink: Send + Sync {
    async fn add_hits(&self, updates: Vec<(String, u64)>) -> Result<()>;
}

struct HitBuffer {
    data: DashMap<Arc<str>, u64>,
    /// 缓冲区中的总命中数（用于阈值判断）
    total_hits: AtomicU64,
    flush_lock: Mutex<()>,
    /// 已经 spawn 了阈值刷盘任务
    flush_pending: AtomicBool,
}

impl HitBuffer {
    fn new() -> Self {
        Self {
            data: DashMap::new(),
            total_hits: AtomicU64::new(0),
            flush_lock: Mutex::new(()),
            flush_pending: AtomicBool::new(false),
        }
    }

    fn increment(&self, key: &str) -> u64 {
        // 热点 key 走 get_mut，不分配
        if let Some(mut entry) = self.data.get_mut(key) {
            *entry += 1;
        } else {
            self.data
                .entry(Arc::from(key))
                .and_modify(|v| *v += 1)
                .or_insert(1);
        }
        self.total_hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 按快照逐个 remove，窗口期内新增的计数留在缓冲区
    fn drain(&self) -> Vec<(String, u64)> {
        let keys: Vec<Arc<str>> = self.data.iter().map(|r| r.key().clone()).collect();

        let mut updates = Vec::with_capacity(keys.len());
        let mut total_removed = 0;
        for key in keys {
            if let Some((k, v)) = self.data.remove(&key) {
                total_removed += v;
                updates.push((k.to_string(), v));
            }
        }

        if total_removed > 0 {
            self.total_hits
                .fetch_update(Ordering::Release, Ordering::Relaxed, |current| {
                    Some(current.saturating_sub(total_removed))
                })
                .ok();
        }

        updates
    }

    fn restore(&self, updates: Vec<(String, u64)>) {
        let mut restored_total = 0;
        for (k, v) in updates {
            *self.data.entry(Arc::from(k.as_str())).or_insert(0) += v;
            restored_total += v;
        }
        self.total_hits.fetch_add(restored_total, Ordering::Relaxed);
    }

    fn total(&self) -> u64 {
        self.total_hits.load(Ordering::Relaxed)
    }
}

/// 命中计数器
///
/// 可以 clone，所有副本共享同一个缓冲区。
#[derive(Clone)]
pub struct HitRecorder {
    buffer: Arc<HitBuffer>,
    sink: Arc<dyn HitSink>,
    flush_interval: Duration,
    max_hits_before_flush: u64,
}

impl HitRecorder {
    pub fn new(
        sink: Arc<dyn HitSink>,
        flush_interval: Duration,
        max_hits_before_flush: u64,
    ) -> Self {
        Self {
            buffer: Arc::new(HitBuffer::new()),
            sink,
            flush_interval,
            max_hits_before_flush: max_hits_before_flush.max(1),
        }
    }

    /// 记录一次命中（无锁，不等待 IO）
    pub fn record(&self, key: &str) {
        let current = self.buffer.increment(key);
        trace!("HitRecorder: buffered hits: {}", current);

        if current >= self.max_hits_before_flush
            && self
                .buffer
                .flush_pending
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
        {
            let buffer = Arc::clone(&self.buffer);
            let sink = Arc::clone(&self.sink);
            tokio::spawn(async move {
                if let Ok(_guard) = buffer.flush_lock.try_lock() {
                    Self::flush_buffer(&buffer, &sink).await;
                } else {
                    trace!("HitRecorder: flush already in progress, skipping");
                }
                buffer.flush_pending.store(false, Ordering::Release);
            });
        }
    }

    /// 定时刷盘循环，收到关闭信号后做最后一次刷盘并退出
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            tokio::select! {
                _ = sleep(self.flush_interval) => {
                    if let Ok(_guard) = self.buffer.flush_lock.try_lock() {
                        Self::flush_buffer(&self.buffer, &self.sink).await;
                    } else {
                        trace!("HitRecorder: flush already in progress, skipping scheduled flush");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("HitRecorder: stopping, final flush");
        self.flush().await;
    }

    /// 手动刷盘（等待进行中的刷盘完成）
    pub async fn flush(&self) {
        let _guard = self.buffer.flush_lock.lock().await;
        Self::flush_buffer(&self.buffer, &self.sink).await;
    }

    async fn flush_buffer(buffer: &HitBuffer, sink: &Arc<dyn HitSink>) {
        let updates = buffer.drain();
        if updates.is_empty() {
            trace!("HitRecorder: nothing to flush");
            return;
        }

        let count = updates.len();
        match sink.add_hits(updates.clone()).await {
            Ok(()) => debug!("HitRecorder: flushed hit counts for {} keys", count),
            Err(e) => {
                buffer.restore(updates);
                warn!(
                    "HitRecorder: add_hits failed: {}, {} entries restored to buffer",
                    e, count
                );
            }
        }
    }

    /// 当前缓冲区中尚未落盘的命中数
    pub fn buffered(&self) -> u64 {
        self.buffer.total()
    }
}
