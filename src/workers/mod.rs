//! 后台任务
//!
//! - population: key 池低于水位时补充
//! - cleanup: 删除过期映射并失效缓存
//!
//! 两个任务都是幂等的，多实例同时运行也安全；跨实例协调只依赖存储的原子性。

mod cleanup;
mod population;

use tokio::sync::watch;
use tracing::debug;

pub use cleanup::{CleanupReport, CleanupSettings, CleanupWorker};
pub use population::{PopulationReport, PopulationSettings, PopulationWorker};

/// 关闭信号
///
/// 所有后台任务持有同一个 `watch::Receiver<bool>`，值变为 `true` 时退出循环。
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        debug!("Shutdown signal sent to background workers");
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// 等待关闭信号；发送端被丢弃也视为关闭
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_for_shutdown() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let waiter = tokio::spawn(async move { wait_for_shutdown(&mut rx).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_subscribe_after_trigger_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut rx = shutdown.subscribe();
        tokio::time::timeout(Duration::from_millis(100), wait_for_shutdown(&mut rx))
            .await
            .unwrap();
    }
}
