use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::engine::HitRecorder;
use crate::workers::Shutdown;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 单个任务超时时间（秒）
const TASK_TIMEOUT_SECS: u64 = 10;

/// 等待 Ctrl+C
pub async fn listen_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, stopping background workers...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }
}

/// 通知所有后台任务退出，等待它们结束，最后刷写命中计数
pub async fn perform_shutdown(
    shutdown: &Shutdown,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    hit_recorder: Option<&HitRecorder>,
) {
    shutdown.trigger();

    let result = timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        perform_shutdown_tasks(tasks, hit_recorder),
    )
    .await;

    match result {
        Ok(()) => info!("All shutdown tasks completed successfully"),
        Err(_) => error!(
            "Shutdown tasks timed out after {} seconds, buffered hits may be lost",
            SHUTDOWN_TIMEOUT_SECS
        ),
    }
}

async fn perform_shutdown_tasks(
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    hit_recorder: Option<&HitRecorder>,
) {
    for (name, handle) in tasks {
        match timeout(Duration::from_secs(TASK_TIMEOUT_SECS), handle).await {
            Ok(Ok(())) => info!("{} stopped", name),
            Ok(Err(e)) => error!("{} terminated abnormally: {}", name, e),
            Err(_) => error!(
                "{} did not stop within {} seconds",
                name, TASK_TIMEOUT_SECS
            ),
        }
    }

    // 刷写计数任务退出后仍可能有新计数
    if let Some(recorder) = hit_recorder {
        match timeout(Duration::from_secs(TASK_TIMEOUT_SECS), recorder.flush()).await {
            Ok(()) => info!("Hit counts flushed ({} still buffered)", recorder.buffered()),
            Err(_) => error!(
                "Hit count flush timed out after {} seconds",
                TASK_TIMEOUT_SECS
            ),
        }
    }
}
