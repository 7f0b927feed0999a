//! Logging system initialization
//!
//! 按 `[logging]` 配置初始化 tracing：
//! - 未设置 `file` 时输出到 stdout（带颜色）
//! - 设置 `file` 且开启轮转时按天滚动，保留 `max_backups` 份
//! - `format = "json"` 时输出 JSON 行

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

use crate::config::LoggingConfig;

const DEFAULT_LOG_FILE: &str = "shortpool.log";

/// 日志输出目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File(PathBuf),
    Rolling {
        dir: PathBuf,
        prefix: String,
        max_files: usize,
    },
}

impl LogTarget {
    pub fn from_config(config: &LoggingConfig) -> Self {
        let Some(log_file) = config.file.as_deref().filter(|f| !f.is_empty()) else {
            return LogTarget::Stdout;
        };

        if !config.enable_rotation {
            return LogTarget::File(PathBuf::from(log_file));
        }

        let path = Path::new(log_file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(DEFAULT_LOG_FILE);

        LogTarget::Rolling {
            dir: dir.to_path_buf(),
            prefix: filename.trim_end_matches(".log").to_string(),
            max_files: config.max_backups.max(1) as usize,
        }
    }

    fn writer(&self) -> Result<Box<dyn std::io::Write + Send + Sync>> {
        Ok(match self {
            LogTarget::Stdout => Box::new(std::io::stdout()),
            LogTarget::File(path) => Box::new(
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file {}", path.display()))?,
            ),
            LogTarget::Rolling {
                dir,
                prefix,
                max_files,
            } => Box::new(
                rolling::Builder::new()
                    .rotation(rolling::Rotation::DAILY)
                    .filename_prefix(prefix)
                    .filename_suffix("log")
                    .max_log_files(*max_files)
                    .build(dir)
                    .context("Failed to create rolling log appender")?,
            ),
        })
    }
}

/// 初始化日志系统
///
/// 只能调用一次。返回的 `WorkerGuard` 必须存活到进程退出，否则缓冲的日志会丢失。
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let target = LogTarget::from_config(config);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(target.writer()?);

    // RUST_LOG 优先于配置文件
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.level.clone()));

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(target == LogTarget::Stdout);

    let result = if config.format == "json" {
        subscriber_builder.json().try_init()
    } else {
        subscriber_builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set global tracing subscriber: {}", e))?;

    Ok(guard)
}
