use std::path::Path;

use serde::{Deserialize, Serialize};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "shortpool.toml";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - database: 数据库连接与重试
/// - cache: 解析缓存（memory / redis / none）
/// - keys: key 字母表、长度、key 池水位与 claim 参数
/// - workers: 补充 / 清理 / 命中计数的后台任务
/// - engine: 存储调用超时与熔断
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// ENV 前缀：SP，分隔符：__
    /// 示例：SP__KEYS__LENGTH=8
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖
            .add_source(
                Environment::with_prefix("SP")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 缓存系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// memory | redis | none
    #[serde(rename = "type")]
    #[serde(default = "default_cache_type")]
    pub cache_type: String,
    /// 缓存条目的最大存活时间（秒），同时是删除后陈旧数据的上限
    #[serde(default = "default_cache_max_ttl")]
    pub max_ttl: u64,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

/// 内存缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_capacity")]
    pub max_capacity: u64,
}

/// key 生成与 key 池配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    #[serde(default = "default_key_alphabet")]
    pub alphabet: String,
    #[serde(default = "default_key_length")]
    pub length: usize,
    /// Unused key 数量低于该值时触发补充
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: u64,
    /// 每次补充生成的 key 数量
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_insert_chunk_size")]
    pub insert_chunk_size: usize,
    /// 每次 claim 读取的候选 key 数量
    #[serde(default = "default_claim_window")]
    pub claim_window: u64,
    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,
    #[serde(default = "default_fallback_max_attempts")]
    pub fallback_max_attempts: u32,
}

/// 后台任务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    #[serde(default = "default_population_interval")]
    pub population_interval_secs: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_cleanup_batch_size")]
    pub cleanup_batch_size: u64,
    #[serde(default = "default_cleanup_max_batches")]
    pub cleanup_max_batches: u32,
    #[serde(default = "default_enable_hit_tracking")]
    pub enable_hit_tracking: bool,
    #[serde(default = "default_hit_flush_interval")]
    pub hit_flush_interval_secs: u64,
    #[serde(default = "default_hit_max_entries")]
    pub hit_max_entries: usize,
}

/// 解析引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 单次存储 / 缓存调用的截止时间（毫秒）
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_breaker_failure_threshold")]
    pub breaker_failure_threshold: u32,
    #[serde(default = "default_breaker_reset_secs")]
    pub breaker_reset_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// text | json
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_database_url() -> String {
    "sqlite://shortpool.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_cache_type() -> String {
    "memory".to_string()
}

fn default_cache_max_ttl() -> u64 {
    1800
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "shortpool:".to_string()
}

fn default_memory_capacity() -> u64 {
    100_000
}

fn default_key_alphabet() -> String {
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".to_string()
}

fn default_key_length() -> usize {
    7
}

fn default_low_water_mark() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    10_000
}

fn default_insert_chunk_size() -> usize {
    500
}

fn default_claim_window() -> u64 {
    32
}

fn default_fallback_enabled() -> bool {
    true
}

fn default_fallback_max_attempts() -> u32 {
    10
}

fn default_population_interval() -> u64 {
    1800
}

fn default_cleanup_interval() -> u64 {
    86400
}

fn default_cleanup_batch_size() -> u64 {
    1000
}

fn default_cleanup_max_batches() -> u32 {
    100
}

fn default_enable_hit_tracking() -> bool {
    true
}

fn default_hit_flush_interval() -> u64 {
    30
}

fn default_hit_max_entries() -> usize {
    10_000
}

fn default_store_timeout_ms() -> u64 {
    3000
}

fn default_breaker_failure_threshold() -> u32 {
    5
}

fn default_breaker_reset_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: default_cache_type(),
            max_ttl: default_cache_max_ttl(),
            redis: RedisConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_memory_capacity(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            alphabet: default_key_alphabet(),
            length: default_key_length(),
            low_water_mark: default_low_water_mark(),
            batch_size: default_batch_size(),
            insert_chunk_size: default_insert_chunk_size(),
            claim_window: default_claim_window(),
            fallback_enabled: default_fallback_enabled(),
            fallback_max_attempts: default_fallback_max_attempts(),
        }
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            population_interval_secs: default_population_interval(),
            cleanup_interval_secs: default_cleanup_interval(),
            cleanup_batch_size: default_cleanup_batch_size(),
            cleanup_max_batches: default_cleanup_max_batches(),
            enable_hit_tracking: default_enable_hit_tracking(),
            hit_flush_interval_secs: default_hit_flush_interval(),
            hit_max_entries: default_hit_max_entries(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout_ms(),
            breaker_failure_threshold: default_breaker_failure_threshold(),
            breaker_reset_secs: default_breaker_reset_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_roundtrips_defaults() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[keys]"));
        assert!(sample.contains("low_water_mark"));

        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.keys.length, 7);
        assert_eq!(parsed.cache.cache_type, "memory");
        assert_eq!(parsed.cache.max_ttl, 1800);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [keys]
            length = 9

            [cache]
            type = "none"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.keys.length, 9);
        assert_eq!(parsed.keys.alphabet.len(), 62);
        assert_eq!(parsed.cache.cache_type, "none");
        assert_eq!(parsed.workers.population_interval_secs, 1800);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = StaticConfig::load("definitely-not-here.toml");
        assert_eq!(config.keys.low_water_mark, 1000);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("shortpool.toml");
        StaticConfig::default().save_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("store_timeout_ms"));
    }
}
