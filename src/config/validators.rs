//! 配置值验证模块
//!
//! 启动时对 `StaticConfig` 做一次整体校验，非法配置直接拒绝启动。

use std::collections::HashSet;

use tracing::warn;

use super::{CacheConfig, KeysConfig, StaticConfig, WorkersConfig};
use crate::errors::{Result, ShortpoolError};

/// key 空间小于 batch_size 的这个倍数时给出警告
const KEY_SPACE_WARN_FACTOR: f64 = 100.0;

impl StaticConfig {
    /// 校验整份配置
    pub fn validate(&self) -> Result<()> {
        validate_keys(&self.keys)?;
        validate_workers(&self.workers)?;
        validate_cache(&self.cache)?;

        if self.engine.store_timeout_ms == 0 {
            return Err(ShortpoolError::config("engine.store_timeout_ms 必须大于 0"));
        }
        if self.engine.breaker_failure_threshold == 0 {
            return Err(ShortpoolError::config(
                "engine.breaker_failure_threshold 必须大于 0",
            ));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ShortpoolError::config(format!(
                "logging.format 无效: '{}'. Valid: text, json",
                self.logging.format
            )));
        }
        Ok(())
    }
}

/// 校验 key 相关配置
pub fn validate_keys(keys: &KeysConfig) -> Result<()> {
    if keys.alphabet.is_empty() {
        return Err(ShortpoolError::config("keys.alphabet 不能为空"));
    }
    let mut seen = HashSet::new();
    for c in keys.alphabet.chars() {
        if !seen.insert(c) {
            return Err(ShortpoolError::config(format!(
                "keys.alphabet 包含重复字符: '{}'",
                c
            )));
        }
        if c.is_whitespace() || c == '/' {
            return Err(ShortpoolError::config(format!(
                "keys.alphabet 包含非法字符: {:?}",
                c
            )));
        }
    }
    if keys.length == 0 {
        return Err(ShortpoolError::config("keys.length 必须大于 0"));
    }
    if keys.length > 64 {
        return Err(ShortpoolError::config("keys.length 不能超过 64"));
    }
    if keys.batch_size == 0 || keys.insert_chunk_size == 0 {
        return Err(ShortpoolError::config(
            "keys.batch_size 和 keys.insert_chunk_size 必须大于 0",
        ));
    }
    if keys.claim_window == 0 {
        return Err(ShortpoolError::config("keys.claim_window 必须大于 0"));
    }
    if keys.fallback_enabled && keys.fallback_max_attempts == 0 {
        return Err(ShortpoolError::config(
            "keys.fallback_max_attempts 必须大于 0",
        ));
    }

    let space = key_space(seen.len(), keys.length);
    if space < keys.batch_size as f64 * KEY_SPACE_WARN_FACTOR {
        warn!(
            "Key space is small: {} symbols ^ {} = {:.0} possible keys for batch size {}; expect frequent collisions",
            seen.len(),
            keys.length,
            space,
            keys.batch_size
        );
    }
    Ok(())
}

/// 校验后台任务配置
pub fn validate_workers(workers: &WorkersConfig) -> Result<()> {
    if workers.population_interval_secs == 0 || workers.cleanup_interval_secs == 0 {
        return Err(ShortpoolError::config("workers 的执行间隔必须大于 0"));
    }
    if workers.cleanup_batch_size == 0 || workers.cleanup_max_batches == 0 {
        return Err(ShortpoolError::config(
            "workers.cleanup_batch_size 和 workers.cleanup_max_batches 必须大于 0",
        ));
    }
    if workers.enable_hit_tracking && workers.hit_flush_interval_secs == 0 {
        return Err(ShortpoolError::config(
            "workers.hit_flush_interval_secs 必须大于 0",
        ));
    }
    Ok(())
}

/// 校验缓存配置
pub fn validate_cache(cache: &CacheConfig) -> Result<()> {
    if !matches!(cache.cache_type.as_str(), "memory" | "redis" | "none") {
        return Err(ShortpoolError::config(format!(
            "cache.type 无效: '{}'. Valid: memory, redis, none",
            cache.cache_type
        )));
    }
    if cache.max_ttl == 0 {
        return Err(ShortpoolError::config("cache.max_ttl 必须大于 0"));
    }
    Ok(())
}

/// 可能的 key 总数（浮点，避免溢出）
pub fn key_space(symbols: usize, length: usize) -> f64 {
    (symbols as f64).powi(length as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StaticConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_alphabet() {
        let keys = KeysConfig {
            alphabet: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            validate_keys(&keys),
            Err(ShortpoolError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_alphabet() {
        let keys = KeysConfig {
            alphabet: "abca".to_string(),
            ..Default::default()
        };
        let err = validate_keys(&keys).unwrap_err();
        assert!(err.message().contains('a'));
    }

    #[test]
    fn test_rejects_zero_length_and_batch() {
        let keys = KeysConfig {
            length: 0,
            ..Default::default()
        };
        assert!(validate_keys(&keys).is_err());

        let keys = KeysConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(validate_keys(&keys).is_err());
    }

    #[test]
    fn test_small_key_space_is_only_a_warning() {
        let keys = KeysConfig {
            alphabet: "ab".to_string(),
            length: 2,
            batch_size: 10,
            ..Default::default()
        };
        assert!(validate_keys(&keys).is_ok());
    }

    #[test]
    fn test_rejects_zero_intervals() {
        let workers = WorkersConfig {
            cleanup_interval_secs: 0,
            ..Default::default()
        };
        assert!(validate_workers(&workers).is_err());
    }

    #[test]
    fn test_rejects_unknown_cache_type() {
        let cache = CacheConfig {
            cache_type: "memcached".to_string(),
            ..Default::default()
        };
        assert!(validate_cache(&cache).is_err());
    }

    #[test]
    fn test_key_space() {
        assert_eq!(key_space(62, 1), 62.0);
        assert_eq!(key_space(2, 10), 1024.0);
    }
}
