use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// key 池中 key 的状态
///
/// 只允许 Unused -> Claimed 一次迁移。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KeyStatus {
    Unused,
    Claimed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    pub key: String,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMapping {
    pub short_key: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hit_count: i64,
}

impl UrlMapping {
    pub fn new(
        short_key: impl Into<String>,
        long_url: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            short_key: short_key.into(),
            long_url: long_url.into(),
            created_at: Utc::now(),
            expires_at,
            hit_count: 0,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// 缓存 TTL：min(剩余寿命, max_ttl)，永不过期时为 max_ttl
    ///
    /// 已过期返回 None，调用方不应写缓存。
    pub fn cache_ttl(&self, now: DateTime<Utc>, max_ttl: Duration) -> Option<Duration> {
        cache_ttl_for(self.expires_at, now, max_ttl)
    }
}

pub(crate) fn cache_ttl_for(
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    max_ttl: Duration,
) -> Option<Duration> {
    match expires_at {
        None => Some(max_ttl),
        Some(exp) => {
            let remaining = (exp - now).to_std().ok()?;
            if remaining.is_zero() {
                None
            } else {
                Some(remaining.min(max_ttl))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub unused: u64,
    pub claimed: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingStats {
    pub total: u64,
    pub expired: u64,
}

/// claim 协议参数
#[derive(Debug, Clone, Copy)]
pub struct ClaimOptions {
    /// 每轮读取的候选数量
    pub window: u64,
}

impl Default for ClaimOptions {
    fn default() -> Self {
        Self { window: 32 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_key_status_strings() {
        assert_eq!(KeyStatus::Unused.as_ref(), "unused");
        assert_eq!(KeyStatus::Claimed.to_string(), "claimed");
        assert_eq!(KeyStatus::from_str("claimed").unwrap(), KeyStatus::Claimed);
        assert!(KeyStatus::from_str("deleted").is_err());
    }

    #[test]
    fn test_cache_ttl_without_expiry_uses_max() {
        let mapping = UrlMapping::new("abc", "https://example.com", None);
        let ttl = mapping.cache_ttl(Utc::now(), Duration::from_secs(60));
        assert_eq!(ttl, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_cache_ttl_bounded_by_remaining_lifetime() {
        let now = Utc::now();
        let mapping = UrlMapping::new(
            "abc",
            "https://example.com",
            Some(now + chrono::Duration::seconds(10)),
        );
        let ttl = mapping.cache_ttl(now, Duration::from_secs(60)).unwrap();
        assert_eq!(ttl, Duration::from_secs(10));

        let ttl = mapping.cache_ttl(now, Duration::from_secs(5)).unwrap();
        assert_eq!(ttl, Duration::from_secs(5));
    }

    #[test]
    fn test_cache_ttl_expired_is_none() {
        let now = Utc::now();
        let mapping = UrlMapping::new(
            "abc",
            "https://example.com",
            Some(now - chrono::Duration::seconds(1)),
        );
        assert!(mapping.is_expired_at(now));
        assert_eq!(mapping.cache_ttl(now, Duration::from_secs(60)), None);
    }
}
