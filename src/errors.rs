use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortpoolError {
    /// key 池中已没有 Unused key
    PoolExhausted(String),
    /// 按需生成 key 时连续冲突超过上限
    KeyGenerationExhausted(String),
    /// 后端存储调用失败
    StoreUnavailable(String),
    /// 后端调用超过截止时间
    Timeout(String),
    NotFound(String),
    Expired(String),
    Validation(String),
    CacheConnection(String),
    Config(String),
    Serialization(String),
}

impl ShortpoolError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortpoolError::PoolExhausted(_) => "E001",
            ShortpoolError::KeyGenerationExhausted(_) => "E002",
            ShortpoolError::StoreUnavailable(_) => "E003",
            ShortpoolError::Timeout(_) => "E004",
            ShortpoolError::NotFound(_) => "E005",
            ShortpoolError::Expired(_) => "E006",
            ShortpoolError::Validation(_) => "E007",
            ShortpoolError::CacheConnection(_) => "E008",
            ShortpoolError::Config(_) => "E009",
            ShortpoolError::Serialization(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortpoolError::PoolExhausted(_) => "Key Pool Exhausted",
            ShortpoolError::KeyGenerationExhausted(_) => "Key Generation Exhausted",
            ShortpoolError::StoreUnavailable(_) => "Store Unavailable",
            ShortpoolError::Timeout(_) => "Store Timeout",
            ShortpoolError::NotFound(_) => "Resource Not Found",
            ShortpoolError::Expired(_) => "Resource Expired",
            ShortpoolError::Validation(_) => "Validation Error",
            ShortpoolError::CacheConnection(_) => "Cache Connection Error",
            ShortpoolError::Config(_) => "Configuration Error",
            ShortpoolError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShortpoolError::PoolExhausted(msg)
            | ShortpoolError::KeyGenerationExhausted(msg)
            | ShortpoolError::StoreUnavailable(msg)
            | ShortpoolError::Timeout(msg)
            | ShortpoolError::NotFound(msg)
            | ShortpoolError::Expired(msg)
            | ShortpoolError::Validation(msg)
            | ShortpoolError::CacheConnection(msg)
            | ShortpoolError::Config(msg)
            | ShortpoolError::Serialization(msg) => msg,
        }
    }

    /// 调用方是否可以稍后重试
    ///
    /// NotFound / Expired 是确定结果，重试没有意义。
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ShortpoolError::PoolExhausted(_)
                | ShortpoolError::KeyGenerationExhausted(_)
                | ShortpoolError::StoreUnavailable(_)
                | ShortpoolError::Timeout(_)
                | ShortpoolError::CacheConnection(_)
        )
    }

    /// HTTP 层应使用的状态码
    pub fn http_status(&self) -> u16 {
        match self {
            ShortpoolError::NotFound(_) | ShortpoolError::Expired(_) => 404,
            ShortpoolError::PoolExhausted(_)
            | ShortpoolError::KeyGenerationExhausted(_)
            | ShortpoolError::StoreUnavailable(_)
            | ShortpoolError::Timeout(_) => 503,
            ShortpoolError::Validation(_) => 400,
            ShortpoolError::CacheConnection(_)
            | ShortpoolError::Config(_)
            | ShortpoolError::Serialization(_) => 500,
        }
    }

    /// 格式化为彩色输出（用于 CLI 模式）
    #[cfg(feature = "cli")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortpoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortpoolError {}

// 便捷的构造函数
impl ShortpoolError {
    pub fn pool_exhausted<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::PoolExhausted(msg.into())
    }

    pub fn key_generation_exhausted<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::KeyGenerationExhausted(msg.into())
    }

    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::StoreUnavailable(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::Timeout(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::NotFound(msg.into())
    }

    pub fn expired<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::Expired(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::Validation(msg.into())
    }

    pub fn cache_connection<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::CacheConnection(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::Config(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortpoolError::Serialization(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortpoolError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortpoolError::StoreUnavailable(err.to_string())
    }
}

impl From<redis::RedisError> for ShortpoolError {
    fn from(err: redis::RedisError) -> Self {
        ShortpoolError::CacheConnection(err.to_string())
    }
}

impl From<serde_json::Error> for ShortpoolError {
    fn from(err: serde_json::Error) -> Self {
        ShortpoolError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortpoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ShortpoolError::not_found("x").http_status(), 404);
        assert_eq!(ShortpoolError::expired("x").http_status(), 404);
        assert_eq!(ShortpoolError::pool_exhausted("x").http_status(), 503);
        assert_eq!(ShortpoolError::timeout("x").http_status(), 503);
        assert_eq!(ShortpoolError::store_unavailable("x").http_status(), 503);
        assert_eq!(ShortpoolError::validation("x").http_status(), 400);
    }

    #[test]
    fn test_retriable_kinds() {
        assert!(ShortpoolError::pool_exhausted("x").is_retriable());
        assert!(ShortpoolError::key_generation_exhausted("x").is_retriable());
        assert!(ShortpoolError::timeout("x").is_retriable());
        assert!(!ShortpoolError::not_found("x").is_retriable());
        assert!(!ShortpoolError::expired("x").is_retriable());
    }

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            ShortpoolError::pool_exhausted(""),
            ShortpoolError::key_generation_exhausted(""),
            ShortpoolError::store_unavailable(""),
            ShortpoolError::timeout(""),
            ShortpoolError::not_found(""),
            ShortpoolError::expired(""),
            ShortpoolError::validation(""),
            ShortpoolError::cache_connection(""),
            ShortpoolError::config(""),
            ShortpoolError::serialization(""),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_db_err_maps_to_store_unavailable() {
        let err: ShortpoolError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, ShortpoolError::StoreUnavailable(_)));
        assert!(err.message().contains("boom"));
    }

    #[test]
    fn test_format_simple() {
        let err = ShortpoolError::not_found("短 key 不存在: abc");
        assert_eq!(err.format_simple(), "Resource Not Found: 短 key 不存在: abc");
        assert_eq!(err.to_string(), err.format_simple());
    }
}
