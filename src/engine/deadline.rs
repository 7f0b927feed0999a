use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::{Result, ShortpoolError};

/// 给一次后端调用加截止时间，超时返回 `Timeout`
///
/// 超时后内部 future 被丢弃；已经发出的写操作可能已生效。
pub async fn with_timeout<T, F>(operation_name: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_elapsed) => {
            warn!(
                "Operation '{}' timed out after {} ms",
                operation_name,
                limit.as_millis()
            );
            Err(ShortpoolError::timeout(format!(
                "'{}' 超过 {} ms 未完成",
                operation_name,
                limit.as_millis()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_limit() {
        let value = with_timeout("fast", Duration::from_millis(200), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_times_out() {
        let result: Result<()> = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ShortpoolError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: Result<()> = with_timeout("broken", Duration::from_millis(200), async {
            Err(ShortpoolError::not_found("x"))
        })
        .await;
        assert!(matches!(result, Err(ShortpoolError::NotFound(_))));
    }
}
