//! key 池集成测试
//!
//! 并发 claim 的互斥性、耗尽、按需生成的冲突处理。

use std::collections::HashSet;
use std::sync::Arc;

use tempfile::TempDir;

use shortpool::config::DatabaseConfig;
use shortpool::errors::ShortpoolError;
use shortpool::storage::{ClaimOptions, KeyPool, KeyStatus, MappingStore, SeaOrmStorage, UrlMapping};

async fn sqlite_storage(dir: &TempDir, name: &str) -> Arc<SeaOrmStorage> {
    let db_path = dir.path().join(name);
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..Default::default()
    };
    Arc::new(SeaOrmStorage::new(&config).await.expect("创建存储失败"))
}

fn numbered_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("key{:04}", i)).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_hand_out_each_key_once() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir, "concurrent.db").await;
    let pool_keys = numbered_keys(60);
    assert_eq!(storage.insert_unused(&pool_keys).await.unwrap(), 60);

    let options = ClaimOptions::default();

    let mut handles = Vec::new();
    for _ in 0..12 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            let mut won = Vec::new();
            loop {
                match storage.claim(options).await {
                    Ok(key) => won.push(key),
                    Err(ShortpoolError::PoolExhausted(_)) => break,
                    Err(e) => panic!("unexpected claim error: {}", e),
                }
            }
            won
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }

    assert_eq!(all.len(), 60, "every key claimed exactly once");
    let unique: HashSet<_> = all.iter().cloned().collect();
    assert_eq!(unique.len(), 60);
    assert_eq!(unique, pool_keys.into_iter().collect::<HashSet<_>>());

    let stats = storage.pool_stats().await.unwrap();
    assert_eq!(stats.unused, 0);
    assert_eq!(stats.claimed, 60);

    assert!(matches!(
        storage.claim(options).await.unwrap_err(),
        ShortpoolError::PoolExhausted(_)
    ));
}

// 窗口为 1 时所有调用方都争抢同一个 key，输掉竞争不能被当成池耗尽
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lost_races_are_not_reported_as_exhausted() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir, "narrow.db").await;
    assert_eq!(storage.insert_unused(&numbered_keys(24)).await.unwrap(), 24);

    let options = ClaimOptions { window: 1 };
    let mut handles = Vec::new();
    for _ in 0..16 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            let mut wins = 0usize;
            loop {
                match storage.claim(options).await {
                    Ok(_) => wins += 1,
                    Err(ShortpoolError::PoolExhausted(_)) => {
                        // 只有真正读不到 Unused key 时才会走到这里
                        assert_eq!(storage.count_unused().await.unwrap(), 0);
                        break;
                    }
                    Err(e) => panic!("unexpected claim error: {}", e),
                }
            }
            wins
        }));
    }

    let mut total = 0;
    for handle in handles {
        total += handle.await.unwrap();
    }
    assert_eq!(total, 24);
}

#[tokio::test]
async fn test_empty_pool_is_exhausted() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir, "empty.db").await;

    let err = storage.claim(ClaimOptions::default()).await.unwrap_err();
    assert!(matches!(err, ShortpoolError::PoolExhausted(_)));
    assert_eq!(err.code(), "E001");
}

#[tokio::test]
async fn test_claimed_key_never_returns_to_pool() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir, "lifecycle.db").await;
    storage.insert_unused(&["reuse1".to_string()]).await.unwrap();

    let key = storage.claim(ClaimOptions::default()).await.unwrap();
    assert_eq!(key, "reuse1");

    // 映射过期并被清理后，key 仍然是 Claimed
    let mapping = UrlMapping::new(
        key.clone(),
        "https://example.com",
        Some(chrono::Utc::now() - chrono::Duration::seconds(1)),
    );
    storage.insert_mapping(&mapping).await.unwrap();
    assert!(storage.delete_if_expired(&key, chrono::Utc::now()).await.unwrap());

    // 重新插入同名 Unused key 被忽略
    assert_eq!(storage.insert_unused(&[key.clone()]).await.unwrap(), 0);

    let record = storage.get_key(&key).await.unwrap().unwrap();
    assert_eq!(record.status, KeyStatus::Claimed);
    assert!(matches!(
        storage.claim(ClaimOptions::default()).await.unwrap_err(),
        ShortpoolError::PoolExhausted(_)
    ));
}

#[tokio::test]
async fn test_insert_claimed_detects_collision() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir, "collision.db").await;
    storage.insert_unused(&["taken1".to_string()]).await.unwrap();

    // 与 Unused key 冲突也算冲突，不能抢占
    assert!(!storage.insert_claimed("taken1").await.unwrap());
    assert_eq!(
        storage.get_key("taken1").await.unwrap().unwrap().status,
        KeyStatus::Unused
    );

    assert!(storage.insert_claimed("fresh1").await.unwrap());
    assert!(!storage.insert_claimed("fresh1").await.unwrap());
}

#[tokio::test]
async fn test_insert_unused_counts_only_new_keys() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir, "insert.db").await;

    let first = numbered_keys(10);
    assert_eq!(storage.insert_unused(&first).await.unwrap(), 10);

    let overlapping = numbered_keys(15);
    assert_eq!(storage.insert_unused(&overlapping).await.unwrap(), 5);
    assert_eq!(storage.count_unused().await.unwrap(), 15);
    assert_eq!(storage.insert_unused(&[]).await.unwrap(), 0);
}
