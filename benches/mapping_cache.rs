//! 解析缓存性能基准测试

use criterion::{Criterion, criterion_group, criterion_main};
use shortpool::cache::{CachedTarget, MappingCache, MokaMappingCache};
use std::sync::Arc;
use std::time::Duration;

fn target() -> CachedTarget {
    CachedTarget {
        long_url: "https://example.com/very/long/path/to/destination".to_string(),
        expires_at: None,
    }
}

// ============== Moka Mapping Cache 基准测试 ==============

fn bench_moka_get_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = Arc::new(MokaMappingCache::with_capacity(10_000));

    // 预填充数据
    rt.block_on(async {
        for i in 0..1000 {
            cache
                .insert(&format!("key_{}", i), target(), Duration::from_secs(600))
                .await
                .unwrap();
        }
    });

    let cache_clone = Arc::clone(&cache);
    c.bench_function("moka/get_hit", |b| {
        b.to_async(&rt).iter(|| {
            let c = Arc::clone(&cache_clone);
            async move {
                let result = c.get("key_500").await.unwrap();
                assert!(result.is_some());
            }
        });
    });
}

fn bench_moka_get_miss(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = Arc::new(MokaMappingCache::with_capacity(10_000));

    let cache_clone = Arc::clone(&cache);
    c.bench_function("moka/get_miss", |b| {
        b.to_async(&rt).iter(|| {
            let c = Arc::clone(&cache_clone);
            async move {
                let result = c.get("nonexistent_key").await.unwrap();
                assert!(result.is_none());
            }
        });
    });
}

fn bench_moka_insert(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = Arc::new(MokaMappingCache::with_capacity(10_000));

    let cache_clone = Arc::clone(&cache);
    let mut counter = 0u64;
    c.bench_function("moka/insert", |b| {
        b.to_async(&rt).iter(|| {
            counter += 1;
            let key = format!("insert_{}", counter % 5_000);
            let c = Arc::clone(&cache_clone);
            async move {
                c.insert(&key, target(), Duration::from_secs(60))
                    .await
                    .unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_moka_get_hit,
    bench_moka_get_miss,
    bench_moka_insert
);
criterion_main!(benches);
