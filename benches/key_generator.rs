//! key 生成性能基准测试

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use shortpool::config::KeysConfig;
use shortpool::keys::KeyGenerator;
use std::hint::black_box;

fn bench_generate_single(c: &mut Criterion) {
    let generator = KeyGenerator::from_config(&KeysConfig::default()).unwrap();

    c.bench_function("keys/generate", |b| {
        b.iter(|| black_box(generator.generate()));
    });
}

fn bench_generate_batch(c: &mut Criterion) {
    let generator = KeyGenerator::from_config(&KeysConfig::default()).unwrap();
    let mut group = c.benchmark_group("keys/generate_batch");

    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| black_box(generator.generate_batch(size)));
        });
    }
    group.finish();
}

fn bench_is_well_formed(c: &mut Criterion) {
    let generator = KeyGenerator::from_config(&KeysConfig::default()).unwrap();
    let key = generator.generate();

    c.bench_function("keys/is_well_formed", |b| {
        b.iter(|| black_box(KeyGenerator::is_well_formed(black_box(&key))));
    });
}

criterion_group!(
    benches,
    bench_generate_single,
    bench_generate_batch,
    bench_is_well_formed
);
criterion_main!(benches);
