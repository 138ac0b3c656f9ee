use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nori_gzlog::{Compression, GzLog, GzLogConfig};
use tempfile::TempDir;

fn bench_sequential_writes(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("sequential_writes");

    for size in [64usize, 1024, 16 * 1024] {
        let record: Vec<u8> = (0..size).map(|i| (i % 61) as u8).collect();

        for compression in [Compression::Zlib, Compression::Zstd, Compression::Lz4] {
            let temp_dir = TempDir::new().unwrap();
            let log = GzLog::with_config(GzLogConfig {
                path: temp_dir.path().join("log"),
                compression,
                ..Default::default()
            });

            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{compression:?}"), size),
                &record,
                |b, record| {
                    let log = &log;
                    b.to_async(&rt)
                        .iter(|| async move { log.write(record).await.unwrap() });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_sequential_writes);
criterion_main!(benches);
