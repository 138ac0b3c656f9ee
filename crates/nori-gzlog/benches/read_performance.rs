use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use nori_gzlog::GzLog;
use tempfile::TempDir;

const RECORDS: usize = 10_000;

fn bench_reads(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let log = GzLog::new(temp_dir.path().join("log"));

    rt.block_on(async {
        for i in 0..RECORDS {
            let record = format!("event={i} user={} action=update", i % 97);
            log.write(record.as_bytes()).await.unwrap();
        }
    });

    let log = &log;
    let mut group = c.benchmark_group("read_performance");
    group.throughput(Throughput::Elements(RECORDS as u64));

    group.bench_function("forward_scan", |b| {
        b.to_async(&rt)
            .iter(|| async move { assert_eq!(log.read_all(0).await.unwrap().len(), RECORDS) });
    });

    group.bench_function("skip_all_but_last", |b| {
        b.to_async(&rt)
            .iter(|| async move { assert_eq!(log.read_all(RECORDS - 1).await.unwrap().len(), 1) });
    });

    group.bench_function("reverse_scan", |b| {
        b.to_async(&rt).iter(|| async move {
            let mut reader = log.read_rev().await.unwrap();
            let mut n = 0;
            while reader.next_record().await.unwrap().is_some() {
                n += 1;
            }
            assert_eq!(n, RECORDS);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_reads);
criterion_main!(benches);
