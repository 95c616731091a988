//! Table engine benchmarks.

use chaindb_bench::utils::{bench_db, populated_db, random_row, BENCH_OWNER, COLUMNS};
use chaindb_core::{Config, Database};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

/// Benchmark row writes against the in-memory ledger.
fn bench_write_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_row");

    for size in [16, 128, 512].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let db = bench_db();
            let row = random_row(0, size);
            b.iter(|| {
                db.write_row_value("bench", black_box(row.clone())).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark row writes against the file ledger, with and without fsync.
fn bench_write_row_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_row_file");
    group.sample_size(20);

    for sync in [false, true] {
        group.bench_with_input(BenchmarkId::from_parameter(sync), &sync, |b, &sync| {
            let dir = TempDir::new().unwrap();
            let config = Config::default().sync_on_commit(sync);
            let db = Database::open(&dir.path().join("ledger"), BENCH_OWNER, config).unwrap();
            db.ensure_root().unwrap();
            db.ensure_table("bench", COLUMNS, "id").unwrap();
            let row = random_row(0, 128);
            b.iter(|| {
                db.write_row_value("bench", black_box(row.clone())).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark folding corrections into the view.
fn bench_materialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize");
    group.sample_size(20);

    for count in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let db = populated_db(count);
            b.iter(|| black_box(db.materialize("bench", &BENCH_OWNER).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark chain verification of a whole table.
fn bench_verify_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify_table");

    for count in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let db = populated_db(count);
            b.iter(|| {
                let report = db.verify_table("bench", &BENCH_OWNER).unwrap();
                assert!(report.is_intact());
            });
        });
    }
    group.finish();
}

/// Benchmark reading the latest rows.
fn bench_read_rows(c: &mut Criterion) {
    let db = populated_db(1000);
    c.bench_function("read_rows_latest_50", |b| {
        b.iter(|| black_box(db.read_rows("bench", &BENCH_OWNER, Some(50)).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_write_row,
    bench_write_row_file,
    bench_materialize,
    bench_verify_table,
    bench_read_rows,
);
criterion_main!(benches);
