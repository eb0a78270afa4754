//! Journal Write/Read Benchmarks
//!
//! ## Benchmark Path Types
//!
//! - `memory_*`: Journal over `MemoryStore` (engine cost only)
//! - `sqlite_*`: Journal over `SqliteStore` on a temp file (engine + driver + fsync)
//!
//! ## What These Benchmarks Prove
//!
//! | Benchmark | Semantic Guarantee | Regression Detection |
//! |-----------|-------------------|----------------------|
//! | *_append/* | Each batch gets the next contiguous sequence range | Counter/transaction overhead |
//! | *_consistent/* | Versioned update replaces the row in place | Update path vs insert path |
//! | *_read/* | Range scan returns rows in axis order | Index/scan degradation |
//!
//! ## Running
//!
//! ```bash
//! cargo bench --bench journal_write
//! cargo bench --bench journal_write -- "memory_append"  # specific group
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use journaldb::{
    CancellationToken, Entry, Journal, JournalId, JournalSettings, LocationKind, MemoryStore,
    RelationalStore, SqliteStore, SystemClock,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// =============================================================================
// Test Utilities - All allocation happens here, outside timed loops
// =============================================================================

fn open_journal(store: Arc<dyn RelationalStore>, name: &str) -> Journal {
    Journal::open(
        JournalId::new(name).unwrap(),
        JournalSettings::default(),
        store,
        Arc::new(SystemClock),
        &CancellationToken::new(),
    )
    .unwrap()
}

fn make_batch(prefix: &str, size: usize) -> Vec<Entry> {
    (0..size)
        .map(|i| {
            Entry::appended(format!("{}-{}", prefix, i), vec![0u8; 128], vec![])
                .with_tags([if i % 2 == 0 { "even" } else { "odd" }])
        })
        .collect()
}

fn populate(journal: &Journal, count: usize) {
    let cancel = CancellationToken::new();
    for chunk in 0..count / 100 {
        journal
            .write(&make_batch(&format!("seed{}", chunk), 100), &cancel)
            .unwrap();
    }
}

// =============================================================================
// Append Benchmarks
// =============================================================================
// Semantic: A batch commits atomically with contiguous sequences
// Regression: Lock hold time, per-row insert cost

fn append_benchmarks(c: &mut Criterion) {
    let cancel = CancellationToken::new();

    let mut group = c.benchmark_group("memory_append");
    for batch in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(batch as u64));
        let journal = open_journal(Arc::new(MemoryStore::new()), "bench-memory");
        let entries = make_batch("m", batch);
        group.bench_with_input(BenchmarkId::new("batch", batch), &entries, |b, entries| {
            b.iter(|| black_box(journal.write(entries, &cancel).unwrap()));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("sqlite_append");
    for batch in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(batch as u64));
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("bench.db"), Duration::from_secs(3))
            .unwrap();
        let journal = open_journal(Arc::new(store), "bench-sqlite");
        let entries = make_batch("s", batch);
        group.bench_with_input(BenchmarkId::new("batch", batch), &entries, |b, entries| {
            b.iter(|| black_box(journal.write(entries, &cancel).unwrap()));
        });
    }
    group.finish();
}

// =============================================================================
// Consistent Update Benchmarks
// =============================================================================
// Semantic: Versioned write replaces the row keyed by entry id

fn consistent_benchmarks(c: &mut Criterion) {
    let cancel = CancellationToken::new();
    let mut group = c.benchmark_group("memory_consistent");
    group.throughput(Throughput::Elements(1));

    let journal = open_journal(Arc::new(MemoryStore::new()), "bench-consistent");
    journal
        .write(&[Entry::consistent("doc", 0, vec![0u8; 128], vec![])], &cancel)
        .unwrap();
    let version = AtomicI64::new(1);

    group.bench_function("update/hot_entry", |b| {
        b.iter(|| {
            let v = version.fetch_add(1, Ordering::Relaxed);
            let entry = Entry::consistent("doc", v, vec![0u8; 128], vec![]);
            black_box(journal.write(&[entry], &cancel).unwrap())
        });
    });
    group.finish();
}

// =============================================================================
// Read Benchmarks
// =============================================================================
// Semantic: Range and tag reads return rows in axis order
// Regression: Scan cost as the journal grows

fn read_benchmarks(c: &mut Criterion) {
    let cancel = CancellationToken::new();
    let mut group = c.benchmark_group("memory_read");

    let journal = open_journal(Arc::new(MemoryStore::new()), "bench-read");
    populate(&journal, 10_000);

    for window in [10i64, 100, 1_000] {
        group.throughput(Throughput::Elements(window as u64));
        group.bench_with_input(BenchmarkId::new("range", window), &window, |b, &window| {
            b.iter(|| {
                black_box(
                    journal
                        .read(LocationKind::Sequence, 5_000, Some(5_000 + window), &cancel)
                        .unwrap(),
                )
            });
        });
    }

    group.bench_function("tags/odd_window_1000", |b| {
        b.iter(|| {
            black_box(
                journal
                    .read_with_tags(LocationKind::Sequence, 5_000, Some(6_000), &["odd"], &cancel)
                    .unwrap(),
            )
        });
    });
    group.finish();
}

criterion_group!(
    name = writes;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(20);
    targets = append_benchmarks, consistent_benchmarks
);

criterion_group!(
    name = reads;
    config = Criterion::default().sample_size(20);
    targets = read_benchmarks
);

criterion_main!(writes, reads);
