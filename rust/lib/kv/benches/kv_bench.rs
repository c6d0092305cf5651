use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

use voucher_kv::{KVStore, Precondition, RedbStore, WriteOp};

fn bench_redb_get(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let store = RedbStore::open(&tmp.path().join("bench.redb")).unwrap();

    for i in 0..1000 {
        let key = format!("codes:entry:{:04}", i);
        store.set(&key, b"{\"status\":\"UNUSED\"}").unwrap();
    }

    c.bench_function("redb_get", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("codes:entry:{:04}", i % 1000);
            let _ = store.get(black_box(&key)).unwrap();
            i += 1;
        });
    });
}

fn bench_redb_scan(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let store = RedbStore::open(&tmp.path().join("bench.redb")).unwrap();

    for i in 0..1000 {
        let key = format!("codes:entry:{:04}", i);
        store.set(&key, b"{\"status\":\"UNUSED\"}").unwrap();
    }

    c.bench_function("redb_scan_1000", |b| {
        b.iter(|| {
            let results = store.scan(black_box("codes:entry:")).unwrap();
            assert_eq!(results.len(), 1000);
        });
    });
}

fn bench_commit_insert_batch(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let store = RedbStore::open(&tmp.path().join("bench.redb")).unwrap();

    c.bench_function("commit_insert_100", |b| {
        let mut batch = 0u64;
        b.iter(|| {
            let keys: Vec<String> = (0..100)
                .map(|i| format!("codes:entry:{:08}:{:03}", batch, i))
                .collect();
            let checks: Vec<Precondition<'_>> =
                keys.iter().map(|k| Precondition::Absent(k)).collect();
            let ops: Vec<WriteOp<'_>> = keys
                .iter()
                .map(|k| WriteOp::Put(k, b"{\"status\":\"UNUSED\"}"))
                .collect();
            store.commit(black_box(&checks), black_box(&ops)).unwrap();
            batch += 1;
        });
    });
}

fn bench_commit_compare_and_swap(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let store = RedbStore::open(&tmp.path().join("bench.redb")).unwrap();
    store.set("codes:entry:CAS", b"a").unwrap();

    c.bench_function("commit_cas", |b| {
        let mut flip = false;
        b.iter(|| {
            let (from, to): (&[u8], &[u8]) = if flip { (b"b", b"a") } else { (b"a", b"b") };
            store
                .commit(
                    &[Precondition::Equals("codes:entry:CAS", from)],
                    &[WriteOp::Put("codes:entry:CAS", to)],
                )
                .unwrap();
            flip = !flip;
        });
    });
}

criterion_group!(
    benches,
    bench_redb_get,
    bench_redb_scan,
    bench_commit_insert_batch,
    bench_commit_compare_and_swap,
);
criterion_main!(benches);
