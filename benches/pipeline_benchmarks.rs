//! Benchmarks for grouping and retention ranking.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dupescout::classify::Category;
use dupescout::duplicates::group_by_hash;
use dupescout::recommend::Recommender;
use dupescout::scanner::{FileId, FileRecord};

fn record(id: u64, hash_byte: u8) -> FileRecord {
    FileRecord {
        id: FileId(id),
        name: format!("file{id}.bin"),
        path: format!("/data/dir{}/file{id}.bin", id % 50).into(),
        size: 1024 + id % 4096,
        mime_type: "application/octet-stream".to_string(),
        last_modified: Utc
            .with_ymd_and_hms(2024, 1, 1 + (id % 27) as u32, 0, 0, 0)
            .unwrap(),
        content_hash: [hash_byte; 32],
        category: Category::Other,
        category_confidence: 0.0,
        version: (id % 7 == 0).then(|| format!("1.{}", id % 10)),
    }
}

fn bench_grouping(c: &mut Criterion) {
    let records: Vec<FileRecord> = (0..10_000).map(|i| record(i, (i % 128) as u8)).collect();

    c.bench_function("group_by_hash_10k", |b| {
        b.iter(|| {
            let (groups, stats) = group_by_hash(black_box(records.clone()));
            black_box((groups, stats))
        })
    });
}

fn bench_recommendation(c: &mut Criterion) {
    let records: Vec<FileRecord> = (0..32).map(|i| record(i, 1)).collect();
    let refs: Vec<&FileRecord> = records.iter().collect();
    let recommender = Recommender::new();

    c.bench_function("recommend_32_members", |b| {
        b.iter(|| black_box(recommender.recommend([1u8; 32], black_box(&refs)).unwrap()))
    });
}

criterion_group!(benches, bench_grouping, bench_recommendation);
criterion_main!(benches);
