use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qrforge::core::records::{MemoryRecordStore, NewRecord, RecordStore};
use qrforge::pipeline::input::{parse_delimited, parse_structured};
use std::path::Path;

fn csv_rows(n: usize) -> String {
    let mut out = String::from("data,type\n");
    for i in 0..n {
        if i % 10 == 0 {
            out.push_str(",standard\n");
        } else {
            out.push_str(&format!("payload-{i}@example.com,standard\n"));
        }
    }
    out
}

fn json_rows(n: usize) -> String {
    let rows: Vec<serde_json::Value> = (0..n)
        .map(|i| serde_json::json!({ "data": format!("payload-{i}"), "type": "custom" }))
        .collect();
    serde_json::Value::Array(rows).to_string()
}

/// Input resolution throughput
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for size in [100, 1000, 10_000] {
        let csv = csv_rows(size);
        group.bench_with_input(BenchmarkId::new("csv", size), &csv, |b, csv| {
            b.iter(|| parse_delimited(black_box(csv.as_bytes())).unwrap());
        });

        let json = json_rows(size);
        group.bench_with_input(BenchmarkId::new("json", size), &json, |b, json| {
            b.iter(|| parse_structured(black_box(json.as_bytes())).unwrap());
        });
    }

    group.finish();
}

/// Claim path on the in-memory store, hit-heavy
fn bench_claims(c: &mut Criterion) {
    let store = MemoryRecordStore::new();
    for i in 0..1000 {
        store
            .insert(&NewRecord::now(&format!("p{i}"), "standard", Path::new("x.png")))
            .unwrap();
    }

    c.bench_function("memory_find_or_insert_hit", |b| {
        let record = NewRecord::now("p500", "standard", Path::new("y.png"));
        b.iter(|| store.find_or_insert(black_box(&record)).unwrap());
    });
}

criterion_group!(benches, bench_resolution, bench_claims);
criterion_main!(benches);
