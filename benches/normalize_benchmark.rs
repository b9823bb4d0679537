//! Benchmarks for response normalization
//!
//! Measures decoding of job lists in each wrapper shape the node may send.
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use icn_realtime::gateway::normalize::normalize_list;
use icn_realtime::gateway::Payload;
use icn_realtime::models::MeshJob;
use icn_realtime::traits::Response;
use serde_json::{json, Value};

fn generate_jobs(count: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|i| {
                json!({
                    "id": format!("job-{}", i),
                    "submitter": "did:key:z6MkBench",
                    "status": if i % 3 == 0 { "Completed" } else { "Running" },
                    "created_at": "2024-01-01T00:00:00Z",
                    "progress": 0.5,
                })
            })
            .collect(),
    )
}

fn shapes(count: usize) -> Vec<(&'static str, Response)> {
    let jobs = generate_jobs(count);
    vec![
        ("bare", Response::new(200, jobs.to_string())),
        ("data", Response::new(200, json!({ "data": jobs }).to_string())),
        (
            "named",
            Response::new(200, json!({ "jobs": jobs, "total": count }).to_string()),
        ),
    ]
}

/// Parse and decode in one step, as the gateway does per request
fn bench_normalize_jobs(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_jobs");

    for size in [1, 50, 500].iter() {
        for (shape, response) in shapes(*size) {
            group.throughput(Throughput::Bytes(response.body.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(shape, size),
                &response,
                |b, response| {
                    b.iter(|| {
                        let payload = Payload::from_response(black_box(response));
                        let jobs: Vec<MeshJob> = normalize_list(payload, &["jobs"]).unwrap_or_default();
                        black_box(jobs)
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_normalize_jobs);
criterion_main!(benches);
