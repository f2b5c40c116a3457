//! Benchmarks for URL building and artifact checksum computation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use remotescan::endpoint::EndpointBuilder;
use remotescan::job::RemoteJobId;
use remotescan::request::ArtifactData;

fn endpoint_benchmark(c: &mut Criterion) {
    let endpoints = EndpointBuilder::new("https://scanner.example.com");
    let job_id = RemoteJobId::random();

    c.bench_function("job_status_url", |b| {
        b.iter(|| black_box(endpoints.job_status(black_box(job_id))))
    });

    c.bench_function("artifact_checksum_64k", |b| {
        let content = vec![0xA5u8; 64 * 1024];
        b.iter(|| black_box(ArtifactData::from_bytes(black_box(content.clone()))))
    });
}

criterion_group!(benches, endpoint_benchmark);
criterion_main!(benches);
