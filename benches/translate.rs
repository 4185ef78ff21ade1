//! Benchmarks for pipeline translation.
//!
//! Compares the sequential fan-out with the concurrent one on the built-in
//! four-subnet pipeline.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use octopus::{Pipeline, PipelineFactory, Registry};
use serde_json::json;
use std::hint::black_box;
use tempfile::TempDir;

fn pipeline(dir: &TempDir, embed_dim: usize) -> Pipeline {
    let document = json!({
        "domain": "medical",
        "data_dir": dir.path().join("data"),
        "memory_dir": dir.path().join("memory"),
        "adapters": {
            "source": "chinese_v1",
            "target": "english_v1",
            "source_params": {"embed_dim": embed_dim},
            "target_params": {"embed_dim": embed_dim}
        },
        "subnets": [
            {"name": "lexical_v1", "params": {"in_memory": true}},
            {"name": "syntax_v1", "params": {"in_memory": true}},
            {"name": "context_v1", "params": {"in_memory": true}},
            {"name": "domain_v1", "params": {"in_memory": true}}
        ],
        "coordinator": {"name": "attention_v1"}
    });
    PipelineFactory::new(Registry::global())
        .build_from_value(&document)
        .unwrap()
}

fn bench_translate(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let text = "心梗患者需要紧急处理";

    let mut group = c.benchmark_group("translate");
    for embed_dim in [64usize, 768] {
        let pipeline = pipeline(&dir, embed_dim);
        group.bench_with_input(
            BenchmarkId::new("sequential", embed_dim),
            &pipeline,
            |b, p| b.iter(|| p.translate(black_box(text), "").unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("concurrent", embed_dim),
            &pipeline,
            |b, p| {
                b.iter(|| {
                    runtime
                        .block_on(p.translate_concurrent(black_box(text), ""))
                        .unwrap()
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_translate);
criterion_main!(benches);
