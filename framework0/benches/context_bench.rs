//! Benchmarks for the shared context and graph ordering.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use framework0::context::Context;
use framework0::pipeline::DependencyGraph;
use serde_json::json;

fn seeded_context(keys: usize) -> Context {
    let ctx = Context::new();
    for i in 0..keys {
        let _ = ctx.set(format!("bench.key{i}"), json!({"value": i}), "bench");
    }
    ctx
}

fn context_benchmark(c: &mut Criterion) {
    c.bench_function("context_set", |b| {
        let ctx = Context::new();
        let mut i = 0_u64;
        b.iter(|| {
            i += 1;
            let _ = ctx.set("bench.counter", json!(i), "bench");
        });
    });

    c.bench_function("context_get", |b| {
        let ctx = seeded_context(1_000);
        b.iter(|| black_box(ctx.get("bench.key500")));
    });

    c.bench_function("context_snapshot_restore_1k", |b| {
        let ctx = seeded_context(1_000);
        let id = ctx.create_snapshot("bench");
        b.iter(|| {
            let _ = ctx.set("bench.key1", json!("dirty"), "bench");
            let _ = ctx.restore_snapshot(&id, "bench");
        });
    });
}

fn graph_benchmark(c: &mut Criterion) {
    let mut graph = DependencyGraph::new();
    graph.add_task("step0", Vec::<String>::new());
    for i in 1..500 {
        graph.add_task(format!("step{i}"), [format!("step{}", i - 1), format!("step{}", i / 2)]);
    }

    c.bench_function("graph_order_500", |b| {
        b.iter(|| black_box(graph.get_task_order()));
    });
}

criterion_group!(benches, context_benchmark, graph_benchmark);
criterion_main!(benches);
