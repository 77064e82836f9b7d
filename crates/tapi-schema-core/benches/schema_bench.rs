//! # Schema Benchmarks
//!
//! Performance benchmarks for index construction, tree resolution and full
//! schema assembly.
//!
//! Run with: `cargo bench -p tapi-schema-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;
use tapi_schema_core::{
    ConnectionTreeResolver, ConnectionUuid, ReferenceIndex, TapiContext, build_schema,
};

/// A snapshot with `nodes` nodes of 4 NEPs (2 CEPs each) and one connection
/// chain of `depth` lower connections per node.
fn create_snapshot(nodes: usize, depth: usize) -> TapiContext {
    let mut topology_nodes = Vec::new();
    let mut connections = Vec::new();

    for n in 0..nodes {
        let neps: Vec<Value> = (0..4)
            .map(|p| {
                json!({
                    "uuid": format!("nep-{}-{}", n, p),
                    "inventory-id": format!("/ne={}/r=1/sh=1/sl={}", n, p / 2),
                    "cep-list": {"connection-end-point": [
                        {"uuid": format!("cep-{}-{}-a", n, p)},
                        {"uuid": format!("cep-{}-{}-b", n, p)}
                    ]}
                })
            })
            .collect();
        topology_nodes.push(json!({"uuid": format!("node-{}", n), "owned-node-edge-point": neps}));

        for d in 0..depth {
            let lower = if d + 1 < depth {
                json!([{"connection-uuid": format!("conn-{}-{}", n, d + 1)}])
            } else {
                json!([])
            };
            connections.push(json!({
                "uuid": format!("conn-{}-{}", n, d),
                "connection-end-point": [{"connection-end-point-uuid": format!("cep-{}-{}-a", n, d % 4)}],
                "lower-connection": lower
            }));
        }
    }

    TapiContext::from_value(json!({
        "tapi-topology:topology-context": {"topology": [{"node": topology_nodes}]},
        "tapi-connectivity:connectivity-context": {"connection": connections}
    }))
    .expect("snapshot")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");

    for size in [10, 100, 1000].iter() {
        let ctx = create_snapshot(*size, 4);
        group.bench_with_input(BenchmarkId::from_parameter(size), &ctx, |b, ctx| {
            b.iter(|| black_box(ReferenceIndex::build(ctx).map(|i| i.len())));
        });
    }

    group.finish();
}

fn bench_resolve_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_chain");

    for depth in [4, 16, 64].iter() {
        let ctx = create_snapshot(1, *depth);
        let index = ReferenceIndex::build(&ctx).expect("index");
        let resolver = ConnectionTreeResolver::new(&index);
        let root = ConnectionUuid::from("conn-0-0");

        group.bench_with_input(BenchmarkId::from_parameter(depth), &root, |b, root| {
            b.iter(|| black_box(resolver.resolve(root).flatten()));
        });
    }

    group.finish();
}

fn bench_build_schema(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_schema");

    for size in [10, 100, 500].iter() {
        let ctx = create_snapshot(*size, 4);
        group.bench_with_input(BenchmarkId::from_parameter(size), &ctx, |b, ctx| {
            b.iter(|| black_box(build_schema(ctx)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_index_build,
    bench_resolve_chain,
    bench_build_schema
);
criterion_main!(benches);
