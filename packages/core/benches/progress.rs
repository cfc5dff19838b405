//! Benchmarks for the progress engine
//!
//! Run with: `cargo bench -p nodes-core`
//!
//! - Batch progress over a full dashboard day (pure calculation)
//! - Absolute write followed by a single-node re-read (in-memory backend)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nodes_core::db::MemoryBackend;
use nodes_core::models::{batch_progress, DayKey, Impulse, NewNode, Node, NodeType};
use nodes_core::services::ImpulseLedger;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn day() -> DayKey {
    "2024-06-01".parse().unwrap()
}

fn node(i: usize) -> Node {
    let node_type = match i % 3 {
        0 => NodeType::Binary,
        1 => NodeType::Quantity,
        _ => NodeType::Duration,
    };
    Node::from_new(
        format!("node-{}", i),
        "bench",
        NewNode {
            name: format!("Node {}", i),
            description: None,
            node_type,
            mass: 1.0,
            target_value: Some(20.0),
            color: "#8b5cf6".to_string(),
            icon: "Circle".to_string(),
            core_id: None,
            connector_ids: Vec::new(),
        },
    )
}

/// 100 nodes with 10 impulses each
fn day_fixture() -> (Vec<Node>, Vec<Impulse>) {
    let nodes: Vec<Node> = (0..100).map(node).collect();
    let impulses = nodes
        .iter()
        .flat_map(|n| {
            (0..10).map(move |j| Impulse {
                id: format!("{}-{}", n.id, j),
                node_id: n.id.clone(),
                value: (j + 1) as f64,
                completed_at: day(),
                created_at: chrono::Utc::now(),
            })
        })
        .collect();
    (nodes, impulses)
}

fn bench_batch_progress(c: &mut Criterion) {
    let (nodes, impulses) = day_fixture();

    c.bench_function("batch_progress_100x10", |b| {
        b.iter(|| black_box(batch_progress(black_box(&nodes), black_box(&impulses))))
    });
}

fn bench_record_and_reread(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let backend = MemoryBackend::new("bench");
    let target = node(1);
    backend.seed_node(target.clone());
    let ledger = ImpulseLedger::new(Arc::new(backend.clone()));

    let mut group = c.benchmark_group("impulse_ledger");
    group.sample_size(50);
    group.bench_function("set_then_read", |b| {
        b.iter(|| {
            rt.block_on(async {
                ledger.set_absolute(&target.id, 5.0, day()).await.unwrap();
                black_box(ledger.read_progress(&target, day()).await.unwrap())
            })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_batch_progress, bench_record_and_reread);
criterion_main!(benches);
