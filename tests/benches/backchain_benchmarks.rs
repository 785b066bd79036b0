//! # Backchain Benchmarks
//!
//! | Subsystem | Operation | Shape |
//! |-----------|-----------|-------|
//! | lb-02 Backchain Resolution | `TopologicalSort::complete` | linear chain, random DAG |
//! | lb-02 Backchain Resolution | full resolution against an in-process peer | linear chain |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lb_02_backchain_resolution::test_utils::{chain, PeerSession, RecordingVerifier};
use lb_02_backchain_resolution::{
    BackchainResolutionApi, BackchainResolutionService, InMemoryLedgerStore, ResolutionConfig,
    TopologicalSort,
};
use rand::{Rng, SeedableRng};
use shared_types::entities::TransactionId;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// LB-02: Topological sort
// ============================================================================

fn linear_sort(size: u64) -> TopologicalSort {
    let mut sort = TopologicalSort::new();
    for n in 1..=size {
        let dependencies = (n > 1).then(|| TransactionId::from_low_u64(n - 1));
        sort.add(TransactionId::from_low_u64(n), dependencies);
    }
    sort
}

/// Each node depends on up to three earlier nodes.
fn random_dag(size: u64) -> TopologicalSort {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let mut sort = TopologicalSort::new();
    for n in 1..=size {
        let dependencies: Vec<TransactionId> = if n == 1 {
            Vec::new()
        } else {
            (0..rng.gen_range(1..=3))
                .map(|_| TransactionId::from_low_u64(rng.gen_range(1..n)))
                .collect()
        };
        sort.add(TransactionId::from_low_u64(n), dependencies);
    }
    sort
}

fn bench_topological_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("lb-02-topological-sort");
    group.measurement_time(Duration::from_secs(5));

    for size in [100u64, 1_000, 10_000] {
        let linear = linear_sort(size);
        let dag = random_dag(size);

        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::new("linear", size), &linear, |b, sort| {
            b.iter(|| black_box(sort.complete().map(|order| order.len())))
        });
        group.bench_with_input(BenchmarkId::new("random_dag", size), &dag, |b, sort| {
            b.iter(|| black_box(sort.complete().map(|order| order.len())))
        });
    }

    group.finish();
}

// ============================================================================
// LB-02: Resolution against an in-process peer
// ============================================================================

fn bench_chain_resolution(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    let mut group = c.benchmark_group("lb-02-chain-resolution");
    group.measurement_time(Duration::from_secs(10));

    for length in [10usize, 100, 500] {
        let txs = chain(length);
        let tip = txs[length - 1].id;

        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(BenchmarkId::new("batch_50", length), &txs, |b, txs| {
            b.iter(|| {
                runtime.block_on(async {
                    let store = Arc::new(InMemoryLedgerStore::new());
                    let verifier = Arc::new(RecordingVerifier::new(store.clone()));
                    let service = BackchainResolutionService::new(
                        store.clone(),
                        store,
                        verifier,
                        ResolutionConfig::default(),
                    );
                    let mut peer = PeerSession::new("bench").with_transactions(txs.iter().cloned());
                    black_box(service.resolve(&[tip], &mut peer).await.map(|o| o.verified_count()))
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_topological_sort, bench_chain_resolution);
criterion_main!(benches);
