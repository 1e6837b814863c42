//! # Verifier Pipeline Benchmarks
//!
//! | Path | Work per item |
//! |------|---------------|
//! | Classifier, stream form | base64 decode of every key and value |
//! | Classifier, replay form | plain-text detection |
//! | Router | filters plus the verifier-address check |

use ac_tests::integration::fixtures::*;
use ac_verifier::adapters::memory::{InMemoryChainClient, StaticAssetVerifier};
use ac_verifier::adapters::Secp256k1Signer;
use ac_verifier::queue::queue;
use ac_verifier::router::RouterContext;
use ac_verifier::{ClassifiedEvent, EventRouter, HandlerRegistry, VerifierIdentity};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::TxEvent;
use std::sync::Arc;

fn onboard_events(count: usize, encoded: bool) -> Vec<TxEvent> {
    let attrs = onboard_attrs(OTHER_VERIFIER);
    (0..count)
        .map(|i| {
            let tx_hash = format!("TX{i:06}");
            if encoded {
                encoded_event(i as u64, &tx_hash, &as_pairs(&attrs))
            } else {
                decoded_event(i as u64, &tx_hash, &as_pairs(&attrs))
            }
        })
        .collect()
}

fn bench_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier");

    for (label, encoded) in [("stream", true), ("replay", false)] {
        let events = onboard_events(1_000, encoded);
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::new("classify", label), &events, |b, events| {
            b.iter(|| {
                for event in events {
                    black_box(ClassifiedEvent::classify(event));
                }
            })
        });
    }

    group.finish();
}

fn bench_router(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => panic!("tokio runtime: {e}"),
    };
    let signer = Secp256k1Signer::from_hex(VERIFIER_KEY, VERIFIER)
        .unwrap_or_else(|e| panic!("signer: {e}"));
    // Receivers are dropped so published items are discarded instead of piling up.
    let (outbound, _) = queue();
    let (diagnostics, _) = queue();
    let router = EventRouter::new(
        RouterContext {
            contract_address: CONTRACT.into(),
            chain: Arc::new(InMemoryChainClient::new()),
            identity: VerifierIdentity::new(Arc::new(signer)),
            processor: Arc::new(StaticAssetVerifier::approving()),
            outbound,
            diagnostics,
        },
        HandlerRegistry::with_defaults(),
    );
    let events: Vec<ClassifiedEvent> = onboard_events(1_000, true)
        .iter()
        .filter_map(ClassifiedEvent::classify)
        .collect();

    let mut group = c.benchmark_group("router");
    group.throughput(Throughput::Elements(events.len() as u64));
    group.bench_function("route_foreign_verifier", |b| {
        b.iter(|| {
            runtime.block_on(async {
                for event in &events {
                    black_box(router.route(event.clone()).await);
                }
            })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_classifier, bench_router);
criterion_main!(benches);
