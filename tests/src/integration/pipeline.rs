//! # Pipeline Flows
//!
//! Block stream → classifier → router → handler → outbound queue →
//! submitter → chain, with diagnostics observed through the handler.

use ac_verifier::adapters::memory::{RunTail, StaticAssetVerifier};
use ac_verifier::{
    handler_fn, ContractEventKind, DiagnosticEvent, ExitReason, HandlerRegistry, OnboardingStatus,
    VerifierApi,
};
use shared_types::{StreamBlock, TxEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::fixtures::*;

fn onboard_block(height: u64, verifier: &str) -> StreamBlock {
    let attrs = onboard_attrs(verifier);
    StreamBlock::with_events(height, vec![encoded_event(height, "ONBOARDTX", &as_pairs(&attrs))])
}

// =============================================================================
// ONBOARDING
// =============================================================================

#[tokio::test]
async fn test_onboard_event_is_verified_and_submitted() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Pending));
    engine
        .source
        .push_run(vec![Ok(onboard_block(100, VERIFIER))], RunTail::Hang);

    engine.service.start(Some(100)).await;
    wait_until(|| !engine.chain.broadcasts().is_empty()).await;
    engine.service.stop().await;

    let broadcasts = engine.chain.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    let tx = &broadcasts[0];
    assert_eq!(tx.body.sender, VERIFIER);
    assert_eq!(tx.body.contract, CONTRACT);
    assert_eq!(tx.body.account_number, 3);
    assert_eq!(tx.body.sequence, 10);
    assert_eq!(tx.body.msg["verify_asset"]["identifier"]["scope_address"], SCOPE);
    assert_eq!(tx.body.msg["verify_asset"]["asset_type"], "heloc");
    assert_eq!(tx.body.msg["verify_asset"]["success"], true);
    assert_eq!(engine.chain.account(VERIFIER).unwrap().sequence, 11);
    assert_eq!(engine.processor.calls(), 1);

    let names = engine.recorder.names();
    let pre_send = names.iter().position(|n| n == "onboard_event_pre_verify_send");
    let submitted = names.iter().position(|n| n == "submission_succeeded");
    assert!(pre_send.is_some() && submitted.is_some());
    assert!(pre_send < submitted);
}

#[tokio::test]
async fn test_consecutive_submissions_use_consecutive_sequences() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Pending));
    engine.source.push_run(
        vec![Ok(onboard_block(100, VERIFIER)), Ok(onboard_block(101, VERIFIER))],
        RunTail::Hang,
    );

    engine.service.start(Some(100)).await;
    wait_until(|| engine.chain.broadcasts().len() == 2).await;
    engine.service.stop().await;

    let sequences: Vec<u64> = engine
        .chain
        .broadcasts()
        .iter()
        .map(|tx| tx.body.sequence)
        .collect();
    assert_eq!(sequences, vec![10, 11]);
}

#[tokio::test]
async fn test_denied_asset_is_still_submitted() {
    let engine = EngineBuilder::default()
        .processor(StaticAssetVerifier::denying("document hash mismatch"))
        .build()
        .await
        .unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Pending));
    engine
        .source
        .push_run(vec![Ok(onboard_block(100, VERIFIER))], RunTail::Hang);

    engine.service.start(Some(100)).await;
    wait_until(|| !engine.chain.broadcasts().is_empty()).await;
    engine.service.stop().await;

    let msg = &engine.chain.broadcasts()[0].body.msg["verify_asset"];
    assert_eq!(msg["success"], false);
    assert_eq!(msg["message"], "document hash mismatch");
}

#[tokio::test]
async fn test_already_processed_scope_is_not_resubmitted() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Approved));
    engine
        .source
        .push_run(vec![Ok(onboard_block(100, VERIFIER))], RunTail::Complete);

    let handle = engine.service.start(Some(100)).await;
    assert_eq!(handle.wait().await.reason, ExitReason::Completed);
    engine.service.stop().await;

    assert!(engine.chain.broadcasts().is_empty());
    assert_eq!(engine.processor.calls(), 0);
    assert_eq!(
        engine.recorder.count("onboard_event_ignored_previously_processed"),
        1
    );
}

// =============================================================================
// FILTERING
// =============================================================================

#[tokio::test]
async fn test_foreign_and_unknown_events_never_reach_handlers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry = HandlerRegistry::empty().with(
        ContractEventKind::OnboardAsset,
        handler_fn(move |_params| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), anyhow::Error>(())
            }
        }),
    );
    let engine = EngineBuilder::default().handlers(registry).build().await.unwrap();

    let events = vec![
        encoded_event(
            5,
            "A",
            &[("_contract_address", "tp1othercontract"), ("asset_event_type", "onboard_asset")],
        ),
        encoded_event(
            5,
            "B",
            &[("_contract_address", CONTRACT), ("asset_event_type", "not_a_kind")],
        ),
        TxEvent::new(5, "C", "transfer", vec![]),
    ];
    engine
        .source
        .push_run(vec![Ok(StreamBlock::with_events(5, events))], RunTail::Complete);

    let handle = engine.service.start(Some(5)).await;
    handle.wait().await;
    engine.service.stop().await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.recorder.count("event_ignored_contract_mismatch"), 1);
    assert_eq!(engine.recorder.count("event_ignored_unknown_event"), 1);
    let about_events = engine
        .recorder
        .events()
        .iter()
        .filter(|event| event.event().is_some())
        .count();
    assert_eq!(about_events, 2);
}

#[tokio::test]
async fn test_event_for_other_verifier_yields_single_diagnostic() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Pending));
    engine
        .source
        .push_run(vec![Ok(onboard_block(100, OTHER_VERIFIER))], RunTail::Complete);

    let handle = engine.service.start(Some(100)).await;
    handle.wait().await;
    engine.service.stop().await;

    let about_event: Vec<_> = engine
        .recorder
        .events()
        .into_iter()
        .filter(|event| event.event().is_some())
        .collect();
    assert_eq!(about_event.len(), 1);
    assert!(matches!(
        &about_event[0],
        DiagnosticEvent::EventIgnoredDifferentVerifierAddress { registered, .. } if registered == VERIFIER
    ));
    assert_eq!(engine.processor.calls(), 0);
    assert!(engine.chain.broadcasts().is_empty());
}

#[tokio::test]
async fn test_handler_panic_does_not_stop_the_stream() {
    async fn explode(_params: ac_verifier::HandlerParams) -> anyhow::Result<()> {
        panic!("processor crashed")
    }
    let registry = HandlerRegistry::with_defaults().with(ContractEventKind::OnboardAsset, handler_fn(explode));
    let engine = EngineBuilder::default().handlers(registry).build().await.unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Approved));

    let verify = encoded_event(
        101,
        "VERIFYTX",
        &[
            ("_contract_address", CONTRACT),
            ("asset_event_type", "verify_asset"),
            ("asset_scope_address", SCOPE),
            ("asset_verifier_address", VERIFIER),
            ("asset_new_value", "approved"),
        ],
    );
    engine.source.push_run(
        vec![
            Ok(onboard_block(100, VERIFIER)),
            Ok(StreamBlock::with_events(101, vec![verify])),
        ],
        RunTail::Complete,
    );

    let handle = engine.service.start(Some(100)).await;
    let exit = handle.wait().await;
    engine.service.stop().await;

    assert_eq!(exit.last_height, Some(101));
    assert_eq!(engine.recorder.count("event_handler_failed"), 1);
    assert_eq!(engine.recorder.count("verify_event_successful"), 1);
}

// =============================================================================
// REPLAY
// =============================================================================

#[tokio::test]
async fn test_replayed_transaction_is_submitted_on_next_start() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Pending));
    let attrs = onboard_attrs(VERIFIER);
    engine.chain.put_tx_events(
        "PASTTX",
        vec![
            decoded_event(90, "PASTTX", &as_pairs(&attrs)),
            TxEvent::new(90, "PASTTX", "message", vec![]),
        ],
    );

    let routed = engine.service.replay_transaction("PASTTX").await.unwrap();
    assert_eq!(routed, 1);
    assert!(engine.chain.broadcasts().is_empty());

    engine.service.start(None).await;
    wait_until(|| engine.chain.broadcasts().len() == 1).await;
    engine.service.stop().await;

    assert_eq!(engine.recorder.count("submission_succeeded"), 1);
}

#[tokio::test]
async fn test_replay_of_unknown_transaction_fails() {
    let engine = EngineBuilder::default().build().await.unwrap();

    assert!(engine.service.replay_transaction("NOPE").await.is_err());

    engine.service.start(None).await;
    engine.service.stop().await;
    assert_eq!(engine.recorder.count("transaction_replay_failed"), 1);
}
