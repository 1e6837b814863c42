//! # Lifecycle
//!
//! Supervisor start/stop/restart semantics and block stream restart
//! backoff, observed end to end.

use ac_verifier::adapters::memory::RunTail;
use ac_verifier::{DiagnosticEvent, ExitReason, OnboardingStatus, RestartConfig, StreamError, VerifierApi};
use shared_types::StreamBlock;
use std::time::Duration;

use super::fixtures::*;

fn restarts(events: &[DiagnosticEvent]) -> Vec<(Option<u64>, u32, Duration)> {
    events
        .iter()
        .filter_map(|event| match event {
            DiagnosticEvent::StreamRestarting {
                height,
                attempt,
                delay,
                ..
            } => Some((*height, *attempt, *delay)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_while_stuck_and_resets_on_progress() {
    let engine = EngineBuilder::default()
        .restart(RestartConfig::exponential(500, 10_000))
        .build()
        .await
        .unwrap();
    let source = &engine.source;
    source.push_run(
        vec![Ok(StreamBlock::empty(20)), Err(StreamError::transient("connection reset"))],
        RunTail::Complete,
    );
    source.push_run(vec![Err(StreamError::transient("timeout"))], RunTail::Complete);
    source.push_start_error(StreamError::transient("refused"));
    source.push_run(
        vec![Ok(StreamBlock::empty(21)), Err(StreamError::transient("connection reset"))],
        RunTail::Complete,
    );
    source.push_run(vec![Err(StreamError::fatal("node pruned"))], RunTail::Complete);

    let handle = engine.service.start(Some(20)).await;
    let exit = handle.wait().await;
    engine.service.stop().await;

    assert_eq!(exit.reason, ExitReason::Unrecoverable("node pruned".into()));
    assert_eq!(exit.last_height, Some(21));
    assert_eq!(
        source.starts(),
        vec![Some(20), Some(20), Some(20), Some(20), Some(21)]
    );
    assert_eq!(
        restarts(&engine.recorder.events()),
        vec![
            (Some(20), 0, Duration::from_millis(500)),
            (Some(20), 1, Duration::from_millis(1_000)),
            (Some(20), 2, Duration::from_millis(2_000)),
            (Some(21), 0, Duration::from_millis(500)),
        ]
    );
    assert_eq!(engine.recorder.count("stream_restarted"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_delay_does_not_grow() {
    let engine = EngineBuilder::default()
        .restart(RestartConfig::fixed(250))
        .build()
        .await
        .unwrap();
    for _ in 0..3 {
        engine
            .source
            .push_run(vec![Err(StreamError::transient("reset"))], RunTail::Complete);
    }
    engine
        .source
        .push_run(vec![Err(StreamError::fatal("halt"))], RunTail::Complete);

    let handle = engine.service.start(Some(1)).await;
    handle.wait().await;
    engine.service.stop().await;

    let delays: Vec<_> = restarts(&engine.recorder.events())
        .into_iter()
        .map(|(_, _, delay)| delay)
        .collect();
    assert_eq!(delays, vec![Duration::from_millis(250); 3]);
}

#[tokio::test]
async fn test_disabled_restart_exits_after_failure() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine.source.push_run(
        vec![Ok(StreamBlock::empty(4)), Err(StreamError::transient("reset"))],
        RunTail::Complete,
    );

    let handle = engine.service.start(Some(4)).await;
    let exit = handle.wait().await;

    assert_eq!(exit.reason, ExitReason::Failed("reset".into()));
    assert_eq!(exit.last_height, Some(4));
    assert!(!engine.service.is_running().await);
    engine.service.stop().await;
    assert_eq!(engine.recorder.count("stream_restarting"), 0);
}

#[tokio::test]
async fn test_start_twice_returns_same_run() {
    let engine = EngineBuilder::default().build().await.unwrap();

    let first = engine.service.start(Some(1)).await;
    let second = engine.service.start(Some(50)).await;

    assert_eq!(first.run_id(), second.run_id());
    assert!(engine.service.is_running().await);
    wait_until(|| !engine.source.starts().is_empty()).await;
    assert_eq!(engine.source.starts(), vec![Some(1)]);
    engine.service.stop().await;
}

#[tokio::test]
async fn test_stop_cancels_run_and_resets_sequence() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Pending));
    let attrs = onboard_attrs(VERIFIER);
    engine.source.push_run(
        vec![Ok(StreamBlock::with_events(
            100,
            vec![encoded_event(100, "ONBOARDTX", &as_pairs(&attrs))],
        ))],
        RunTail::Hang,
    );

    let handle = engine.service.start(Some(100)).await;
    wait_until(|| !engine.chain.broadcasts().is_empty()).await;
    assert!(engine.service.sequence_tracker().is_loaded());

    engine.service.stop().await;

    let exit = handle.wait().await;
    assert_eq!(exit.reason, ExitReason::Cancelled);
    assert_eq!(exit.last_height, Some(100));
    assert!(!engine.service.is_running().await);
    assert!(!engine.service.sequence_tracker().is_loaded());

    // A second stop is a no-op.
    engine.service.stop().await;
}

#[tokio::test]
async fn test_restart_resumes_from_requested_height() {
    let engine = EngineBuilder::default().build().await.unwrap();

    let first = engine.service.start(Some(10)).await;
    wait_until(|| engine.source.starts().len() == 1).await;
    let second = engine.service.restart(Some(15)).await;
    wait_until(|| engine.source.starts().len() == 2).await;

    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(first.wait().await.reason, ExitReason::Cancelled);
    assert!(!second.is_finished());
    assert_eq!(engine.source.starts(), vec![Some(10), Some(15)]);
    engine.service.stop().await;
}

#[tokio::test]
async fn test_start_after_exit_begins_new_run() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine.source.push_run(vec![], RunTail::Complete);

    let first = engine.service.start(Some(1)).await;
    first.wait().await;
    let second = engine.service.start(Some(2)).await;

    assert_ne!(first.run_id(), second.run_id());
    engine.service.stop().await;
}

#[tokio::test]
async fn test_start_after_exit_reloads_sequence() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Pending));
    let attrs = onboard_attrs(VERIFIER);
    engine.source.push_run(
        vec![Ok(StreamBlock::with_events(
            100,
            vec![encoded_event(100, "ONBOARDTX", &as_pairs(&attrs))],
        ))],
        RunTail::Complete,
    );

    let first = engine.service.start(Some(100)).await;
    wait_until(|| !engine.chain.broadcasts().is_empty()).await;
    first.wait().await;
    assert!(engine.service.sequence_tracker().is_loaded());

    let second = engine.service.start(Some(101)).await;

    assert_ne!(first.run_id(), second.run_id());
    assert!(!engine.service.sequence_tracker().is_loaded());
    engine.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_nothing_is_delivered_between_stop_and_start() {
    let engine = EngineBuilder::default().build().await.unwrap();
    engine
        .chain
        .put_scope_attribute(CONTRACT, scope_attribute(OnboardingStatus::Pending));
    let attrs = onboard_attrs(VERIFIER);
    engine
        .chain
        .put_tx_events("PASTTX", vec![decoded_event(90, "PASTTX", &as_pairs(&attrs))]);

    engine.service.start(Some(1)).await;
    engine.service.stop().await;
    let delivered = engine.recorder.events().len();

    engine.service.diagnostics().publish(DiagnosticEvent::Custom {
        name: "audit_written".into(),
        detail: SCOPE.into(),
    });
    assert_eq!(engine.service.replay_transaction("PASTTX").await.unwrap(), 1);
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(engine.recorder.events().len(), delivered);
    assert!(engine.chain.broadcasts().is_empty());

    engine.service.start(None).await;
    wait_until(|| engine.chain.broadcasts().len() == 1).await;
    engine.service.stop().await;
    assert_eq!(engine.recorder.count("audit_written"), 1);
    assert_eq!(engine.recorder.count("submission_succeeded"), 1);
}

#[tokio::test]
async fn test_custom_diagnostics_reach_the_handler() {
    let engine = EngineBuilder::default().build().await.unwrap();

    engine.service.start(Some(1)).await;
    engine.service.diagnostics().publish(DiagnosticEvent::Custom {
        name: "audit_written".into(),
        detail: SCOPE.into(),
    });
    engine.service.stop().await;

    assert_eq!(engine.recorder.count("audit_written"), 1);
}
