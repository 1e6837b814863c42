//! Default diagnostic handler: structured logs plus Prometheus metrics.

use async_trait::async_trait;
use verifier_telemetry::{
    metric_inc, metric_observe, BLOCKS_RECEIVED, EVENTS_IGNORED, HANDLER_FAILURES,
    ONBOARD_EVENTS, RESTART_DELAY, STREAM_EXITS, STREAM_RESTARTS, SUBMISSIONS, TRACKED_HEIGHT,
    VERIFY_EVENTS,
};

use super::DiagnosticEvent;
use crate::ports::DiagnosticHandler;

/// Logs every diagnostic through `tracing` and updates the verifier metrics.
#[derive(Debug, Clone, Default)]
pub struct LoggingDiagnosticHandler;

impl LoggingDiagnosticHandler {
    pub fn new() -> Self {
        Self
    }

    fn record_metrics(event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::BlockReceived { .. } => metric_inc!(BLOCKS_RECEIVED),
            DiagnosticEvent::HeightAdvanced { height } => TRACKED_HEIGHT.set(*height as f64),
            DiagnosticEvent::StreamRestarting { delay, .. } => {
                metric_observe!(RESTART_DELAY, delay.as_secs_f64())
            }
            DiagnosticEvent::StreamRestarted { .. } => metric_inc!(STREAM_RESTARTS),
            DiagnosticEvent::StreamExited { reason, .. } => {
                metric_inc!(STREAM_EXITS, &[reason.label()])
            }
            DiagnosticEvent::EventHandlerFailed { kind, .. } => {
                metric_inc!(HANDLER_FAILURES, &[kind.contract_name()])
            }
            DiagnosticEvent::OnboardEventIgnoredPreviouslyProcessed { .. } => {
                metric_inc!(ONBOARD_EVENTS, &["previously_processed"])
            }
            DiagnosticEvent::OnboardEventFailedToFetchScopeAttribute { .. }
            | DiagnosticEvent::OnboardEventFailedToRetrieveAsset { .. }
            | DiagnosticEvent::OnboardEventFailedToVerifyAsset { .. } => {
                metric_inc!(ONBOARD_EVENTS, &["failed"])
            }
            DiagnosticEvent::OnboardEventPreVerifySend { .. } => {
                metric_inc!(ONBOARD_EVENTS, &["queued"])
            }
            DiagnosticEvent::VerifyEventSuccessful { .. } => {
                metric_inc!(VERIFY_EVENTS, &["successful"])
            }
            DiagnosticEvent::VerifyEventStillPending { .. } => {
                metric_inc!(VERIFY_EVENTS, &["still_pending"])
            }
            DiagnosticEvent::VerifyEventFailedToFetchScopeAttribute { .. }
            | DiagnosticEvent::VerifyEventUnexpectedStatus { .. } => {
                metric_inc!(VERIFY_EVENTS, &["failed"])
            }
            DiagnosticEvent::SubmissionSucceeded { .. } => metric_inc!(SUBMISSIONS, &["succeeded"]),
            DiagnosticEvent::SubmissionFailed { .. } => metric_inc!(SUBMISSIONS, &["failed"]),
            DiagnosticEvent::SubmissionThrew { .. } => metric_inc!(SUBMISSIONS, &["threw"]),
            DiagnosticEvent::SubmissionResyncFailed { .. } => {
                metric_inc!(SUBMISSIONS, &["resync_failed"])
            }
            ignored if ignored.is_ignored() => metric_inc!(EVENTS_IGNORED, &[ignored.name()]),
            _ => {}
        }
    }

    fn log(event: &DiagnosticEvent) {
        let name = event.name();
        match event {
            DiagnosticEvent::BlockReceived {
                height,
                event_count,
            } => tracing::debug!(name, height, event_count, "Block received"),
            DiagnosticEvent::HeightAdvanced { height } => {
                tracing::trace!(name, height, "Tracked height advanced")
            }
            DiagnosticEvent::StreamRestarting {
                height,
                attempt,
                delay,
                error,
            } => tracing::warn!(
                name,
                height = ?height,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = error.as_deref().unwrap_or("stream completed"),
                "Block stream restarting"
            ),
            DiagnosticEvent::StreamRestarted { height, attempt } => {
                tracing::info!(name, height = ?height, attempt, "Block stream restarted")
            }
            DiagnosticEvent::StreamCompleted { height } => {
                tracing::info!(name, height = ?height, "Block stream completed")
            }
            DiagnosticEvent::StreamExited { height, reason } => match reason.error() {
                Some(error) => tracing::error!(name, height = ?height, error, "Block stream exited"),
                None => tracing::info!(name, height = ?height, reason = reason.label(), "Block stream exited"),
            },
            DiagnosticEvent::EventHandlerFailed { event, kind, error } => tracing::error!(
                name,
                tx_hash = event.tx_hash(),
                kind = %kind,
                error = %error,
                "Event handler failed"
            ),
            DiagnosticEvent::OnboardEventFailedToFetchScopeAttribute { event, error }
            | DiagnosticEvent::OnboardEventFailedToRetrieveAsset { event, error }
            | DiagnosticEvent::OnboardEventFailedToVerifyAsset { event, error }
            | DiagnosticEvent::VerifyEventFailedToFetchScopeAttribute { event, error } => {
                tracing::error!(name, tx_hash = event.tx_hash(), error = %error, "Event processing failed")
            }
            DiagnosticEvent::OnboardEventPreVerifySend { event, decision } => tracing::info!(
                name,
                tx_hash = event.tx_hash(),
                scope = event.scope_address().unwrap_or_default(),
                success = decision.success,
                "Verification queued"
            ),
            DiagnosticEvent::VerifyEventSuccessful { event, status } => tracing::info!(
                name,
                tx_hash = event.tx_hash(),
                status = %status,
                "Verification recorded on chain"
            ),
            DiagnosticEvent::VerifyEventStillPending { event } => tracing::warn!(
                name,
                tx_hash = event.tx_hash(),
                "Verification event seen but scope is still pending"
            ),
            DiagnosticEvent::VerifyEventUnexpectedStatus {
                event,
                reported,
                actual,
            } => tracing::warn!(
                name,
                tx_hash = event.tx_hash(),
                reported = ?reported,
                actual = %actual,
                "Unexpected onboarding status"
            ),
            DiagnosticEvent::SubmissionSucceeded {
                verification,
                response,
            } => tracing::info!(
                name,
                id = %verification.id,
                tx_hash = %response.tx_hash,
                "{} Verification submitted",
                verification.message_prefix
            ),
            DiagnosticEvent::SubmissionFailed {
                verification,
                response,
            } => tracing::error!(
                name,
                id = %verification.id,
                code = response.code,
                raw_log = %response.raw_log,
                "{} Verification rejected by chain",
                verification.message_prefix
            ),
            DiagnosticEvent::SubmissionThrew {
                verification,
                error,
            }
            | DiagnosticEvent::SubmissionResyncFailed {
                verification,
                error,
            } => tracing::error!(
                name,
                id = %verification.id,
                error = %error,
                "{} Verification submission error",
                verification.message_prefix
            ),
            DiagnosticEvent::TransactionReplayFailed { tx_hash, error } => {
                tracing::error!(name, tx_hash = %tx_hash, error = %error, "Transaction replay failed")
            }
            DiagnosticEvent::Custom { detail, .. } => tracing::info!(name, detail = %detail, "Custom diagnostic"),
            other => match other.event() {
                Some(event) => tracing::debug!(name, "Ignored {}", event),
                None => tracing::debug!(name, "Diagnostic"),
            },
        }
    }
}

#[async_trait]
impl DiagnosticHandler for LoggingDiagnosticHandler {
    async fn handle(&self, event: &DiagnosticEvent) -> anyhow::Result<()> {
        Self::log(event);
        Self::record_metrics(event);
        Ok(())
    }
}
