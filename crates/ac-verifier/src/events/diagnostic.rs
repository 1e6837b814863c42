//! # Diagnostic Events
//!
//! The closed set of observability events the engine emits. External tooling
//! keys on [`DiagnosticEvent::name`], so names must stay stable.

use shared_types::{BlockHeight, TxResponse};
use std::time::Duration;

use crate::domain::{
    ClassifiedEvent, ContractEventKind, ContractKey, OnboardingStatus, OutboundVerification,
    VerificationDecision,
};
use crate::stream::ExitReason;

/// An observability event. Delivered in emission order on the diagnostic
/// queue.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    // =========================================================================
    // STREAM
    // =========================================================================
    /// A block arrived from the stream.
    BlockReceived {
        height: BlockHeight,
        event_count: usize,
    },

    /// The tracked height moved forward.
    HeightAdvanced { height: BlockHeight },

    /// The stream ended and will be restarted after `delay`.
    StreamRestarting {
        height: Option<BlockHeight>,
        attempt: u32,
        delay: Duration,
        error: Option<String>,
    },

    /// The stream is being started again.
    StreamRestarted {
        height: Option<BlockHeight>,
        attempt: u32,
    },

    /// The stream ran out of blocks.
    StreamCompleted { height: Option<BlockHeight> },

    /// The stream driver has finished for good.
    StreamExited {
        height: Option<BlockHeight>,
        reason: ExitReason,
    },

    // =========================================================================
    // ROUTING
    // =========================================================================
    /// No recognised contract event kind.
    EventIgnoredUnknownEvent { event: ClassifiedEvent },

    /// Emitted by a different contract instance.
    EventIgnoredContractMismatch {
        event: ClassifiedEvent,
        expected: String,
    },

    /// No handler registered for the kind.
    EventIgnoredUnhandledType {
        event: ClassifiedEvent,
        kind: ContractEventKind,
    },

    /// Event names no verifier.
    EventIgnoredNoVerifierAddress {
        event: ClassifiedEvent,
        kind: ContractEventKind,
    },

    /// Event names another verifier.
    EventIgnoredDifferentVerifierAddress {
        event: ClassifiedEvent,
        kind: ContractEventKind,
        registered: String,
    },

    /// A required attribute is missing.
    EventIgnoredMissingAttribute {
        event: ClassifiedEvent,
        kind: ContractEventKind,
        key: ContractKey,
    },

    /// A handler returned an error or panicked.
    EventHandlerFailed {
        event: ClassifiedEvent,
        kind: ContractEventKind,
        error: String,
    },

    // =========================================================================
    // ONBOARD HANDLER
    // =========================================================================
    /// Scope attribute is no longer pending.
    OnboardEventIgnoredPreviouslyProcessed {
        event: ClassifiedEvent,
        status: OnboardingStatus,
    },

    OnboardEventFailedToFetchScopeAttribute {
        event: ClassifiedEvent,
        error: String,
    },

    OnboardEventFailedToRetrieveAsset {
        event: ClassifiedEvent,
        error: String,
    },

    OnboardEventFailedToVerifyAsset {
        event: ClassifiedEvent,
        error: String,
    },

    /// A verification was queued for submission.
    OnboardEventPreVerifySend {
        event: ClassifiedEvent,
        decision: VerificationDecision,
    },

    // =========================================================================
    // VERIFY HANDLER
    // =========================================================================
    /// The contract recorded this verifier's decision.
    VerifyEventSuccessful {
        event: ClassifiedEvent,
        status: OnboardingStatus,
    },

    /// A verify event arrived but the scope is still pending.
    VerifyEventStillPending { event: ClassifiedEvent },

    VerifyEventFailedToFetchScopeAttribute {
        event: ClassifiedEvent,
        error: String,
    },

    /// The status carried by the event disagrees with the scope attribute.
    VerifyEventUnexpectedStatus {
        event: ClassifiedEvent,
        reported: Option<OnboardingStatus>,
        actual: OnboardingStatus,
    },

    // =========================================================================
    // SUBMISSION
    // =========================================================================
    SubmissionSucceeded {
        verification: OutboundVerification,
        response: TxResponse,
    },

    /// The chain accepted the bytes but returned a non-zero code.
    SubmissionFailed {
        verification: OutboundVerification,
        response: TxResponse,
    },

    /// Signing or broadcasting raised an error.
    SubmissionThrew {
        verification: OutboundVerification,
        error: String,
    },

    /// Resynchronising the account sequence after a failure also failed.
    SubmissionResyncFailed {
        verification: OutboundVerification,
        error: String,
    },

    // =========================================================================
    // OTHER
    // =========================================================================
    TransactionReplayFailed { tx_hash: String, error: String },

    /// Integrator-defined event.
    Custom { name: String, detail: String },
}

impl DiagnosticEvent {
    /// Stable event name.
    pub fn name(&self) -> &str {
        match self {
            DiagnosticEvent::BlockReceived { .. } => "block_received",
            DiagnosticEvent::HeightAdvanced { .. } => "height_advanced",
            DiagnosticEvent::StreamRestarting { .. } => "stream_restarting",
            DiagnosticEvent::StreamRestarted { .. } => "stream_restarted",
            DiagnosticEvent::StreamCompleted { .. } => "stream_completed",
            DiagnosticEvent::StreamExited { .. } => "stream_exited",
            DiagnosticEvent::EventIgnoredUnknownEvent { .. } => "event_ignored_unknown_event",
            DiagnosticEvent::EventIgnoredContractMismatch { .. } => {
                "event_ignored_contract_mismatch"
            }
            DiagnosticEvent::EventIgnoredUnhandledType { .. } => "event_ignored_unhandled_type",
            DiagnosticEvent::EventIgnoredNoVerifierAddress { .. } => {
                "event_ignored_no_verifier_address"
            }
            DiagnosticEvent::EventIgnoredDifferentVerifierAddress { .. } => {
                "event_ignored_different_verifier_address"
            }
            DiagnosticEvent::EventIgnoredMissingAttribute { .. } => {
                "event_ignored_missing_attribute"
            }
            DiagnosticEvent::EventHandlerFailed { .. } => "event_handler_failed",
            DiagnosticEvent::OnboardEventIgnoredPreviouslyProcessed { .. } => {
                "onboard_event_ignored_previously_processed"
            }
            DiagnosticEvent::OnboardEventFailedToFetchScopeAttribute { .. } => {
                "onboard_event_failed_to_fetch_scope_attribute"
            }
            DiagnosticEvent::OnboardEventFailedToRetrieveAsset { .. } => {
                "onboard_event_failed_to_retrieve_asset"
            }
            DiagnosticEvent::OnboardEventFailedToVerifyAsset { .. } => {
                "onboard_event_failed_to_verify_asset"
            }
            DiagnosticEvent::OnboardEventPreVerifySend { .. } => "onboard_event_pre_verify_send",
            DiagnosticEvent::VerifyEventSuccessful { .. } => "verify_event_successful",
            DiagnosticEvent::VerifyEventStillPending { .. } => "verify_event_still_pending",
            DiagnosticEvent::VerifyEventFailedToFetchScopeAttribute { .. } => {
                "verify_event_failed_to_fetch_scope_attribute"
            }
            DiagnosticEvent::VerifyEventUnexpectedStatus { .. } => "verify_event_unexpected_status",
            DiagnosticEvent::SubmissionSucceeded { .. } => "submission_succeeded",
            DiagnosticEvent::SubmissionFailed { .. } => "submission_failed",
            DiagnosticEvent::SubmissionThrew { .. } => "submission_threw",
            DiagnosticEvent::SubmissionResyncFailed { .. } => "submission_resync_failed",
            DiagnosticEvent::TransactionReplayFailed { .. } => "transaction_replay_failed",
            DiagnosticEvent::Custom { name, .. } => name,
        }
    }

    /// The contract event this diagnostic is about, if any.
    pub fn event(&self) -> Option<&ClassifiedEvent> {
        match self {
            DiagnosticEvent::EventIgnoredUnknownEvent { event }
            | DiagnosticEvent::EventIgnoredContractMismatch { event, .. }
            | DiagnosticEvent::EventIgnoredUnhandledType { event, .. }
            | DiagnosticEvent::EventIgnoredNoVerifierAddress { event, .. }
            | DiagnosticEvent::EventIgnoredDifferentVerifierAddress { event, .. }
            | DiagnosticEvent::EventIgnoredMissingAttribute { event, .. }
            | DiagnosticEvent::EventHandlerFailed { event, .. }
            | DiagnosticEvent::OnboardEventIgnoredPreviouslyProcessed { event, .. }
            | DiagnosticEvent::OnboardEventFailedToFetchScopeAttribute { event, .. }
            | DiagnosticEvent::OnboardEventFailedToRetrieveAsset { event, .. }
            | DiagnosticEvent::OnboardEventFailedToVerifyAsset { event, .. }
            | DiagnosticEvent::OnboardEventPreVerifySend { event, .. }
            | DiagnosticEvent::VerifyEventSuccessful { event, .. }
            | DiagnosticEvent::VerifyEventStillPending { event }
            | DiagnosticEvent::VerifyEventFailedToFetchScopeAttribute { event, .. }
            | DiagnosticEvent::VerifyEventUnexpectedStatus { event, .. } => Some(event),
            DiagnosticEvent::SubmissionSucceeded { verification, .. }
            | DiagnosticEvent::SubmissionFailed { verification, .. }
            | DiagnosticEvent::SubmissionThrew { verification, .. }
            | DiagnosticEvent::SubmissionResyncFailed { verification, .. } => {
                Some(&verification.event)
            }
            _ => None,
        }
    }

    /// Whether this diagnostic reports an event dropped before business logic.
    pub fn is_ignored(&self) -> bool {
        matches!(
            self,
            DiagnosticEvent::EventIgnoredUnknownEvent { .. }
                | DiagnosticEvent::EventIgnoredContractMismatch { .. }
                | DiagnosticEvent::EventIgnoredUnhandledType { .. }
                | DiagnosticEvent::EventIgnoredNoVerifierAddress { .. }
                | DiagnosticEvent::EventIgnoredDifferentVerifierAddress { .. }
                | DiagnosticEvent::EventIgnoredMissingAttribute { .. }
        )
    }
}
