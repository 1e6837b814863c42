//! # Asset Classification Verifier
//!
//! Event-processing engine for a verifier of the asset classification smart
//! contract. Watches the chain's block stream, picks out the contract's
//! events, runs business verification for onboarding requests addressed to
//! this verifier and submits signed `verify_asset` transactions.
//!
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Pipeline
//!
//! ```text
//! BlockStreamSource ──→ StreamDriver ──→ classify ──→ EventRouter ──→ handler
//!                                                          │             │
//!                                                    diagnostics    outbound queue
//!                                                          │             │
//!                                              DiagnosticHandler   VerificationSubmitter
//!                                                                        │
//!                                                                   ChainClient
//! ```
//!
//! ## Guarantees
//!
//! | Concern | Behaviour |
//! |---------|-----------|
//! | Restart | Resumes from the last tracked height; boundary blocks may repeat |
//! | Backoff | Escalates while stuck at one height, resets when it moves |
//! | Handlers | Errors and panics become `EventHandlerFailed` diagnostics |
//! | Submission | Strict dequeue order; sequence resynced after any failure |
//! | Lifecycle | `start` is idempotent; `stop` joins every task and resets the sequence |
//!
//! ## Module Structure
//!
//! ```text
//! ac-verifier/
//! ├── domain/      # Contract vocabulary, classifier, restart policy, sequence tracker
//! ├── ports/       # VerifierApi, BlockStreamSource, ChainClient, TxSigner, ...
//! ├── adapters/    # secp256k1 signer, in-memory chain and block source
//! ├── events/      # DiagnosticEvent and the logging handler
//! ├── handlers/    # onboard_asset and verify_asset handlers
//! ├── router.rs    # EventRouter
//! ├── stream.rs    # StreamDriver
//! ├── submitter.rs # VerificationSubmitter
//! └── service.rs   # VerifierService (supervisor)
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod handlers;
pub mod ports;
pub mod queue;
pub mod router;
pub mod service;
pub mod stream;
pub mod submitter;

// Re-exports
pub use config::{ContractIdentifier, FeeConfig, VerifierConfig};
pub use domain::{
    AccessRoute, AccountSequenceTracker, AssetScopeAttribute, Backoff, ClassifiedEvent,
    ContractEventKind, ContractKey, OnboardingStatus, OutboundVerification, RestartConfig,
    RestartMode, RestartPolicy, VerificationDecision, VerifierIdentity,
};
pub use error::{ConfigError, VerifierError, VerifierResult};
pub use events::{DiagnosticEvent, LoggingDiagnosticHandler};
pub use handlers::{handler_fn, EventHandlerFn, HandlerParams, HandlerRegistry};
pub use ports::{
    AssetRecord, AssetVerifier, BlockStream, BlockStreamSource, ChainClient, DiagnosticHandler,
    SigningError, StreamError, TxSigner, VerifierApi,
};
pub use router::{EventRouter, RouteOutcome};
pub use service::{VerifierService, VerifierServiceBuilder};
pub use stream::{ExitReason, StreamExit, StreamHandle};
pub use submitter::{SubmitOutcome, VerificationSubmitter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
