//! # Verification Submitter
//!
//! Drains the outbound queue one verification at a time, signs a
//! `verify_asset` execute message with the verifier key and broadcasts it.
//!
//! ## Sequence Handling
//!
//! ```text
//! current() ──→ build ──→ sign ──→ increment ──→ broadcast
//!                                                   │
//!                  ┌── code 0 ──────────────────────┤
//!                  │                                ├── code != 0 ──→ resync
//!            SubmissionSucceeded                    └── error ──────→ resync
//! ```
//!
//! Items are processed strictly in dequeue order; the next item is not
//! signed until the previous broadcast has returned.

use shared_types::{BroadcastMode, Fee, SignedTx, TxResponse, UnsignedTx};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::domain::{AccountSequenceTracker, ExecuteMsg, OutboundVerification, VerifierIdentity};
use crate::error::VerifierResult;
use crate::events::DiagnosticEvent;
use crate::queue::{DiagnosticSender, OutboundReceiver};

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded(TxResponse),
    /// The chain answered with a non-zero code.
    Failed(TxResponse),
    /// Building, signing or broadcasting raised an error.
    Threw(String),
}

/// Static transaction parameters.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    pub contract_address: String,
    pub chain_id: String,
    pub fee: Fee,
    pub broadcast_mode: BroadcastMode,
}

pub struct VerificationSubmitter {
    chain: Arc<dyn crate::ports::ChainClient>,
    identity: VerifierIdentity,
    tracker: Arc<AccountSequenceTracker>,
    config: SubmitterConfig,
    diagnostics: DiagnosticSender,
    running: AtomicBool,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl VerificationSubmitter {
    pub fn new(
        chain: Arc<dyn crate::ports::ChainClient>,
        identity: VerifierIdentity,
        tracker: Arc<AccountSequenceTracker>,
        config: SubmitterConfig,
        diagnostics: DiagnosticSender,
    ) -> Self {
        Self {
            chain,
            identity,
            tracker,
            config,
            diagnostics,
            running: AtomicBool::new(false),
        }
    }

    pub fn tracker(&self) -> &Arc<AccountSequenceTracker> {
        &self.tracker
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Consume the outbound queue until `cancel` fires.
    ///
    /// Only one consumer loop runs at a time; a second concurrent call
    /// returns immediately.
    pub async fn run(&self, outbound: OutboundReceiver, cancel: CancellationToken) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Verification submitter already running");
            return;
        }
        let _guard = RunningGuard(&self.running);

        let mut receiver = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            receiver = outbound.lease() => receiver,
        };
        tracing::debug!("Verification submitter started");

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = receiver.recv() => next,
            };
            match next {
                Some(verification) => {
                    self.submit(verification).await;
                }
                None => break,
            }
        }
        tracing::debug!("Verification submitter stopped");
    }

    /// Sign and broadcast one verification, emitting its terminal diagnostic.
    pub async fn submit(&self, verification: OutboundVerification) -> SubmitOutcome {
        let prefix = verification.message_prefix.clone();

        match self.sign_and_broadcast(&verification).await {
            Ok(response) if response.is_success() => {
                tracing::info!(id = %verification.id, tx_hash = %response.tx_hash, "{} Verification submitted", prefix);
                self.diagnostics.publish(DiagnosticEvent::SubmissionSucceeded {
                    verification,
                    response: response.clone(),
                });
                SubmitOutcome::Succeeded(response)
            }
            Ok(response) => {
                tracing::warn!(id = %verification.id, code = response.code, raw_log = %response.raw_log, "{} Verification rejected", prefix);
                self.diagnostics.publish(DiagnosticEvent::SubmissionFailed {
                    verification: verification.clone(),
                    response: response.clone(),
                });
                self.resync(&verification).await;
                SubmitOutcome::Failed(response)
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!(id = %verification.id, "{} Verification submission failed: {}", prefix, error);
                self.diagnostics.publish(DiagnosticEvent::SubmissionThrew {
                    verification: verification.clone(),
                    error: error.clone(),
                });
                self.resync(&verification).await;
                SubmitOutcome::Threw(error)
            }
        }
    }

    async fn sign_and_broadcast(&self, verification: &OutboundVerification) -> VerifierResult<TxResponse> {
        let snapshot = self.tracker.current().await?;
        let msg = serde_json::to_value(ExecuteMsg::verify_asset(verification))
            .map_err(shared_types::ChainError::from)?;
        let body = UnsignedTx {
            chain_id: self.config.chain_id.clone(),
            account_number: snapshot.account_number,
            sequence: snapshot.sequence,
            sender: self.identity.address().to_string(),
            contract: self.config.contract_address.clone(),
            msg,
            fee: self.config.fee.clone(),
            memo: String::new(),
        };
        let sign_bytes = body.sign_bytes().map_err(shared_types::ChainError::from)?;
        let signer = self.identity.signer();
        let tx = SignedTx {
            public_key: signer.public_key(),
            signature: signer.sign(&sign_bytes)?,
            body,
        };

        self.tracker.increment();
        let response = self
            .chain
            .broadcast_tx(tx, self.config.broadcast_mode)
            .await?;
        Ok(response)
    }

    async fn resync(&self, verification: &OutboundVerification) {
        if let Err(e) = self.tracker.resync().await {
            tracing::error!(id = %verification.id, "{} Account sequence resync failed: {}", verification.message_prefix, e);
            self.diagnostics.publish(DiagnosticEvent::SubmissionResyncFailed {
                verification: verification.clone(),
                error: e.to_string(),
            });
        }
    }
}
