//! # Verifier Service
//!
//! Supervises the three loops of one engine run:
//!
//! | Task | Consumes | Produces |
//! |------|----------|----------|
//! | stream | block source | diagnostics, outbound verifications |
//! | diagnostics | diagnostic queue | calls to the diagnostic handler |
//! | submitter | outbound queue | signed transactions, diagnostics |
//!
//! Lifecycle is an explicit state machine behind one async mutex:
//!
//! ```text
//! Idle ──start──→ Running ──stop──→ Stopped ──start──→ Running
//!                   │  ↑
//!                   └──┘ restart
//! ```

use futures::FutureExt;
use shared_types::BlockHeight;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::{ContractIdentifier, VerifierConfig};
use crate::domain::{AccountSequenceTracker, ClassifiedEvent, RestartMode, VerifierIdentity};
use crate::error::{VerifierError, VerifierResult};
use crate::events::{DiagnosticEvent, LoggingDiagnosticHandler};
use crate::handlers::HandlerRegistry;
use crate::ports::{
    AssetVerifier, BlockStreamSource, ChainClient, DiagnosticHandler, TxSigner, VerifierApi,
};
use crate::queue::{queue, DiagnosticReceiver, DiagnosticSender, OutboundReceiver};
use crate::router::{EventRouter, RouterContext};
use crate::stream::{StreamDriver, StreamHandle};
use crate::submitter::{SubmitterConfig, VerificationSubmitter};

enum EngineState {
    Idle,
    Running(ActiveRun),
    Stopped,
}

struct ActiveRun {
    handle: StreamHandle,
    cancel: CancellationToken,
    /// Cancelled after the other tasks have joined, so their last
    /// diagnostics still reach the handler.
    diagnostics_cancel: CancellationToken,
    stream_task: JoinHandle<()>,
    submitter_task: JoinHandle<()>,
    diagnostics_task: JoinHandle<()>,
}

/// The verifier engine.
pub struct VerifierService {
    contract_address: String,
    driver: Arc<StreamDriver>,
    router: Arc<EventRouter>,
    submitter: Arc<VerificationSubmitter>,
    tracker: Arc<AccountSequenceTracker>,
    chain: Arc<dyn ChainClient>,
    handler: Arc<dyn DiagnosticHandler>,
    outbound_rx: OutboundReceiver,
    diagnostics: DiagnosticSender,
    diagnostics_rx: DiagnosticReceiver,
    shutdown_timeout: Duration,
    state: Mutex<EngineState>,
    next_run_id: AtomicU64,
}

impl VerifierService {
    pub fn builder(config: VerifierConfig) -> VerifierServiceBuilder {
        VerifierServiceBuilder::new(config)
    }

    /// Resolved address of the watched contract.
    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    /// Sender for integrator diagnostics, such as `DiagnosticEvent::Custom`.
    pub fn diagnostics(&self) -> DiagnosticSender {
        self.diagnostics.clone()
    }

    pub fn sequence_tracker(&self) -> &Arc<AccountSequenceTracker> {
        &self.tracker
    }

    fn spawn_run(&self, from_height: Option<BlockHeight>) -> ActiveRun {
        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let diagnostics_cancel = CancellationToken::new();
        let (exit_tx, exit_rx) = watch::channel(None);

        let stream_task = {
            let driver = self.driver.clone();
            let cancel = cancel.clone();
            tokio::spawn(
                async move {
                    let exit = driver.run(from_height, cancel).await;
                    tracing::info!(last_height = ?exit.last_height, reason = exit.reason.label(), "Block stream exited");
                    exit_tx.send_replace(Some(exit));
                }
                .instrument(tracing::info_span!("stream", run_id)),
            )
        };

        let submitter_task = {
            let submitter = self.submitter.clone();
            let outbound = self.outbound_rx.clone();
            let cancel = cancel.clone();
            tokio::spawn(
                async move { submitter.run(outbound, cancel).await }
                    .instrument(tracing::info_span!("submitter", run_id)),
            )
        };

        let diagnostics_task = tokio::spawn(
            consume_diagnostics(
                self.diagnostics_rx.clone(),
                self.handler.clone(),
                diagnostics_cancel.clone(),
            )
            .instrument(tracing::info_span!("diagnostics", run_id)),
        );

        tracing::info!(run_id, from = ?from_height, contract = %self.contract_address, "Verifier started");
        ActiveRun {
            handle: StreamHandle::new(run_id, exit_rx),
            cancel,
            diagnostics_cancel,
            stream_task,
            submitter_task,
            diagnostics_task,
        }
    }

    async fn shutdown(&self, mut run: ActiveRun) {
        run.cancel.cancel();
        wait_for_task("stream", self.shutdown_timeout, &mut run.stream_task).await;
        wait_for_task("submitter", self.shutdown_timeout, &mut run.submitter_task).await;
        run.diagnostics_cancel.cancel();
        wait_for_task("diagnostics", self.shutdown_timeout, &mut run.diagnostics_task).await;
        // The cached sequence belongs to the run that loaded it.
        self.tracker.reset();
        tracing::info!(run_id = run.handle.run_id(), "Verifier stopped");
    }

    async fn start_locked(&self, state: &mut EngineState, from_height: Option<BlockHeight>) -> StreamHandle {
        match std::mem::replace(state, EngineState::Idle) {
            EngineState::Running(run) if !run.handle.is_finished() => {
                let handle = run.handle.clone();
                *state = EngineState::Running(run);
                return handle;
            }
            EngineState::Running(run) => self.shutdown(run).await,
            EngineState::Idle | EngineState::Stopped => {}
        }
        let run = self.spawn_run(from_height);
        let handle = run.handle.clone();
        *state = EngineState::Running(run);
        handle
    }

    async fn stop_locked(&self, state: &mut EngineState) {
        match std::mem::replace(state, EngineState::Stopped) {
            EngineState::Running(run) => self.shutdown(run).await,
            previous => *state = previous,
        }
    }
}

#[async_trait::async_trait]
impl VerifierApi for VerifierService {
    async fn start(&self, from_height: Option<BlockHeight>) -> StreamHandle {
        let mut state = self.state.lock().await;
        self.start_locked(&mut state, from_height).await
    }

    async fn stop(&self) {
        let mut state = self.state.lock().await;
        self.stop_locked(&mut state).await;
    }

    async fn restart(&self, from_height: Option<BlockHeight>) -> StreamHandle {
        let mut state = self.state.lock().await;
        self.stop_locked(&mut state).await;
        self.start_locked(&mut state, from_height).await
    }

    async fn replay_transaction(&self, tx_hash: &str) -> VerifierResult<usize> {
        let events = match self.chain.query_tx_events(tx_hash).await {
            Ok(events) => events,
            Err(e) => {
                self.diagnostics.publish(DiagnosticEvent::TransactionReplayFailed {
                    tx_hash: tx_hash.to_string(),
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let mut routed = 0;
        for event in events.iter().filter_map(ClassifiedEvent::classify) {
            self.router.route(event).await;
            routed += 1;
        }
        tracing::info!(tx_hash, routed, "Transaction replayed");
        Ok(routed)
    }

    async fn is_running(&self) -> bool {
        matches!(&*self.state.lock().await, EngineState::Running(run) if !run.handle.is_finished())
    }
}

async fn consume_diagnostics(
    diagnostics: DiagnosticReceiver,
    handler: Arc<dyn DiagnosticHandler>,
    cancel: CancellationToken,
) {
    let mut receiver = diagnostics.lease().await;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = receiver.recv() => next,
        };
        match next {
            Some(event) => dispatch_diagnostic(handler.as_ref(), &event).await,
            None => return,
        }
    }

    while let Ok(event) = receiver.try_recv() {
        dispatch_diagnostic(handler.as_ref(), &event).await;
    }
}

async fn dispatch_diagnostic(handler: &dyn DiagnosticHandler, event: &DiagnosticEvent) {
    match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(event = event.name(), "Diagnostic handler failed: {e:#}"),
        Err(_) => tracing::error!(event = event.name(), "Diagnostic handler panicked"),
    }
}

async fn wait_for_task(task: &str, timeout: Duration, handle: &mut JoinHandle<()>) {
    match tokio::time::timeout(timeout, &mut *handle).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) if error.is_cancelled() => {}
        Ok(Err(error)) => tracing::error!(task, error = ?error, "Task panicked"),
        Err(_) => {
            tracing::warn!(
                task,
                timeout_ms = timeout.as_millis() as u64,
                "Shutdown timeout reached, aborting task"
            );
            handle.abort();
            let _ = handle.await;
        }
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Assembles a [`VerifierService`] from configuration and adapters.
pub struct VerifierServiceBuilder {
    config: VerifierConfig,
    source: Option<Arc<dyn BlockStreamSource>>,
    chain: Option<Arc<dyn ChainClient>>,
    signer: Option<Arc<dyn TxSigner>>,
    processor: Option<Arc<dyn AssetVerifier>>,
    handler: Option<Arc<dyn DiagnosticHandler>>,
    handlers: HandlerRegistry,
}

impl VerifierServiceBuilder {
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            source: None,
            chain: None,
            signer: None,
            processor: None,
            handler: None,
            handlers: HandlerRegistry::with_defaults(),
        }
    }

    pub fn block_source(mut self, source: Arc<dyn BlockStreamSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn chain_client(mut self, chain: Arc<dyn ChainClient>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn signer(mut self, signer: Arc<dyn TxSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Business logic that retrieves and verifies assets.
    pub fn asset_verifier(mut self, processor: Arc<dyn AssetVerifier>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Replaces the default [`LoggingDiagnosticHandler`].
    pub fn diagnostic_handler(mut self, handler: Arc<dyn DiagnosticHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Replaces the default onboard and verify handlers.
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Validate configuration, resolve the contract address and wire the
    /// engine together.
    pub async fn build(self) -> VerifierResult<VerifierService> {
        let restart: RestartMode = self.config.validate()?;
        let source = self.source.ok_or(VerifierError::MissingComponent("block source"))?;
        let chain = self.chain.ok_or(VerifierError::MissingComponent("chain client"))?;
        let signer = self.signer.ok_or(VerifierError::MissingComponent("signer"))?;
        let processor = self
            .processor
            .ok_or(VerifierError::MissingComponent("asset verifier"))?;
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(LoggingDiagnosticHandler::new()));

        let contract_address = match &self.config.contract {
            ContractIdentifier::Address(address) => address.clone(),
            ContractIdentifier::Alias(alias) => chain
                .resolve_contract_alias(alias)
                .await
                .map_err(|source| VerifierError::ContractResolution {
                    alias: alias.clone(),
                    source,
                })?,
        };
        tracing::info!(
            contract = %contract_address,
            restart = %self.config.restart_summary(),
            "Verifier configured"
        );

        let identity = VerifierIdentity::new(signer);
        let (outbound, outbound_rx) = queue();
        let (diagnostics, diagnostics_rx) = queue();

        let router = Arc::new(EventRouter::new(
            RouterContext {
                contract_address: contract_address.clone(),
                chain: chain.clone(),
                identity: identity.clone(),
                processor,
                outbound,
                diagnostics: diagnostics.clone(),
            },
            self.handlers,
        ));
        let driver = Arc::new(StreamDriver::new(
            source,
            router.clone(),
            restart,
            diagnostics.clone(),
        ));
        let tracker = Arc::new(AccountSequenceTracker::new(identity.address(), chain.clone()));
        let submitter = Arc::new(VerificationSubmitter::new(
            chain.clone(),
            identity,
            tracker.clone(),
            SubmitterConfig {
                contract_address: contract_address.clone(),
                chain_id: self.config.chain_id.clone(),
                fee: self.config.fee.to_fee(),
                broadcast_mode: self.config.broadcast_mode,
            },
            diagnostics.clone(),
        ));

        Ok(VerifierService {
            contract_address,
            driver,
            router,
            submitter,
            tracker,
            chain,
            handler,
            outbound_rx,
            diagnostics,
            diagnostics_rx,
            shutdown_timeout: self.config.shutdown_timeout,
            state: Mutex::new(EngineState::Idle),
            next_run_id: AtomicU64::new(1),
        })
    }
}
