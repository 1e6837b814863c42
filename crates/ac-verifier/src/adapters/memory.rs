//! # In-Memory Adapters
//!
//! Scriptable implementations of the outbound ports, for tests and local
//! experiments without a chain.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use shared_types::{
    BaseAccount, BlockHeight, BroadcastMode, ChainError, SignedTx, StreamBlock, TxEvent,
    TxResponse,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{AssetScopeAttribute, VerificationDecision};
use crate::ports::{
    AssetRecord, AssetVerifier, BlockStream, BlockStreamSource, ChainClient, StreamError,
};

// =============================================================================
// BLOCK SOURCE
// =============================================================================

/// How a scripted stream run ends once its items are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTail {
    /// The stream completes.
    Complete,
    /// The stream stays open without yielding more blocks.
    Hang,
}

#[derive(Debug)]
enum ScriptedRun {
    Items(Vec<Result<StreamBlock, StreamError>>, RunTail),
    StartError(StreamError),
}

#[derive(Debug, Default)]
struct SourceState {
    runs: VecDeque<ScriptedRun>,
    starts: Vec<Option<BlockHeight>>,
    current_height: Option<BlockHeight>,
    current_height_error: Option<StreamError>,
}

/// Block source that replays scripted runs, one per `start_from` call.
///
/// When the script is exhausted, further runs stay open and idle.
#[derive(Debug, Default)]
pub struct InMemoryBlockSource {
    state: Mutex<SourceState>,
}

impl InMemoryBlockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Height reported by `current_height`.
    pub fn set_current_height(&self, height: Option<BlockHeight>) {
        self.state.lock().current_height = height;
    }

    /// Make `current_height` fail.
    pub fn fail_current_height(&self, error: StreamError) {
        self.state.lock().current_height_error = Some(error);
    }

    /// Script the next run: yield `items`, then end as `tail` says.
    pub fn push_run(&self, items: Vec<Result<StreamBlock, StreamError>>, tail: RunTail) {
        self.state
            .lock()
            .runs
            .push_back(ScriptedRun::Items(items, tail));
    }

    /// Script the next run to fail before yielding anything.
    pub fn push_start_error(&self, error: StreamError) {
        self.state
            .lock()
            .runs
            .push_back(ScriptedRun::StartError(error));
    }

    /// Heights every `start_from` call was made with, in order.
    pub fn starts(&self) -> Vec<Option<BlockHeight>> {
        self.state.lock().starts.clone()
    }
}

#[async_trait]
impl BlockStreamSource for InMemoryBlockSource {
    async fn current_height(&self) -> Result<Option<BlockHeight>, StreamError> {
        let state = self.state.lock();
        match &state.current_height_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.current_height),
        }
    }

    async fn start_from(&self, height: Option<BlockHeight>) -> Result<BlockStream, StreamError> {
        let mut state = self.state.lock();
        state.starts.push(height);
        match state.runs.pop_front() {
            Some(ScriptedRun::StartError(error)) => Err(error),
            Some(ScriptedRun::Items(items, RunTail::Complete)) => {
                Ok(tokio_stream::iter(items).boxed())
            }
            Some(ScriptedRun::Items(items, RunTail::Hang)) => Ok(tokio_stream::iter(items)
                .chain(futures::stream::pending())
                .boxed()),
            None => Ok(futures::stream::pending().boxed()),
        }
    }
}

// =============================================================================
// CHAIN CLIENT
// =============================================================================

/// Scripted result of one broadcast.
#[derive(Debug, Clone)]
pub enum BroadcastBehavior {
    /// Return a response with this code and log.
    Respond { code: u32, raw_log: String },
    /// Fail the call.
    Fail(ChainError),
}

#[derive(Debug, Default)]
struct ChainState {
    aliases: HashMap<String, String>,
    scope_attributes: HashMap<(String, String), AssetScopeAttribute>,
    accounts: HashMap<String, BaseAccount>,
    account_error: Option<ChainError>,
    tx_events: HashMap<String, Vec<TxEvent>>,
    behaviors: VecDeque<BroadcastBehavior>,
    broadcasts: Vec<SignedTx>,
}

/// Chain client backed by in-memory maps.
///
/// Accepted broadcasts advance the sender's account sequence, as a node would.
#[derive(Debug, Default)]
pub struct InMemoryChainClient {
    state: Mutex<ChainState>,
}

impl InMemoryChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_alias(&self, alias: impl Into<String>, address: impl Into<String>) {
        self.state.lock().aliases.insert(alias.into(), address.into());
    }

    pub fn set_account(&self, address: &str, account_number: u64, sequence: u64) {
        self.state.lock().accounts.insert(
            address.to_string(),
            BaseAccount {
                address: address.to_string(),
                account_number,
                sequence,
            },
        );
    }

    pub fn account(&self, address: &str) -> Option<BaseAccount> {
        self.state.lock().accounts.get(address).cloned()
    }

    /// Make account queries fail until cleared with `None`.
    pub fn fail_account_queries(&self, error: Option<ChainError>) {
        self.state.lock().account_error = error;
    }

    pub fn put_scope_attribute(&self, contract_address: &str, attribute: AssetScopeAttribute) {
        self.state.lock().scope_attributes.insert(
            (contract_address.to_string(), attribute.scope_address.clone()),
            attribute,
        );
    }

    pub fn put_tx_events(&self, tx_hash: impl Into<String>, events: Vec<TxEvent>) {
        self.state.lock().tx_events.insert(tx_hash.into(), events);
    }

    /// Script the outcome of the next broadcast. Unscripted broadcasts succeed.
    pub fn push_broadcast(&self, behavior: BroadcastBehavior) {
        self.state.lock().behaviors.push_back(behavior);
    }

    /// Every transaction handed to `broadcast_tx`, including failed ones.
    pub fn broadcasts(&self) -> Vec<SignedTx> {
        self.state.lock().broadcasts.clone()
    }
}

#[async_trait]
impl ChainClient for InMemoryChainClient {
    async fn resolve_contract_alias(&self, alias: &str) -> Result<String, ChainError> {
        self.state
            .lock()
            .aliases
            .get(alias)
            .cloned()
            .ok_or_else(|| ChainError::not_found(format!("alias {alias}")))
    }

    async fn query_scope_attribute(
        &self,
        contract_address: &str,
        scope_address: &str,
    ) -> Result<AssetScopeAttribute, ChainError> {
        self.state
            .lock()
            .scope_attributes
            .get(&(contract_address.to_string(), scope_address.to_string()))
            .cloned()
            .ok_or_else(|| ChainError::not_found(format!("scope attribute for {scope_address}")))
    }

    async fn query_account(&self, address: &str) -> Result<BaseAccount, ChainError> {
        let state = self.state.lock();
        if let Some(error) = &state.account_error {
            return Err(error.clone());
        }
        state
            .accounts
            .get(address)
            .cloned()
            .ok_or_else(|| ChainError::not_found(format!("account {address}")))
    }

    async fn broadcast_tx(
        &self,
        tx: SignedTx,
        _mode: BroadcastMode,
    ) -> Result<TxResponse, ChainError> {
        let tx_hash = tx.tx_hash()?;
        let mut state = self.state.lock();
        let sender = tx.body.sender.clone();
        state.broadcasts.push(tx);

        let behavior = state.behaviors.pop_front().unwrap_or(BroadcastBehavior::Respond {
            code: 0,
            raw_log: String::new(),
        });
        match behavior {
            BroadcastBehavior::Fail(error) => Err(error),
            BroadcastBehavior::Respond { code, raw_log } => {
                if code == 0 {
                    if let Some(account) = state.accounts.get_mut(&sender) {
                        account.sequence += 1;
                    }
                }
                Ok(TxResponse {
                    tx_hash,
                    code,
                    raw_log,
                    height: None,
                })
            }
        }
    }

    async fn query_tx_events(&self, tx_hash: &str) -> Result<Vec<TxEvent>, ChainError> {
        self.state
            .lock()
            .tx_events
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| ChainError::not_found(format!("tx {tx_hash}")))
    }
}

// =============================================================================
// ASSET VERIFIER
// =============================================================================

/// Asset verifier returning a fixed outcome.
#[derive(Debug)]
pub struct StaticAssetVerifier {
    retrieve_error: Option<String>,
    outcome: Result<VerificationDecision, String>,
    calls: AtomicUsize,
}

impl StaticAssetVerifier {
    pub fn with_decision(decision: VerificationDecision) -> Self {
        Self {
            retrieve_error: None,
            outcome: Ok(decision),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn approving() -> Self {
        Self::with_decision(VerificationDecision::approve("Asset verified"))
    }

    pub fn denying(message: impl Into<String>) -> Self {
        Self::with_decision(VerificationDecision::deny(message))
    }

    pub fn failing_retrieval(message: impl Into<String>) -> Self {
        Self {
            retrieve_error: Some(message.into()),
            ..Self::approving()
        }
    }

    pub fn failing_verification(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            ..Self::approving()
        }
    }

    /// Number of completed `verify_asset` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetVerifier for StaticAssetVerifier {
    async fn retrieve_asset(&self, attribute: &AssetScopeAttribute) -> anyhow::Result<AssetRecord> {
        if let Some(message) = &self.retrieve_error {
            anyhow::bail!("{message}");
        }
        Ok(AssetRecord {
            scope_address: attribute.scope_address.clone(),
            asset_type: attribute.asset_type.clone(),
            payload: serde_json::json!({ "asset_uuid": attribute.asset_uuid }),
        })
    }

    async fn verify_asset(
        &self,
        _attribute: &AssetScopeAttribute,
        _asset: AssetRecord,
    ) -> anyhow::Result<VerificationDecision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(|message| anyhow::anyhow!(message))
    }
}
