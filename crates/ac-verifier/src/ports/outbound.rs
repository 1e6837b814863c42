//! # Outbound Ports
//!
//! Traits for the engine's external collaborators: the block stream, the
//! chain client, the transaction signer, the business verifier and the
//! diagnostic consumer.

use async_trait::async_trait;
use futures::stream::BoxStream;
use shared_types::{
    BaseAccount, BlockHeight, BroadcastMode, ChainError, SignedTx, StreamBlock, TxEvent,
    TxResponse,
};
use thiserror::Error;

use crate::domain::{AssetScopeAttribute, VerificationDecision};
use crate::events::DiagnosticEvent;

/// Failure reported by a block stream source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Block stream error: {message}")]
pub struct StreamError {
    /// Human-readable cause.
    pub message: String,
    /// Whether the source considers restarting worthwhile.
    pub recoverable: bool,
}

impl StreamError {
    /// A failure worth restarting after (dropped connection, timeout).
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            recoverable: true,
        }
    }

    /// A failure restarting cannot fix.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            recoverable: false,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

/// Blocks in height order. An `Err` item ends the stream.
pub type BlockStream = BoxStream<'static, Result<StreamBlock, StreamError>>;

/// Historical plus live block source - outbound port.
///
/// The source owns any retrying of its own transport. The engine only
/// restarts the whole stream, based on [`StreamError::is_recoverable`].
#[async_trait]
pub trait BlockStreamSource: Send + Sync {
    /// Latest height known to the source, if it can tell.
    async fn current_height(&self) -> Result<Option<BlockHeight>, StreamError>;

    /// Stream blocks starting at `height`, or wherever the source chooses
    /// when `None`.
    async fn start_from(&self, height: Option<BlockHeight>) -> Result<BlockStream, StreamError>;
}

/// Chain query and broadcast client - outbound port.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Resolve a contract alias (name service) to a contract address.
    async fn resolve_contract_alias(&self, alias: &str) -> Result<String, ChainError>;

    /// Fetch the contract's scope attribute for a scope address.
    async fn query_scope_attribute(
        &self,
        contract_address: &str,
        scope_address: &str,
    ) -> Result<AssetScopeAttribute, ChainError>;

    /// Fetch account number and sequence for signing.
    async fn query_account(&self, address: &str) -> Result<BaseAccount, ChainError>;

    /// Broadcast a signed transaction.
    async fn broadcast_tx(
        &self,
        tx: SignedTx,
        mode: BroadcastMode,
    ) -> Result<TxResponse, ChainError>;

    /// Fetch the decoded events of a past transaction.
    async fn query_tx_events(&self, tx_hash: &str) -> Result<Vec<TxEvent>, ChainError>;
}

/// Signing failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    /// The key material is unusable.
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// Producing the signature failed.
    #[error("Signing failed: {0}")]
    Failed(String),
}

/// Transaction signer for the verifier account - outbound port.
pub trait TxSigner: Send + Sync {
    /// Account address transactions are signed for.
    fn address(&self) -> &str;

    /// Compressed public key bytes.
    fn public_key(&self) -> Vec<u8>;

    /// Sign the canonical sign bytes of a transaction.
    fn sign(&self, sign_bytes: &[u8]) -> Result<Vec<u8>, SigningError>;
}

/// Asset contents fetched for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub scope_address: String,
    pub asset_type: String,
    /// Opaque asset payload.
    pub payload: serde_json::Value,
}

/// Business verification logic supplied by the integrator - outbound port.
#[async_trait]
pub trait AssetVerifier: Send + Sync {
    /// Load the asset behind a scope attribute.
    async fn retrieve_asset(&self, attribute: &AssetScopeAttribute) -> anyhow::Result<AssetRecord>;

    /// Decide whether the asset passes verification.
    async fn verify_asset(
        &self,
        attribute: &AssetScopeAttribute,
        asset: AssetRecord,
    ) -> anyhow::Result<VerificationDecision>;
}

/// Consumer of diagnostic events - outbound port.
///
/// Errors are logged by the engine and otherwise ignored.
#[async_trait]
pub trait DiagnosticHandler: Send + Sync {
    async fn handle(&self, event: &DiagnosticEvent) -> anyhow::Result<()>;
}
