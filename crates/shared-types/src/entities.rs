//! # Core Chain Entities
//!
//! ## Clusters
//!
//! - **Stream**: `StreamBlock`, `TxEvent`, `EventAttribute`
//! - **Accounts**: `BaseAccount`
//! - **Transactions**: `UnsignedTx`, `SignedTx`, `Fee`, `Coin`, `TxResponse`

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use sha2::{Digest, Sha256};

// =============================================================================
// CLUSTER A: THE STREAM
// =============================================================================

/// Height of a block in the chain.
pub type BlockHeight = u64;

/// A single key/value attribute attached to a transaction event.
///
/// Depending on the delivery path the key and value may still be base64
/// encoded. Consumers decide how to interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventAttribute {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: String,
}

impl EventAttribute {
    /// Create an attribute from anything string-like.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An event emitted by a transaction inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEvent {
    /// Height of the block containing the transaction.
    pub block_height: BlockHeight,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
    /// Event type string (e.g. `wasm`, `message`, `transfer`).
    pub event_type: String,
    /// Attributes in emission order. Keys may repeat.
    pub attributes: Vec<EventAttribute>,
}

impl TxEvent {
    /// Create a new event.
    pub fn new(
        block_height: BlockHeight,
        tx_hash: impl Into<String>,
        event_type: impl Into<String>,
        attributes: Vec<EventAttribute>,
    ) -> Self {
        Self {
            block_height,
            tx_hash: tx_hash.into(),
            event_type: event_type.into(),
            attributes,
        }
    }
}

/// One block as delivered by a block stream, together with the qualifying
/// events its transactions emitted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamBlock {
    /// Block height.
    pub height: BlockHeight,
    /// Events selected by the stream source for this block.
    pub events: Vec<TxEvent>,
}

impl StreamBlock {
    /// A block with no qualifying events.
    pub fn empty(height: BlockHeight) -> Self {
        Self {
            height,
            events: Vec::new(),
        }
    }

    /// A block carrying the given events.
    pub fn with_events(height: BlockHeight, events: Vec<TxEvent>) -> Self {
        Self { height, events }
    }
}

// =============================================================================
// CLUSTER B: ACCOUNTS
// =============================================================================

/// Authoritative on-chain account state used for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAccount {
    /// Bech32 account address.
    pub address: String,
    /// Account number assigned by the chain.
    pub account_number: u64,
    /// Next sequence number the chain expects.
    pub sequence: u64,
}

// =============================================================================
// CLUSTER C: TRANSACTIONS
// =============================================================================

/// How a signed transaction is handed to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastMode {
    /// Wait for `CheckTx` before returning.
    Sync,
    /// Return as soon as the node accepted the bytes.
    #[default]
    Async,
}

/// An amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination.
    pub denom: String,
    /// Amount as a decimal string.
    pub amount: String,
}

impl Coin {
    /// Create a coin.
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }
}

/// Fee attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Fee amount.
    pub amount: Vec<Coin>,
    /// Gas limit.
    pub gas_limit: u64,
}

/// A contract execution transaction that still needs a signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTx {
    /// Target chain id.
    pub chain_id: String,
    /// Signer account number.
    pub account_number: u64,
    /// Signer sequence number.
    pub sequence: u64,
    /// Signer address.
    pub sender: String,
    /// Contract being executed.
    pub contract: String,
    /// Execute message body.
    pub msg: serde_json::Value,
    /// Fee.
    pub fee: Fee,
    /// Free-form memo.
    pub memo: String,
}

impl UnsignedTx {
    /// Deterministic bytes covered by the signature.
    ///
    /// Struct fields serialize in declaration order and `serde_json::Value`
    /// objects are key-sorted, so equal transactions yield equal bytes.
    pub fn sign_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// A transaction ready for broadcast.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTx {
    /// Signed body.
    pub body: UnsignedTx,
    /// Compressed public key of the signer.
    #[serde_as(as = "Base64")]
    pub public_key: Vec<u8>,
    /// Signature over [`UnsignedTx::sign_bytes`].
    #[serde_as(as = "Base64")]
    pub signature: Vec<u8>,
}

impl SignedTx {
    /// Uppercase hex SHA-256 of the serialized transaction.
    pub fn tx_hash(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode_upper(Sha256::digest(&bytes)))
    }
}

/// Response returned by the chain for a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    /// Transaction hash.
    pub tx_hash: String,
    /// Result code. Zero means the transaction was accepted.
    pub code: u32,
    /// Raw log from the node.
    pub raw_log: String,
    /// Inclusion height, when known.
    pub height: Option<BlockHeight>,
}

impl TxResponse {
    /// Whether the chain accepted the transaction.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}
