//! # Adapters
//!
//! Port implementations shipped with the engine.

pub mod memory;
pub mod signer;

pub use memory::{
    BroadcastBehavior, InMemoryBlockSource, InMemoryChainClient, RunTail, StaticAssetVerifier,
};
pub use signer::Secp256k1Signer;
