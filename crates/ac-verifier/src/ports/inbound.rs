//! # Inbound Ports
//!
//! API trait defining what the verifier engine can do.

use async_trait::async_trait;
use shared_types::BlockHeight;

use crate::error::VerifierResult;
use crate::stream::StreamHandle;

/// Verifier engine API - inbound port.
#[async_trait]
pub trait VerifierApi: Send + Sync {
    /// Start the stream, dispatch and submission tasks.
    ///
    /// Starting while already running returns the existing handle.
    async fn start(&self, from_height: Option<BlockHeight>) -> StreamHandle;

    /// Cancel all tasks and forget the cached account sequence.
    ///
    /// Stopping an engine that is not running does nothing.
    async fn stop(&self);

    /// Stop, then start again from `from_height`.
    async fn restart(&self, from_height: Option<BlockHeight>) -> StreamHandle;

    /// Classify and route the events of a past transaction.
    ///
    /// Returns how many contract events were routed.
    async fn replay_transaction(&self, tx_hash: &str) -> VerifierResult<usize>;

    /// Whether a run is currently active.
    async fn is_running(&self) -> bool;
}
