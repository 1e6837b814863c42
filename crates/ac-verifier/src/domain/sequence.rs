//! # Account Sequence Tracker
//!
//! Caches the verifier account's number and sequence so consecutive
//! transactions can be signed without a chain round trip each time.
//!
//! The sequence is incremented optimistically, right after a transaction is
//! signed and before the chain has confirmed it. Any submission failure
//! resynchronises from the chain's account state.

use parking_lot::RwLock;
use shared_types::{BaseAccount, ChainError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ports::ChainClient;

/// Values to sign the next transaction with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSnapshot {
    pub account_number: u64,
    pub sequence: u64,
}

#[derive(Debug)]
struct SequenceState {
    account: BaseAccount,
    sequence: AtomicU64,
}

impl SequenceState {
    fn new(account: BaseAccount) -> Self {
        let sequence = AtomicU64::new(account.sequence);
        Self { account, sequence }
    }

    fn snapshot(&self) -> SequenceSnapshot {
        SequenceSnapshot {
            account_number: self.account.account_number,
            sequence: self.sequence.load(Ordering::SeqCst),
        }
    }
}

/// Single-writer sequence cache for one signing account.
pub struct AccountSequenceTracker {
    address: String,
    chain: Arc<dyn ChainClient>,
    state: RwLock<Option<Arc<SequenceState>>>,
}

impl AccountSequenceTracker {
    pub fn new(address: impl Into<String>, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            address: address.into(),
            chain,
            state: RwLock::new(None),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Cached values, loading them from the chain on first use.
    pub async fn current(&self) -> Result<SequenceSnapshot, ChainError> {
        match self.snapshot() {
            Some(snapshot) => Ok(snapshot),
            None => self.resync().await,
        }
    }

    /// Cached values without touching the chain.
    pub fn snapshot(&self) -> Option<SequenceSnapshot> {
        self.state.read().as_ref().map(|state| state.snapshot())
    }

    /// Advance the cached sequence by one.
    ///
    /// Returns the new sequence, or `None` when nothing is cached.
    pub fn increment(&self) -> Option<u64> {
        self.state
            .read()
            .as_ref()
            .map(|state| state.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Replace the cache with the chain's authoritative account state.
    pub async fn resync(&self) -> Result<SequenceSnapshot, ChainError> {
        let account = self.chain.query_account(&self.address).await?;
        let state = Arc::new(SequenceState::new(account));
        let snapshot = state.snapshot();
        *self.state.write() = Some(state);
        tracing::debug!(
            address = %self.address,
            sequence = snapshot.sequence,
            "Account sequence synchronised"
        );
        Ok(snapshot)
    }

    /// Drop the cache. The next [`current`](Self::current) reloads it.
    pub fn reset(&self) {
        *self.state.write() = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryChainClient;

    fn tracker(sequence: u64) -> (AccountSequenceTracker, Arc<InMemoryChainClient>) {
        let chain = Arc::new(InMemoryChainClient::new());
        chain.set_account("tp1verifier", 7, sequence);
        (
            AccountSequenceTracker::new("tp1verifier", chain.clone()),
            chain,
        )
    }

    #[tokio::test]
    async fn test_current_loads_lazily() {
        let (tracker, _) = tracker(12);
        assert!(!tracker.is_loaded());

        let snapshot = tracker.current().await.unwrap();
        assert_eq!(
            snapshot,
            SequenceSnapshot {
                account_number: 7,
                sequence: 12
            }
        );
        assert!(tracker.is_loaded());
    }

    #[tokio::test]
    async fn test_increment_is_monotonic() {
        let (tracker, _) = tracker(0);
        tracker.current().await.unwrap();

        assert_eq!(tracker.increment(), Some(1));
        assert_eq!(tracker.increment(), Some(2));
        assert_eq!(tracker.current().await.unwrap().sequence, 2);
    }

    #[tokio::test]
    async fn test_increment_without_cache_is_noop() {
        let (tracker, _) = tracker(3);
        assert_eq!(tracker.increment(), None);
    }

    #[tokio::test]
    async fn test_resync_replaces_optimistic_value() {
        let (tracker, chain) = tracker(5);
        tracker.current().await.unwrap();
        tracker.increment();
        tracker.increment();

        chain.set_account("tp1verifier", 7, 6);
        assert_eq!(tracker.resync().await.unwrap().sequence, 6);
    }

    #[tokio::test]
    async fn test_reset_forgets_cache() {
        let (tracker, _) = tracker(5);
        tracker.current().await.unwrap();
        tracker.reset();
        assert!(tracker.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_unknown_account_fails() {
        let chain = Arc::new(InMemoryChainClient::new());
        let tracker = AccountSequenceTracker::new("tp1nobody", chain);
        assert!(tracker.current().await.unwrap_err().is_not_found());
    }
}
