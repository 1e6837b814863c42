//! # Error Types
//!
//! Errors reported by chain-facing collaborators.

use thiserror::Error;

/// Errors returned by a chain client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The node could not be reached or the connection dropped.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The queried object does not exist on chain.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The query reached the node but failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// A response could not be decoded.
    #[error("Decoding failed: {0}")]
    Decode(String),

    /// The transaction could not be encoded for broadcast.
    #[error("Encoding failed: {0}")]
    Encode(String),
}

impl ChainError {
    /// Shorthand for [`ChainError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Whether the error means the object is absent rather than unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
