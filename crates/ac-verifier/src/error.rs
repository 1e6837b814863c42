//! Error types for the verifier engine.
//!
//! Only construction can fail with these. The running loops report every
//! problem as a diagnostic event instead.

use shared_types::ChainError;
use thiserror::Error;

use crate::ports::outbound::{SigningError, StreamError};

/// Invalid configuration detected at construction time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Restart base delay outside the permitted range.
    #[error("Restart delay {delay_ms}ms must be 0 or within [{min_ms}, {max_ms}]ms")]
    InvalidRestartDelay {
        delay_ms: i64,
        min_ms: i64,
        max_ms: i64,
    },

    /// The permitted range itself is malformed.
    #[error("Invalid restart delay bounds: min {min_ms}ms, max {max_ms}ms")]
    InvalidDelayBounds { min_ms: i64, max_ms: i64 },

    /// Exponential cap lower than the base delay.
    #[error("Maximum backoff {max_delay_ms}ms is below the base delay {delay_ms}ms")]
    InvalidBackoffCap { delay_ms: i64, max_delay_ms: i64 },

    /// Unrecognised restart mode string.
    #[error("Unknown restart mode: {0} (expected off, fixed or exponential)")]
    UnknownRestartMode(String),

    /// Neither a contract address nor an alias was supplied.
    #[error("Missing contract identifier: set AC_VERIFIER_CONTRACT_ADDRESS or AC_VERIFIER_CONTRACT_ALIAS")]
    MissingContract,

    /// A required field is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// An environment variable could not be parsed.
    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Errors surfaced by the verifier engine's public API.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A chain query or broadcast failed.
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Signing a transaction failed.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// The block stream reported a failure.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The configured contract alias did not resolve.
    #[error("Contract alias {alias} could not be resolved: {source}")]
    ContractResolution { alias: String, source: ChainError },

    /// The service builder was not given a required component.
    #[error("Missing component: {0}")]
    MissingComponent(&'static str),
}

/// Result type for verifier operations
pub type VerifierResult<T> = Result<T, VerifierError>;
