//! # Domain Module
//!
//! Core domain types for the verifier engine.

pub mod classifier;
pub mod contract;
pub mod decision;
pub mod identity;
pub mod restart;
pub mod sequence;

pub use classifier::*;
pub use contract::*;
pub use decision::*;
pub use identity::VerifierIdentity;
pub use restart::*;
pub use sequence::{AccountSequenceTracker, SequenceSnapshot};
