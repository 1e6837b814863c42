//! # Shared Types Crate
//!
//! Chain-level entities exchanged between the verifier engine and the
//! outside world: raw transaction events as delivered by a block stream,
//! account snapshots, signed transactions and broadcast responses.
//!
//! ## Design Principles
//!
//! - **Transport agnostic**: nothing here knows how blocks or transactions
//!   travel over the wire.
//! - **Owned values**: every entity is `Clone` and owns its strings so it can
//!   move freely between tasks.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
