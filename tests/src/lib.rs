//! # Verifier Test Suite
//!
//! End-to-end tests that drive the whole engine through the in-memory
//! adapters: block source, chain client and asset verifier.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs   # Engine assembly, encoded events, diagnostic recorder
//!     ├── pipeline.rs   # Block → handler → submission flows
//!     └── lifecycle.rs  # Start/stop/restart and stream restart backoff
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ac-tests
//! cargo bench -p ac-tests
//! ```

pub mod integration;
