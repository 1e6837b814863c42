//! The verifier account this engine acts for.

use std::fmt;
use std::sync::Arc;

use crate::ports::TxSigner;

/// Registered verifier identity. Cheap to clone.
#[derive(Clone)]
pub struct VerifierIdentity {
    signer: Arc<dyn TxSigner>,
}

impl VerifierIdentity {
    pub fn new(signer: Arc<dyn TxSigner>) -> Self {
        Self { signer }
    }

    /// Address events must name for this verifier to act on them.
    pub fn address(&self) -> &str {
        self.signer.address()
    }

    pub fn signer(&self) -> &Arc<dyn TxSigner> {
        &self.signer
    }

    /// Whether `address` is this verifier's address.
    pub fn is_addressed_by(&self, address: &str) -> bool {
        self.address() == address
    }
}

impl fmt::Debug for VerifierIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierIdentity")
            .field("address", &self.address())
            .finish()
    }
}
