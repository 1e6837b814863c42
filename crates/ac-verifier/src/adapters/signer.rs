//! secp256k1 transaction signer.

use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use std::fmt;

use crate::ports::{SigningError, TxSigner};

/// Signs transaction bytes with a secp256k1 key (ECDSA over SHA-256).
pub struct Secp256k1Signer {
    key: SigningKey,
    address: String,
}

impl Secp256k1Signer {
    pub fn new(key: SigningKey, address: impl Into<String>) -> Self {
        Self {
            key,
            address: address.into(),
        }
    }

    /// Build from a hex-encoded 32-byte private key.
    pub fn from_hex(private_key: &str, address: impl Into<String>) -> Result<Self, SigningError> {
        let bytes = hex::decode(private_key.trim().trim_start_matches("0x"))
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        let key =
            SigningKey::from_slice(&bytes).map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Ok(Self::new(key, address))
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.key.verifying_key()
    }
}

impl TxSigner for Secp256k1Signer {
    fn address(&self) -> &str {
        &self.address
    }

    fn public_key(&self) -> Vec<u8> {
        self.verifying_key().to_encoded_point(true).as_bytes().to_vec()
    }

    fn sign(&self, sign_bytes: &[u8]) -> Result<Vec<u8>, SigningError> {
        let signature: Signature = self
            .key
            .try_sign(sign_bytes)
            .map_err(|e| SigningError::Failed(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }
}

impl fmt::Debug for Secp256k1Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
