//! Ed25519 primitives for aggregate attestation
//!
//! Raw signing and verification with domain separation tags, so a
//! signature produced for one signing context can never be replayed in
//! another.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;

use crate::error::{SignerError, SignerResult};

/// Domain separation tags for tally signing contexts
pub mod domain {
    /// Tag for daily aggregate attestation
    pub const DAILY_AGGREGATE: &[u8] = b"TALLY:DailyAggregate:v1\0";
    /// Tag for chain snapshot attestation
    pub const CHAIN_SNAPSHOT: &[u8] = b"TALLY:ChainSnapshot:v1\0";
}

/// Ed25519 key pair for attestation signing.
///
/// Secret material comes from a secure, injected source (`from_bytes` /
/// `from_hex`) or fresh generation; the secret half is never exposed or
/// serialized by this type.
#[derive(Clone)]
pub struct AttestationKey {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    /// Key identifier (hex-encoded public key prefix)
    pub kid: String,
}

impl AttestationKey {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        let kid = hex::encode(&verifying_key.to_bytes()[..8]);
        Self {
            signing_key,
            verifying_key,
            kid,
        }
    }

    /// Create from existing secret key bytes (32 bytes)
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        let kid = hex::encode(&verifying_key.to_bytes()[..8]);
        Self {
            signing_key,
            verifying_key,
            kid,
        }
    }

    /// Create from a hex-encoded secret key
    pub fn from_hex(hex_str: &str) -> SignerResult<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| SignerError::InvalidKey(format!("Invalid hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(SignerError::InvalidKey(format!(
                "Invalid key length: expected 32, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_bytes(&arr))
    }

    /// Get the public key bytes (32 bytes)
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Get the public key as a hex string
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.to_bytes())
    }

    /// Get the verification handle for this key pair
    pub fn verifying_key(&self) -> VerifyingKeyHandle {
        VerifyingKeyHandle {
            verifying_key: self.verifying_key,
            pubkey_hex: self.public_key_hex(),
        }
    }

    /// Sign a message with domain separation.
    ///
    /// The actual signed message is `domain_tag || message`.
    pub fn sign(&self, domain_tag: &[u8], message: &[u8]) -> Signature {
        let mut signing_input = Vec::with_capacity(domain_tag.len() + message.len());
        signing_input.extend_from_slice(domain_tag);
        signing_input.extend_from_slice(message);
        self.signing_key.sign(&signing_input)
    }
}

impl std::fmt::Debug for AttestationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret material.
        f.debug_struct("AttestationKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// Ed25519 public key handle for verification
#[derive(Clone, Debug)]
pub struct VerifyingKeyHandle {
    verifying_key: VerifyingKey,
    pub pubkey_hex: String,
}

impl VerifyingKeyHandle {
    /// Create from public key bytes (32 bytes)
    pub fn from_bytes(bytes: &[u8; 32]) -> SignerResult<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| SignerError::InvalidKey(format!("Invalid public key: {}", e)))?;
        Ok(Self {
            verifying_key,
            pubkey_hex: hex::encode(bytes),
        })
    }

    /// Create from a hex-encoded public key
    pub fn from_hex(hex_str: &str) -> SignerResult<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| SignerError::InvalidKey(format!("Invalid hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(SignerError::InvalidKey(format!(
                "Invalid public key length: expected 32, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Self::from_bytes(&arr)
    }

    /// Verify a signature with domain separation
    pub fn verify(
        &self,
        domain_tag: &[u8],
        message: &[u8],
        signature: &Signature,
    ) -> SignerResult<()> {
        let mut signing_input = Vec::with_capacity(domain_tag.len() + message.len());
        signing_input.extend_from_slice(domain_tag);
        signing_input.extend_from_slice(message);

        self.verifying_key
            .verify(&signing_input, signature)
            .map_err(|e| SignerError::Crypto(format!("Verification failed: {}", e)))
    }
}
