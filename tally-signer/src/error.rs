//! Error types for the aggregate signer

use thiserror::Error;

/// Signer errors
///
/// Signing can fail (missing/malformed key material); verification never
/// errors; it returns `false` for any malformed or mismatched input,
/// since it routinely runs against attacker-supplied records.
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Canonicalization error: {0}")]
    Canon(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// Result type for signer operations
pub type SignerResult<T> = Result<T, SignerError>;
