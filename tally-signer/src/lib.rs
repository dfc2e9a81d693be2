//! Tally Signer - Aggregate Attestation
//!
//! Produces verifiable, tamper-evident attestations for daily aggregate
//! statistics, and verifies attestations supplied by untrusted parties.
//!
//! The scheme is genuinely asymmetric: anyone holding only the published
//! public key can verify a signature, and forging one without the secret
//! key is computationally infeasible. Secret material is always injected
//! or freshly generated; it is never derived from a constant seed and
//! never serialized.

pub mod crypto;
pub mod error;
pub mod signer;

pub use crypto::{domain, AttestationKey, VerifyingKeyHandle};
pub use error::{SignerError, SignerResult};
pub use signer::{verify, AggregateSigner};
