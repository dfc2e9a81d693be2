//! Protocol constants for the tally attestation layer

/// K-anonymity disclosure threshold.
///
/// An aggregate is only publishable when its sample size reaches this
/// count. The gate must be re-applied on every read path; a group that
/// drops below the threshold after retraction re-locks.
pub const DEFAULT_K: u32 = 20;

/// Z-score for the 95% confidence interval (normal approximation).
pub const CONFIDENCE_Z: f64 = 1.96;

/// Version tag carried by chain exports.
pub const CHAIN_EXPORT_VERSION: u32 = 1;

/// Signature algorithm tag attached to every `DataSignature`.
pub const SIGNATURE_ALGORITHM: &str = "ed25519";
