//! K-anonymity threshold gate
//!
//! A single policy decision: is an aggregate count large enough to publish
//! without risking re-identification. A hard cutoff with no
//! differential-privacy noise and no L-diversity, so it stays auditable
//! and explainable to non-technical reviewers.
//!
//! Callers must re-apply the gate on every read path. If a group's count
//! later drops below the threshold due to retraction, it re-locks; a
//! "was once unlocked" flag must never be cached.

use crate::constants::DEFAULT_K;
use crate::error::{CoreError, CoreResult};

/// Decide whether a count of `n` observations may be disclosed under
/// threshold `k`.
///
/// Negative counts are malformed input, not a "locked" state.
pub fn meets_threshold(n: i64, k: u32) -> CoreResult<bool> {
    if n < 0 {
        return Err(CoreError::InvalidArgument(format!(
            "count must be non-negative, got {}",
            n
        )));
    }
    Ok(n as u64 >= u64::from(k))
}

/// `meets_threshold` with the configured default `k`.
pub fn meets_default_threshold(n: i64) -> CoreResult<bool> {
    meets_threshold(n, DEFAULT_K)
}

/// Human-readable gating status. Purely presentational, but deterministic
/// for a given `(n, k)`.
pub fn gating_message(n: i64, k: u32) -> CoreResult<String> {
    if meets_threshold(n, k)? {
        Ok(format!("Aggregate unlocked with {} signals", n))
    } else {
        let remaining = i64::from(k) - n;
        Ok(format!(
            "Locked: {} more signals needed ({}/{})",
            remaining, n, k
        ))
    }
}
