//! Nightly job configuration
//!
//! Supports loading from environment variables with a `TALLY_` prefix.

use serde::{Deserialize, Serialize};
use std::env;

use tally_core::constants::DEFAULT_K;
use tally_core::stats::CompositeWeights;

/// Nightly signing job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Weights for the composite score
    #[serde(default)]
    pub weights: CompositeWeights,
    /// K-anonymity threshold applied on read paths
    #[serde(default = "default_threshold_k")]
    pub threshold_k: u32,
    /// Maximum store retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial retry delay in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Wall-clock budget for a whole run, in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

fn default_threshold_k() -> u32 {
    DEFAULT_K
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_deadline_secs() -> u64 {
    15 * 60
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            weights: CompositeWeights::default(),
            threshold_k: DEFAULT_K,
            max_retries: 3,
            retry_delay_ms: 500,
            deadline_secs: 15 * 60,
        }
    }
}

impl JobConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `TALLY_WEIGHT_POLICY` / `TALLY_WEIGHT_URGENCY`: composite weights
    /// - `TALLY_THRESHOLD_K`: k-anonymity threshold
    /// - `TALLY_MAX_RETRIES`: maximum store retry attempts
    /// - `TALLY_RETRY_DELAY_MS`: initial retry delay
    /// - `TALLY_DEADLINE_SECS`: wall-clock budget for a run
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let weights = CompositeWeights {
            policy: env_parse("TALLY_WEIGHT_POLICY").unwrap_or(defaults.weights.policy),
            urgency: env_parse("TALLY_WEIGHT_URGENCY").unwrap_or(defaults.weights.urgency),
        };

        Self {
            weights,
            threshold_k: env_parse("TALLY_THRESHOLD_K").unwrap_or(defaults.threshold_k),
            max_retries: env_parse("TALLY_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_delay_ms: env_parse("TALLY_RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
            deadline_secs: env_parse("TALLY_DEADLINE_SECS").unwrap_or(defaults.deadline_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JobConfig::default();
        assert_eq!(config.threshold_k, 20);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.weights.policy, 0.5);
        assert_eq!(config.weights.urgency, 0.5);
    }
}
