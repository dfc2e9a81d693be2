//! Aggregation statistics
//!
//! Composite scoring and the 95% confidence interval used by the nightly
//! signing job. The CI uses the normal approximation
//! `mean ± 1.96 * stddev / sqrt(n)` with the sample standard deviation;
//! this is the formula the signing path standardizes on.

use serde::{Deserialize, Serialize};

use crate::constants::CONFIDENCE_Z;
use crate::error::{CoreError, CoreResult};

/// Weights for combining the two sub-scores into one composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    /// Weight of the policy sub-score
    pub policy: f64,
    /// Weight of the urgency sub-score
    pub urgency: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            policy: 0.5,
            urgency: 0.5,
        }
    }
}

impl CompositeWeights {
    /// Weighted combination of the two sub-scores.
    pub fn composite(&self, policy_score: f64, urgency_score: f64) -> f64 {
        self.policy * policy_score + self.urgency * urgency_score
    }
}

/// Summary statistics for one group's composite scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    /// Sample size
    pub n: usize,
    /// Mean composite score (unrounded)
    pub mean: f64,
    /// Lower bound of the 95% CI (unrounded)
    pub ci_lower: f64,
    /// Upper bound of the 95% CI (unrounded)
    pub ci_upper: f64,
}

/// Compute mean and 95% confidence interval for a sample of scores.
///
/// A single observation gets a degenerate interval (margin 0). An empty
/// sample is malformed input; groups with zero rows are skipped upstream,
/// never summarized.
pub fn summarize(scores: &[f64]) -> CoreResult<SampleSummary> {
    if scores.is_empty() {
        return Err(CoreError::InvalidArgument(
            "cannot summarize an empty sample".to_string(),
        ));
    }

    let n = scores.len();
    let mean = scores.iter().sum::<f64>() / n as f64;

    let margin = if n > 1 {
        let variance = scores
            .iter()
            .map(|s| {
                let d = s - mean;
                d * d
            })
            .sum::<f64>()
            / (n as f64 - 1.0);
        CONFIDENCE_Z * variance.sqrt() / (n as f64).sqrt()
    } else {
        0.0
    };

    Ok(SampleSummary {
        n,
        mean,
        ci_lower: mean - margin,
        ci_upper: mean + margin,
    })
}

/// Round to one decimal place for display/persistence.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_default_weights() {
        let weights = CompositeWeights::default();
        assert!((weights.composite(8.0, 6.0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_composite_custom_weights() {
        let weights = CompositeWeights {
            policy: 0.7,
            urgency: 0.3,
        };
        assert!((weights.composite(10.0, 0.0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_empty_rejected() {
        let err = summarize(&[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[test]
    fn test_summarize_single_observation() {
        let summary = summarize(&[7.5]).unwrap();
        assert_eq!(summary.n, 1);
        assert_eq!(summary.mean, 7.5);
        assert_eq!(summary.ci_lower, 7.5);
        assert_eq!(summary.ci_upper, 7.5);
    }

    #[test]
    fn test_summarize_normal_approximation() {
        // Sample: [4, 6], mean 5, sample stddev sqrt(2),
        // margin = 1.96 * sqrt(2) / sqrt(2) = 1.96.
        let summary = summarize(&[4.0, 6.0]).unwrap();
        assert_eq!(summary.n, 2);
        assert!((summary.mean - 5.0).abs() < 1e-12);
        assert!((summary.ci_lower - 3.04).abs() < 1e-10);
        assert!((summary.ci_upper - 6.96).abs() < 1e-10);
    }

    #[test]
    fn test_summarize_constant_sample_has_zero_margin() {
        let summary = summarize(&[5.0; 30]).unwrap();
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.ci_lower, 5.0);
        assert_eq!(summary.ci_upper, 5.0);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(7.25), 7.3);
        assert_eq!(round1(7.24), 7.2);
        assert_eq!(round1(-1.15), -1.2);
        assert_eq!(round1(3.0), 3.0);
    }
}
