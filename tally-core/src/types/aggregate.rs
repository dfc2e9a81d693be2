//! Aggregate records and their attestation signatures
//!
//! An `AggregateRecord` is one group's daily summary. It is computed by the
//! nightly job, signed exactly once, and never mutated afterwards: a
//! corrected aggregate must be a new record with a new date/version so the
//! append-only integrity property holds.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::SampleSummary;

/// One raw per-respondent row from the submission source.
///
/// The external store may carry more columns; only these four matter to
/// the attestation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRow {
    /// Group identifier (e.g. an electoral district)
    pub group: String,
    /// First sub-score (policy dimension)
    pub sub_score_policy: f64,
    /// Second sub-score (urgency dimension)
    pub sub_score_urgency: f64,
    /// Submission timestamp
    pub created_at: DateTime<Utc>,
}

impl SubmissionRow {
    pub fn new(
        group: impl Into<String>,
        sub_score_policy: f64,
        sub_score_urgency: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group: group.into(),
            sub_score_policy,
            sub_score_urgency,
            created_at,
        }
    }
}

/// One group's daily summary statistics.
///
/// Immutable once signed. Displayed values (`avg_value`, CI bounds) are
/// rounded to one decimal place at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// Group identifier
    pub group: String,
    /// Calendar day the aggregate covers
    pub date: NaiveDate,
    /// Sample size
    pub n: u64,
    /// Mean composite score, rounded to one decimal
    pub avg_value: f64,
    /// Lower bound of the 95% confidence interval
    pub ci_lower: f64,
    /// Upper bound of the 95% confidence interval
    pub ci_upper: f64,
}

impl AggregateRecord {
    /// Build a record from a computed sample summary, applying display
    /// rounding.
    pub fn from_summary(group: impl Into<String>, date: NaiveDate, summary: &SampleSummary) -> Self {
        Self {
            group: group.into(),
            date,
            n: summary.n as u64,
            avg_value: crate::stats::round1(summary.mean),
            ci_lower: crate::stats::round1(summary.ci_lower),
            ci_upper: crate::stats::round1(summary.ci_upper),
        }
    }

    /// Upsert key for signature storage: `{date}_{group}`.
    ///
    /// Re-running the nightly job for the same date overwrites the stored
    /// signature instead of creating a duplicate.
    pub fn signature_id(&self) -> String {
        format!("{}_{}", self.date, self.group)
    }
}

/// Attestation attached to exactly one `AggregateRecord`.
///
/// Invariant: `content_hash == sha256(canonical_json(record))` and
/// `signature` verifies against `public_key` over that hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSignature {
    /// Hex-encoded Ed25519 signature (64 bytes)
    pub signature: String,
    /// Hex-encoded Ed25519 public key (32 bytes)
    pub public_key: String,
    /// Signing timestamp
    pub timestamp: DateTime<Utc>,
    /// Hex-encoded SHA-256 of the canonicalized record
    pub content_hash: String,
    /// Algorithm tag, always `"ed25519"`
    pub algorithm: String,
}

/// A signed aggregate, the unit the nightly job persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedAggregate {
    pub record: AggregateRecord,
    pub signature: DataSignature,
}

impl SignedAggregate {
    pub fn signature_id(&self) -> String {
        self.record.signature_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_id_format() {
        let record = AggregateRecord {
            group: "Edmonton 1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            n: 25,
            avg_value: 7.2,
            ci_lower: 6.8,
            ci_upper: 7.6,
        };
        assert_eq!(record.signature_id(), "2025-01-10_Edmonton 1");
    }

    #[test]
    fn test_from_summary_rounds_to_one_decimal() {
        let summary = SampleSummary {
            n: 25,
            mean: 7.248,
            ci_lower: 6.8412,
            ci_upper: 7.6548,
        };
        let record = AggregateRecord::from_summary(
            "Edmonton 1",
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            &summary,
        );
        assert_eq!(record.avg_value, 7.2);
        assert_eq!(record.ci_lower, 6.8);
        assert_eq!(record.ci_upper, 7.7);
        assert_eq!(record.n, 25);
    }
}
