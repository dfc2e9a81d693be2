//! Aggregate attestation signer
//!
//! Binds a `DataSignature` to an `AggregateRecord`: the record is
//! canonicalized, hashed, and the hash signed under the daily-aggregate
//! domain tag. Verification recomputes the content hash AND validates the
//! Ed25519 signature against the embedded public key. A hash match alone
//! is not verification.

use chrono::Utc;
use ed25519_dalek::Signature;
use tracing::debug;

use tally_core::canon::content_digest;
use tally_core::constants::SIGNATURE_ALGORITHM;
use tally_core::types::{AggregateRecord, DataSignature, Digest, SignedAggregate};

use crate::crypto::{domain, AttestationKey, VerifyingKeyHandle};
use crate::error::{SignerError, SignerResult};

/// Signs and verifies daily aggregate records.
///
/// Explicitly constructed and injected: one instance per key lifetime,
/// no module-level singleton. Tests use isolated instances; production
/// owns the key lifecycle.
pub struct AggregateSigner {
    key: AttestationKey,
}

impl AggregateSigner {
    /// Create a signer around an injected key pair.
    pub fn new(key: AttestationKey) -> Self {
        Self { key }
    }

    /// The published public key, for external verifiers.
    ///
    /// This is the platform's transparency contract: the key stays stable
    /// for the life of a signing epoch, and rotation is announced with the
    /// new key's fingerprint.
    pub fn export_public_key(&self) -> String {
        self.key.public_key_hex()
    }

    /// Key identifier (public key prefix).
    pub fn kid(&self) -> &str {
        &self.key.kid
    }

    /// Produce an attestation for an aggregate record.
    pub fn sign(&self, record: &AggregateRecord) -> SignerResult<DataSignature> {
        let content_hash = content_digest(record)
            .map_err(|e| SignerError::Canon(e.to_string()))?;

        let signature = self
            .key
            .sign(domain::DAILY_AGGREGATE, content_hash.as_bytes());

        debug!(
            group = %record.group,
            date = %record.date,
            kid = %self.key.kid,
            "aggregate record signed"
        );

        Ok(DataSignature {
            signature: hex::encode(signature.to_bytes()),
            public_key: self.key.public_key_hex(),
            timestamp: Utc::now(),
            content_hash: content_hash.to_hex(),
            algorithm: SIGNATURE_ALGORITHM.to_string(),
        })
    }

    /// Sign a record and bundle it with its attestation.
    pub fn sign_aggregate(&self, record: AggregateRecord) -> SignerResult<SignedAggregate> {
        let signature = self.sign(&record)?;
        Ok(SignedAggregate { record, signature })
    }
}

/// Verify an attestation against a record.
///
/// Never errors: any malformed field, unknown algorithm, content-hash
/// mismatch, or signature mismatch returns `false`. Callers must treat
/// `false` as "do not trust this record", never as a soft failure.
pub fn verify(record: &AggregateRecord, signature: &DataSignature) -> bool {
    if signature.algorithm != SIGNATURE_ALGORITHM {
        return false;
    }

    // 1. Content hash must match the canonicalized record.
    let computed = match content_digest(record) {
        Ok(digest) => digest,
        Err(_) => return false,
    };
    let claimed = match Digest::from_hex(&signature.content_hash) {
        Ok(digest) => digest,
        Err(_) => return false,
    };
    if computed != claimed {
        return false;
    }

    // 2. The signature must validate against the embedded public key.
    let handle = match VerifyingKeyHandle::from_hex(&signature.public_key) {
        Ok(handle) => handle,
        Err(_) => return false,
    };
    let sig_bytes = match hex::decode(&signature.signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let sig_array: [u8; 64] = match sig_bytes.try_into() {
        Ok(arr) => arr,
        Err(_) => return false,
    };
    let signature = Signature::from_bytes(&sig_array);

    handle
        .verify(domain::DAILY_AGGREGATE, computed.as_bytes(), &signature)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_record() -> AggregateRecord {
        AggregateRecord {
            group: "Edmonton 1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            n: 25,
            avg_value: 7.2,
            ci_lower: 6.8,
            ci_upper: 7.6,
        }
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let signer = AggregateSigner::new(AttestationKey::generate());
        let record = sample_record();

        let signature = signer.sign(&record).unwrap();
        assert_eq!(signature.algorithm, "ed25519");
        assert_eq!(signature.public_key, signer.export_public_key());
        assert!(verify(&record, &signature));
    }

    #[test]
    fn test_tampered_record_fails_verification() {
        let signer = AggregateSigner::new(AttestationKey::generate());
        let record = sample_record();
        let signature = signer.sign(&record).unwrap();

        let mut tampered = record.clone();
        tampered.n = 26;
        assert!(!verify(&tampered, &signature));

        let mut tampered = record.clone();
        tampered.avg_value = 9.9;
        assert!(!verify(&tampered, &signature));

        let mut tampered = record;
        tampered.group = "Edmonton 2".to_string();
        assert!(!verify(&tampered, &signature));
    }

    #[test]
    fn test_swapped_public_key_fails_even_with_matching_hash() {
        let signer = AggregateSigner::new(AttestationKey::generate());
        let unrelated = AttestationKey::generate();
        let record = sample_record();

        let mut signature = signer.sign(&record).unwrap();
        // content_hash still matches the record; only the key is swapped.
        signature.public_key = unrelated.public_key_hex();
        assert!(!verify(&record, &signature));
    }

    #[test]
    fn test_malformed_signature_fields_return_false() {
        let signer = AggregateSigner::new(AttestationKey::generate());
        let record = sample_record();
        let good = signer.sign(&record).unwrap();

        let mut bad = good.clone();
        bad.signature = "zz-not-hex".to_string();
        assert!(!verify(&record, &bad));

        let mut bad = good.clone();
        bad.public_key = "deadbeef".to_string();
        assert!(!verify(&record, &bad));

        let mut bad = good.clone();
        bad.content_hash = "1234".to_string();
        assert!(!verify(&record, &bad));

        let mut bad = good;
        bad.algorithm = "hmac-sha256".to_string();
        assert!(!verify(&record, &bad));
    }

    #[test]
    fn test_two_signers_verify_independently() {
        let signer_a = AggregateSigner::new(AttestationKey::generate());
        let signer_b = AggregateSigner::new(AttestationKey::generate());
        let record = sample_record();

        let sig_a = signer_a.sign(&record).unwrap();
        let sig_b = signer_b.sign(&record).unwrap();

        assert!(verify(&record, &sig_a));
        assert!(verify(&record, &sig_b));
        assert_ne!(sig_a.public_key, sig_b.public_key);
    }

    #[test]
    fn test_sign_aggregate_bundles_record() {
        let signer = AggregateSigner::new(AttestationKey::generate());
        let signed = signer.sign_aggregate(sample_record()).unwrap();
        assert_eq!(signed.signature_id(), "2025-01-10_Edmonton 1");
        assert!(verify(&signed.record, &signed.signature));
    }
}
