//! Store interfaces for the nightly job
//!
//! The raw submission source and the signature store are external
//! collaborators; the job only needs these narrow interfaces. The
//! signature store is keyed by a caller-supplied identifier
//! (`{date}_{group}`) and MUST upsert, so re-running a date overwrites
//! instead of duplicating signed records.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tally_core::types::SubmissionRow;

use crate::error::JobResult;

pub use file::{FileSignatureStore, JsonFileSource};
pub use memory::MemoryStore;

/// A stored attestation, as accepted by the external signature store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSignature {
    /// Upsert key: `{date}_{group}`
    pub signature_id: String,
    /// Hex content hash of the signed record
    pub data_hash: String,
    /// Hex Ed25519 signature
    pub signature: String,
    /// Hex public key
    pub public_key: String,
    /// Opaque metadata (the signed record, timestamps, algorithm)
    pub metadata: Value,
}

/// Read interface over the raw submission store.
#[async_trait]
pub trait SubmissionSource: Send + Sync {
    /// Fetch all rows submitted on the given calendar day (UTC).
    async fn fetch_rows(&self, date: NaiveDate) -> JobResult<Vec<SubmissionRow>>;
}

/// Upsert interface over the signature store.
#[async_trait]
pub trait SignatureStore: Send + Sync {
    /// Insert or overwrite a signature by its `signature_id`.
    async fn upsert(&self, signature: StoredSignature) -> JobResult<()>;

    /// Point lookup by signature identifier.
    async fn get(&self, signature_id: &str) -> JobResult<Option<StoredSignature>>;

    /// All signatures stored for a calendar day.
    async fn list_for_date(&self, date: NaiveDate) -> JobResult<Vec<StoredSignature>>;
}

/// Advisory lock preventing overlapping runs for the same date.
///
/// The actual lock lives with an external coordinator (the scheduler, a
/// database advisory lock); the job only needs the signal. When
/// `try_begin_run` returns `false` the runner no-ops rather than
/// double-signing.
#[async_trait]
pub trait RunLock: Send + Sync {
    /// Returns `true` if this caller owns the run for `date`.
    async fn try_begin_run(&self, date: NaiveDate) -> JobResult<bool>;
}
