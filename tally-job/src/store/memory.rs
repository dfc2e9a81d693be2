//! In-memory store implementations
//!
//! Thread-safe via `tokio::sync::RwLock`; used by tests and development.
//! The submission half can be primed with rows and told to fail, which is
//! how the retry paths are exercised.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;

use tally_core::types::SubmissionRow;

use super::{RunLock, SignatureStore, StoredSignature, SubmissionSource};
use crate::error::{JobError, JobResult};

/// In-memory submission source, signature store and run lock in one.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<SubmissionRow>>,
    signatures: RwLock<HashMap<String, StoredSignature>>,
    started_runs: RwLock<HashSet<NaiveDate>>,
    /// Number of upcoming fetches that fail transiently
    fetch_failures: AtomicU32,
    /// Signature ids whose upsert fails permanently
    failing_upserts: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prime the source with raw rows.
    pub async fn add_rows(&self, rows: Vec<SubmissionRow>) {
        self.rows.write().await.extend(rows);
    }

    /// Make the next `count` fetches fail with a transient error.
    pub fn fail_next_fetches(&self, count: u32) {
        self.fetch_failures.store(count, Ordering::SeqCst);
    }

    /// Make upserts for `signature_id` fail with a persistent error.
    pub async fn fail_upserts_for(&self, signature_id: &str) {
        self.failing_upserts
            .write()
            .await
            .insert(signature_id.to_string());
    }

    /// Number of stored signatures.
    pub async fn signature_count(&self) -> usize {
        self.signatures.read().await.len()
    }
}

#[async_trait]
impl SubmissionSource for MemoryStore {
    async fn fetch_rows(&self, date: NaiveDate) -> JobResult<Vec<SubmissionRow>> {
        let remaining = self.fetch_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fetch_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(JobError::TransientStore(
                "submission source unavailable".to_string(),
            ));
        }

        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.created_at.date_naive() == date)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SignatureStore for MemoryStore {
    async fn upsert(&self, signature: StoredSignature) -> JobResult<()> {
        if self
            .failing_upserts
            .read()
            .await
            .contains(&signature.signature_id)
        {
            return Err(JobError::Persistence(format!(
                "signature store rejected {}",
                signature.signature_id
            )));
        }

        self.signatures
            .write()
            .await
            .insert(signature.signature_id.clone(), signature);
        Ok(())
    }

    async fn get(&self, signature_id: &str) -> JobResult<Option<StoredSignature>> {
        Ok(self.signatures.read().await.get(signature_id).cloned())
    }

    async fn list_for_date(&self, date: NaiveDate) -> JobResult<Vec<StoredSignature>> {
        let prefix = format!("{}_", date);
        Ok(self
            .signatures
            .read()
            .await
            .values()
            .filter(|s| s.signature_id.starts_with(&prefix))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RunLock for MemoryStore {
    async fn try_begin_run(&self, date: NaiveDate) -> JobResult<bool> {
        Ok(self.started_runs.write().await.insert(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(group: &str, date: (i32, u32, u32)) -> SubmissionRow {
        SubmissionRow::new(
            group,
            7.0,
            6.0,
            Utc.with_ymd_and_hms(date.0, date.1, date.2, 12, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fetch_filters_by_date() {
        let store = MemoryStore::new();
        store
            .add_rows(vec![
                row("Edmonton 1", (2025, 1, 10)),
                row("Edmonton 1", (2025, 1, 11)),
            ])
            .await;

        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let rows = store.fetch_rows(date).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_injection() {
        let store = MemoryStore::new();
        store.fail_next_fetches(1);

        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let err = store.fetch_rows(date).await.unwrap_err();
        assert!(err.is_transient());

        // Second fetch succeeds.
        assert!(store.fetch_rows(date).await.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let store = MemoryStore::new();
        let make = |hash: &str| StoredSignature {
            signature_id: "2025-01-10_Edmonton 1".to_string(),
            data_hash: hash.to_string(),
            signature: "00".to_string(),
            public_key: "00".to_string(),
            metadata: serde_json::json!({}),
        };

        store.upsert(make("aa")).await.unwrap();
        store.upsert(make("bb")).await.unwrap();

        assert_eq!(store.signature_count().await, 1);
        let stored = store.get("2025-01-10_Edmonton 1").await.unwrap().unwrap();
        assert_eq!(stored.data_hash, "bb");
    }

    #[tokio::test]
    async fn test_run_lock_single_owner() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        assert!(store.try_begin_run(date).await.unwrap());
        assert!(!store.try_begin_run(date).await.unwrap());

        let other = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        assert!(store.try_begin_run(other).await.unwrap());
    }
}
