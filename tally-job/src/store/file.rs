//! File-backed store implementations
//!
//! `FileSignatureStore` persists one JSON document per signature under a
//! base directory, with upsert-by-id semantics (writing the same id
//! overwrites the file). `JsonFileSource` reads a JSON array of raw
//! submission rows, which is how the nightly binary consumes an exported
//! day of submissions.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs;

use tally_core::types::{Digest, SubmissionRow};

use super::{SignatureStore, StoredSignature, SubmissionSource};
use crate::error::{JobError, JobResult};

/// File-based signature store: `<base>/<sanitized signature_id>.json`.
pub struct FileSignatureStore {
    base_path: PathBuf,
}

impl FileSignatureStore {
    /// Create the store, creating the base directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> JobResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await.map_err(|e| {
            JobError::Persistence(format!(
                "Failed to create directory {:?}: {}",
                base_path, e
            ))
        })?;
        Ok(Self { base_path })
    }

    fn file_path(&self, signature_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", file_stem(signature_id)))
    }
}

/// Group names can carry spaces and punctuation; keep file names safe.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '~'
            }
        })
        .collect()
}

/// Sanitization is lossy ("Edmonton 1" and "Edmonton/1" both sanitize to
/// `Edmonton~1`), so a short digest of the raw id keeps distinct ids in
/// distinct files.
fn file_stem(id: &str) -> String {
    let digest = Digest::compute(id.as_bytes()).to_hex();
    format!("{}-{}", sanitize_id(id), &digest[..8])
}

#[async_trait]
impl SignatureStore for FileSignatureStore {
    async fn upsert(&self, signature: StoredSignature) -> JobResult<()> {
        let json = serde_json::to_string_pretty(&signature)
            .map_err(|e| JobError::Persistence(format!("Serialization error: {}", e)))?;

        let path = self.file_path(&signature.signature_id);
        fs::write(&path, json).await.map_err(|e| {
            JobError::Persistence(format!("Failed to write signature {:?}: {}", path, e))
        })?;
        Ok(())
    }

    async fn get(&self, signature_id: &str) -> JobResult<Option<StoredSignature>> {
        let path = self.file_path(signature_id);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).await.map_err(|e| {
            JobError::TransientStore(format!("Failed to read signature {:?}: {}", path, e))
        })?;

        let signature: StoredSignature = serde_json::from_str(&json)
            .map_err(|e| JobError::Persistence(format!("Failed to parse signature: {}", e)))?;

        if signature.signature_id != signature_id {
            return Err(JobError::Persistence(format!(
                "Signature file {:?} holds id {:?}, expected {:?}",
                path, signature.signature_id, signature_id
            )));
        }

        Ok(Some(signature))
    }

    async fn list_for_date(&self, date: NaiveDate) -> JobResult<Vec<StoredSignature>> {
        let prefix = format!("{}_", date);
        let mut signatures = Vec::new();

        let mut entries = fs::read_dir(&self.base_path).await.map_err(|e| {
            JobError::TransientStore(format!("Failed to list signatures: {}", e))
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            JobError::TransientStore(format!("Failed to list signatures: {}", e))
        })? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = fs::read_to_string(&path).await.map_err(|e| {
                JobError::TransientStore(format!("Failed to read {:?}: {}", path, e))
            })?;
            let signature: StoredSignature = serde_json::from_str(&json).map_err(|e| {
                JobError::Persistence(format!("Failed to parse {:?}: {}", path, e))
            })?;
            if signature.signature_id.starts_with(&prefix) {
                signatures.push(signature);
            }
        }

        signatures.sort_by(|a, b| a.signature_id.cmp(&b.signature_id));
        Ok(signatures)
    }
}

/// Submission source backed by a JSON file holding an array of rows.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SubmissionSource for JsonFileSource {
    async fn fetch_rows(&self, date: NaiveDate) -> JobResult<Vec<SubmissionRow>> {
        let json = fs::read_to_string(&self.path).await.map_err(|e| {
            JobError::TransientStore(format!(
                "Failed to read submissions {:?}: {}",
                self.path, e
            ))
        })?;

        let rows: Vec<SubmissionRow> = serde_json::from_str(&json).map_err(|e| {
            JobError::Persistence(format!("Failed to parse submissions: {}", e))
        })?;

        Ok(rows
            .into_iter()
            .filter(|r| r.created_at.date_naive() == date)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_signature(id: &str) -> StoredSignature {
        StoredSignature {
            signature_id: id.to_string(),
            data_hash: "aa".repeat(32),
            signature: "bb".repeat(64),
            public_key: "cc".repeat(32),
            metadata: serde_json::json!({"algorithm": "ed25519"}),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let dir = TempDir::new().unwrap();
        let store = FileSignatureStore::new(dir.path()).await.unwrap();

        store
            .upsert(sample_signature("2025-01-10_Edmonton 1"))
            .await
            .unwrap();

        let stored = store.get("2025-01-10_Edmonton 1").await.unwrap().unwrap();
        assert_eq!(stored.signature_id, "2025-01-10_Edmonton 1");
        assert!(store.get("2025-01-10_Nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let dir = TempDir::new().unwrap();
        let store = FileSignatureStore::new(dir.path()).await.unwrap();

        let mut first = sample_signature("2025-01-10_Lethbridge");
        first.data_hash = "11".to_string();
        store.upsert(first).await.unwrap();

        let mut second = sample_signature("2025-01-10_Lethbridge");
        second.data_hash = "22".to_string();
        store.upsert(second).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let all = store.list_for_date(date).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].data_hash, "22");
    }

    #[tokio::test]
    async fn test_list_for_date_filters() {
        let dir = TempDir::new().unwrap();
        let store = FileSignatureStore::new(dir.path()).await.unwrap();

        store
            .upsert(sample_signature("2025-01-10_Edmonton 1"))
            .await
            .unwrap();
        store
            .upsert(sample_signature("2025-01-11_Edmonton 1"))
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let listed = store.list_for_date(date).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].signature_id.starts_with("2025-01-10_"));
    }

    #[tokio::test]
    async fn test_json_file_source_filters_by_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("submissions.json");

        let rows = vec![
            SubmissionRow::new(
                "Edmonton 1",
                8.0,
                6.0,
                Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
            ),
            SubmissionRow::new(
                "Edmonton 1",
                7.0,
                5.0,
                Utc.with_ymd_and_hms(2025, 1, 11, 9, 0, 0).unwrap(),
            ),
        ];
        std::fs::write(&path, serde_json::to_string(&rows).unwrap()).unwrap();

        let source = JsonFileSource::new(&path);
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let fetched = source.fetch_rows(date).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].sub_score_policy, 8.0);
    }

    #[tokio::test]
    async fn test_missing_submissions_file_is_transient() {
        let source = JsonFileSource::new("/nonexistent/submissions.json");
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let err = source.fetch_rows(date).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("2025-01-10_Edmonton 1"), "2025-01-10_Edmonton~1");
        assert_eq!(sanitize_id("a/b\\c"), "a~b~c");
    }

    #[test]
    fn test_file_stem_disambiguates_sanitize_collisions() {
        // Both sanitize to the same string; the digest suffix must differ.
        assert_ne!(file_stem("Edmonton 1"), file_stem("Edmonton/1"));
    }

    #[tokio::test]
    async fn test_colliding_ids_stored_independently() {
        let dir = TempDir::new().unwrap();
        let store = FileSignatureStore::new(dir.path()).await.unwrap();

        let mut spaced = sample_signature("2025-01-10_Edmonton 1");
        spaced.data_hash = "11".to_string();
        let mut slashed = sample_signature("2025-01-10_Edmonton/1");
        slashed.data_hash = "22".to_string();

        store.upsert(spaced).await.unwrap();
        store.upsert(slashed).await.unwrap();

        let spaced = store.get("2025-01-10_Edmonton 1").await.unwrap().unwrap();
        let slashed = store.get("2025-01-10_Edmonton/1").await.unwrap().unwrap();
        assert_eq!(spaced.data_hash, "11");
        assert_eq!(slashed.data_hash, "22");

        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(store.list_for_date(date).await.unwrap().len(), 2);
    }
}
