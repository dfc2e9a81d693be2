//! Hash-chained event ledger
//!
//! Tamper-evident append-only log of domain events. Complementary to the
//! aggregate signer: the signer attests to a point-in-time aggregate, the
//! chain attests to the sequence of operations that produced it.
//!
//! The chain is a single-writer, in-process structure. `append` requires
//! exclusive access per instance; callers exposing it across threads must
//! serialize appends (mutex or single-owner task), since the hash linkage
//! is only correct under a strict append order. Durable storage is an
//! external collaborator concern; `export`/`import` is the portability
//! seam.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::canon::canonical_json;
use crate::constants::CHAIN_EXPORT_VERSION;
use crate::error::CoreResult;
use crate::types::{Digest, EventType, MerkleEvent};

/// Length of the derived short event identifier (hex chars).
const EVENT_ID_LEN: usize = 16;

/// Structured result of a full-chain verification.
///
/// Reports ALL mismatches found, not just the first, so operators can
/// distinguish a single corrupted entry from a systemic problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainVerification {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub first_invalid_index: Option<usize>,
}

/// Portable serialized form of a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainExport {
    pub version: u32,
    pub root_hash: String,
    pub events: Vec<MerkleEvent>,
}

/// Outcome of an import attempt.
///
/// On failure the prior chain state is left untouched and
/// `events_imported` is 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub success: bool,
    pub events_imported: usize,
    pub error: Option<String>,
}

impl ImportReport {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            events_imported: 0,
            error: Some(reason.into()),
        }
    }
}

/// Append-only, hash-linked event log.
#[derive(Debug, Clone, Default)]
pub struct EventChain {
    events: Vec<MerkleEvent>,
    root_hash: String,
}

impl EventChain {
    /// Create an empty chain. The root hash of an empty chain is the
    /// empty string, which becomes the first event's `previous_hash`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new event. The only mutating operation.
    pub fn append(&mut self, event_type: EventType, payload: Value) -> CoreResult<&MerkleEvent> {
        let timestamp = Utc::now();
        let event_data_hash = Self::event_data_hash(event_type, &timestamp, &payload)?;
        let current_hash = Self::link_hash(&self.root_hash, &event_data_hash);

        let event = MerkleEvent {
            event_id: current_hash[..EVENT_ID_LEN].to_string(),
            event_type,
            timestamp,
            payload,
            previous_hash: self.root_hash.clone(),
            current_hash: current_hash.clone(),
        };

        self.events.push(event);
        self.root_hash = current_hash;

        let appended = self.events.len() - 1;
        Ok(&self.events[appended])
    }

    /// Current root hash (empty string for an empty chain).
    pub fn root_hash(&self) -> &str {
        &self.root_hash
    }

    /// Number of events on the chain.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in append order.
    pub fn events(&self) -> &[MerkleEvent] {
        &self.events
    }

    /// Point lookup by derived event identifier.
    pub fn audit_trail(&self, event_id: &str) -> Option<&MerkleEvent> {
        self.events.iter().find(|e| e.event_id == event_id)
    }

    /// Walk the full chain and recompute every hash and every link.
    ///
    /// Never panics or errors on corrupt data; corruption is reported in
    /// the returned structure.
    pub fn verify(&self) -> ChainVerification {
        let mut errors = Vec::new();
        let mut first_invalid_index = None;

        let mut record = |index: usize, message: String, first: &mut Option<usize>| {
            if first.is_none() {
                *first = Some(index);
            }
            errors.push(message);
        };

        for (i, event) in self.events.iter().enumerate() {
            let expected_previous = if i == 0 {
                ""
            } else {
                self.events[i - 1].current_hash.as_str()
            };
            if event.previous_hash != expected_previous {
                record(
                    i,
                    format!(
                        "event {}: previous_hash does not link to prior event (expected {}, got {})",
                        i,
                        if expected_previous.is_empty() {
                            "\"\""
                        } else {
                            expected_previous
                        },
                        event.previous_hash
                    ),
                    &mut first_invalid_index,
                );
            }

            match Self::event_data_hash(event.event_type, &event.timestamp, &event.payload) {
                Ok(data_hash) => {
                    let expected_current = Self::link_hash(&event.previous_hash, &data_hash);
                    if event.current_hash != expected_current {
                        record(
                            i,
                            format!(
                                "event {}: current_hash mismatch (expected {}, got {})",
                                i, expected_current, event.current_hash
                            ),
                            &mut first_invalid_index,
                        );
                    }
                }
                Err(e) => {
                    record(
                        i,
                        format!("event {}: payload cannot be canonicalized: {}", i, e),
                        &mut first_invalid_index,
                    );
                }
            }
        }

        let expected_root = self
            .events
            .last()
            .map(|e| e.current_hash.as_str())
            .unwrap_or("");
        if self.root_hash != expected_root {
            let index = self.events.len().saturating_sub(1);
            record(
                index,
                format!(
                    "root hash does not match last event (expected {}, got {})",
                    expected_root, self.root_hash
                ),
                &mut first_invalid_index,
            );
        }

        ChainVerification {
            is_valid: errors.is_empty(),
            errors,
            first_invalid_index,
        }
    }

    /// Export the full chain to a portable structure.
    pub fn export(&self) -> ChainExport {
        ChainExport {
            version: CHAIN_EXPORT_VERSION,
            root_hash: self.root_hash.clone(),
            events: self.events.clone(),
        }
    }

    /// Export the full chain as a JSON string.
    pub fn export_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(&self.export())?)
    }

    /// Replace this chain with an imported one, but only after the
    /// imported chain verifies in full. A corrupt import is rejected
    /// wholesale and the prior state is left untouched.
    pub fn import(&mut self, serialized: &str) -> ImportReport {
        let export: ChainExport = match serde_json::from_str(serialized) {
            Ok(export) => export,
            Err(e) => {
                warn!(error = %e, "chain import rejected: malformed export");
                return ImportReport::rejected(format!("malformed export: {}", e));
            }
        };

        if export.version != CHAIN_EXPORT_VERSION {
            warn!(
                version = export.version,
                "chain import rejected: unsupported version"
            );
            return ImportReport::rejected(format!(
                "unsupported export version: expected {}, got {}",
                CHAIN_EXPORT_VERSION, export.version
            ));
        }

        let candidate = EventChain {
            events: export.events,
            root_hash: export.root_hash,
        };

        let verification = candidate.verify();
        if !verification.is_valid {
            warn!(
                errors = verification.errors.len(),
                first_invalid_index = ?verification.first_invalid_index,
                "chain import rejected: verification failed"
            );
            return ImportReport::rejected(format!(
                "chain verification failed: {}",
                verification.errors.join("; ")
            ));
        }

        let imported = candidate.events.len();
        *self = candidate;

        ImportReport {
            success: true,
            events_imported: imported,
            error: None,
        }
    }

    /// Canonical digest of the event body `{event_type, timestamp, payload}`.
    fn event_data_hash(
        event_type: EventType,
        timestamp: &chrono::DateTime<Utc>,
        payload: &Value,
    ) -> CoreResult<String> {
        let body = serde_json::json!({
            "event_type": event_type.as_str(),
            "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            "payload": payload,
        });
        let canonical = canonical_json(&body)?;
        Ok(Digest::compute(canonical.as_bytes()).to_hex())
    }

    /// `sha256(previous_hash || event_data_hash)` over the hex strings.
    fn link_hash(previous_hash: &str, event_data_hash: &str) -> String {
        let mut input = String::with_capacity(previous_hash.len() + event_data_hash.len());
        input.push_str(previous_hash);
        input.push_str(event_data_hash);
        Digest::compute(input.as_bytes()).to_hex()
    }
}
