//! Event chain entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain event types recorded on the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A raw signal was submitted
    SignalSubmitted,
    /// A submitted signal passed validation
    SignalValidated,
    /// A group's daily aggregate was computed and signed
    AggregateUpdated,
    /// A full snapshot was taken
    SnapshotCreated,
}

impl EventType {
    /// Wire name used in canonical event payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignalSubmitted => "signal_submitted",
            Self::SignalValidated => "signal_validated",
            Self::AggregateUpdated => "aggregate_updated",
            Self::SnapshotCreated => "snapshot_created",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in the event chain.
///
/// Strictly singly linked: `previous_hash` is the prior event's
/// `current_hash` (empty string for the first event). Appended only,
/// never mutated or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleEvent {
    /// Short derived identifier (prefix of `current_hash`)
    pub event_id: String,
    /// Event type
    pub event_type: EventType,
    /// Append timestamp
    pub timestamp: DateTime<Utc>,
    /// Opaque structured payload
    pub payload: serde_json::Value,
    /// Hex hash of the prior event (empty string at index 0)
    pub previous_hash: String,
    /// Hex hash of this event: `sha256(previous_hash + sha256(canonical(body)))`
    pub current_hash: String,
}
