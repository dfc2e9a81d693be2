//! Domain types for the tally attestation layer

pub mod aggregate;
pub mod common;
pub mod event;

pub use aggregate::{AggregateRecord, DataSignature, SignedAggregate, SubmissionRow};
pub use common::Digest;
pub use event::{EventType, MerkleEvent};
