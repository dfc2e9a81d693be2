//! Tally Core - Privacy-Threshold Aggregation & Attestation Primitives
//!
//! This crate provides the domain core for the tally attestation layer:
//! - K-anonymity threshold gating (hard cutoff, no noise injection)
//! - Canonical JSON serialization (the only form ever hashed or signed)
//! - SHA-256 content digests
//! - Aggregation statistics (composite scores, normal-approximation CIs)
//! - The append-only, hash-linked event chain for tamper evidence
//!
//! All functions here are pure or operate on explicitly owned state;
//! network and storage concerns live in `tally-job`.

pub mod canon;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod stats;
pub mod threshold;
pub mod types;

pub use canon::{canonical_json, canonicalize, content_digest};
pub use constants::*;
pub use error::{CoreError, CoreResult};
pub use ledger::event_chain::{ChainVerification, EventChain, ImportReport};
pub use threshold::{gating_message, meets_default_threshold, meets_threshold};
pub use types::*;
