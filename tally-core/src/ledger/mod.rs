//! Append-only ledgers for the tally layer

pub mod event_chain;

pub use event_chain::{ChainExport, ChainVerification, EventChain, ImportReport};
