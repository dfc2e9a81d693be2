//! Tally Job - Nightly Aggregate Signing
//!
//! Scheduled orchestrator that pulls a day's raw submissions, computes
//! per-group aggregates with confidence intervals, signs them, and
//! persists the attestations. Runs once per day as a single batch
//! process; overlapping runs for the same date are prevented through an
//! advisory run lock.
//!
//! Failure semantics: a fetch failure fails the run (retried in full on
//! the next invocation); per-group signing or storage errors are logged
//! and skipped so one bad group cannot abort the rest of the run.

pub mod config;
pub mod error;
pub mod retry;
pub mod runner;
pub mod store;

pub use config::JobConfig;
pub use error::{JobError, JobResult};
pub use runner::{default_run_date, JobRunReport, JobState, NightlyJob};
