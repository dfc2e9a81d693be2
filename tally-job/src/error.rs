//! Error types for the nightly signing job

use thiserror::Error;

use tally_core::error::CoreError;
use tally_signer::SignerError;

/// Job errors
///
/// Store failures are split into transient (retryable with backoff) and
/// persistent (terminal for the attempt) so the retry layer can tell them
/// apart.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Transient store error: {0}")]
    TransientStore(String),

    #[error("Persistent store error: {0}")]
    Persistence(String),

    #[error("Signing error: {0}")]
    Signing(#[from] SignerError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Run deadline exceeded after {elapsed_secs}s (budget {budget_secs}s)")]
    DeadlineExceeded {
        elapsed_secs: u64,
        budget_secs: u64,
    },

    #[error("Retry exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
}

impl JobError {
    /// Whether this error is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }
}

/// Result type for job operations
pub type JobResult<T> = Result<T, JobError>;
