//! Nightly aggregate signing binary
//!
//! Reads a day of exported submissions from a JSON file, aggregates and
//! signs per group, persists signatures to a directory store, and writes
//! the run's event chain next to them.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use tally_core::ledger::EventChain;
use tally_job::store::{FileSignatureStore, JsonFileSource, MemoryStore};
use tally_job::{JobConfig, JobRunReport, NightlyJob};
use tally_signer::{AggregateSigner, AttestationKey, SignerResult};

#[derive(Parser, Debug)]
#[command(name = "tally-nightly")]
#[command(about = "Aggregate, sign and attest one day of submissions")]
struct Cli {
    /// Calendar day to process (YYYY-MM-DD); defaults to yesterday (UTC)
    #[arg(long)]
    date: Option<chrono::NaiveDate>,

    /// JSON file holding the day's exported submission rows
    #[arg(long)]
    submissions: std::path::PathBuf,

    /// Directory the signature store writes into
    #[arg(long)]
    out_dir: std::path::PathBuf,

    /// Hex-encoded Ed25519 secret key (32 bytes); falls back to the
    /// TALLY_SECRET_KEY environment variable
    #[arg(long)]
    secret_key: Option<String>,

    /// File to write the run's event chain export to
    #[arg(long)]
    chain_out: Option<std::path::PathBuf>,
}

/// Resolve the signing key: CLI flag first, then the environment.
///
/// A supplied-but-malformed key is fatal. Signing a day of aggregates with
/// a substitute key would break verification against the published epoch
/// key while the scheduler sees success. Only the no-key-supplied dev path
/// falls back to an ephemeral key.
fn load_key(cli_key: Option<String>, env_key: Option<String>) -> SignerResult<AttestationKey> {
    match cli_key.or(env_key) {
        Some(hex_key) => AttestationKey::from_hex(&hex_key),
        None => {
            warn!("no secret key supplied, generating an ephemeral key; signatures will not be verifiable across runs");
            Ok(AttestationKey::generate())
        }
    }
}

async fn run(cli: Cli, date: chrono::NaiveDate) -> Result<(), Box<dyn std::error::Error>> {
    let env_key = std::env::var("TALLY_SECRET_KEY").ok();
    let key = load_key(cli.secret_key, env_key)?;
    let signer = AggregateSigner::new(key);
    info!(public_key = %signer.export_public_key(), "signer ready");

    let source = Arc::new(JsonFileSource::new(&cli.submissions));
    let store = Arc::new(FileSignatureStore::new(&cli.out_dir).await?);
    // Single scheduled invocation per date; coordination with an external
    // scheduler lock happens outside this binary.
    let lock = Arc::new(MemoryStore::new());

    let config = JobConfig::from_env();
    let mut job = NightlyJob::new(source, store, lock, signer, config);

    let report = job.run(date).await?;
    if let Some(chain_out) = cli.chain_out {
        write_chain(job.chain(), &chain_out).await?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn write_chain(
    chain: &EventChain,
    path: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = chain.export_json()?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), events = chain.len(), "event chain written");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let date = cli.date.unwrap_or_else(tally_job::default_run_date);
    match run(cli, date).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "nightly signing run failed");
            if let Ok(failed) = serde_json::to_string_pretty(&JobRunReport::failed(date)) {
                println!("{}", failed);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_key_rejects_malformed_supplied_key() {
        assert!(load_key(Some("not-hex".to_string()), None).is_err());
        assert!(load_key(Some("abcd".to_string()), None).is_err());
        // A malformed env key is just as fatal as a malformed flag.
        assert!(load_key(None, Some("abcd".to_string())).is_err());
    }

    #[test]
    fn test_load_key_uses_supplied_key() {
        let expected = AttestationKey::from_bytes(&[0x42u8; 32]);
        let loaded = load_key(Some("42".repeat(32)), None).unwrap();
        assert_eq!(loaded.public_key_hex(), expected.public_key_hex());
    }

    #[test]
    fn test_load_key_generates_when_absent() {
        let a = load_key(None, None).unwrap();
        let b = load_key(None, None).unwrap();
        assert_ne!(a.public_key_hex(), b.public_key_hex());
    }

    #[test]
    fn test_cli_flag_wins_over_env() {
        let expected = AttestationKey::from_bytes(&[0x01u8; 32]);
        let loaded = load_key(Some("01".repeat(32)), Some("02".repeat(32))).unwrap();
        assert_eq!(loaded.public_key_hex(), expected.public_key_hex());
    }
}
