//! Nightly signing job runner
//!
//! State machine: `Idle -> Fetching -> Aggregating -> Signing ->
//! Persisting -> Done`, with `Fetching`/`Persisting` failing the run.
//! A fetch failure (after bounded retries) fails the whole run so the
//! scheduler retries it in full; per-group signing and storage errors are
//! logged and skipped so one bad group never aborts the rest.

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use tally_core::ledger::EventChain;
use tally_core::stats::summarize;
use tally_core::types::{AggregateRecord, EventType, SubmissionRow};

use crate::config::JobConfig;
use crate::error::{JobError, JobResult};
use crate::retry::{with_retries, RetryPolicy};
use crate::store::{RunLock, SignatureStore, StoredSignature, SubmissionSource};
use tally_signer::AggregateSigner;

/// Default run date: yesterday, UTC.
pub fn default_run_date() -> NaiveDate {
    let today = Utc::now().date_naive();
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

/// Run states of the nightly job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Idle,
    Fetching,
    Aggregating,
    Signing,
    Persisting,
    Done,
    Failed,
}

/// Outcome of one nightly run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRunReport {
    pub date: NaiveDate,
    pub state: JobState,
    pub rows_fetched: usize,
    pub groups_signed: usize,
    pub groups_skipped: usize,
    /// True when another run already owned this date and we no-opped
    pub already_running: bool,
}

impl JobRunReport {
    fn noop(date: NaiveDate) -> Self {
        Self {
            date,
            state: JobState::Done,
            rows_fetched: 0,
            groups_signed: 0,
            groups_skipped: 0,
            already_running: true,
        }
    }

    /// Report for a run that aborted with an error. Emitted by callers
    /// alongside the error itself; the counters are zero because nothing
    /// from a failed run is trustworthy.
    pub fn failed(date: NaiveDate) -> Self {
        Self {
            date,
            state: JobState::Failed,
            rows_fetched: 0,
            groups_signed: 0,
            groups_skipped: 0,
            already_running: false,
        }
    }
}

/// The nightly aggregate signing job.
///
/// Single scheduled, single-threaded batch process: the signer and chain
/// are injected, owned instances, and all chain appends go through this
/// runner (single-writer discipline).
pub struct NightlyJob<S, T, L> {
    source: Arc<S>,
    store: Arc<T>,
    lock: Arc<L>,
    signer: AggregateSigner,
    chain: EventChain,
    config: JobConfig,
}

impl<S, T, L> NightlyJob<S, T, L>
where
    S: SubmissionSource,
    T: SignatureStore,
    L: RunLock,
{
    pub fn new(
        source: Arc<S>,
        store: Arc<T>,
        lock: Arc<L>,
        signer: AggregateSigner,
        config: JobConfig,
    ) -> Self {
        Self {
            source,
            store,
            lock,
            signer,
            chain: EventChain::new(),
            config,
        }
    }

    /// The event chain this runner appends to.
    pub fn chain(&self) -> &EventChain {
        &self.chain
    }

    /// The published public key of the injected signer.
    pub fn public_key(&self) -> String {
        self.signer.export_public_key()
    }

    /// Execute one run for the given calendar day.
    pub async fn run(&mut self, date: NaiveDate) -> JobResult<JobRunReport> {
        let started = Instant::now();
        let budget = Duration::from_secs(self.config.deadline_secs);
        let retry_policy = RetryPolicy::new(
            self.config.max_retries,
            Duration::from_millis(self.config.retry_delay_ms),
        );

        info!(date = %date, "nightly signing run starting");

        if !self.lock.try_begin_run(date).await? {
            info!(date = %date, "run already started for this date, nothing to do");
            return Ok(JobRunReport::noop(date));
        }

        // Fetching
        debug!(date = %date, state = ?JobState::Fetching, "fetching raw submissions");
        let source = self.source.clone();
        let rows = with_retries(&retry_policy, "fetch_rows", || {
            let source = source.clone();
            async move { source.fetch_rows(date).await }
        })
        .await
        .map_err(|e| {
            error!(date = %date, error = %e, "fetch failed, run aborted");
            e
        })?;
        let rows_fetched = rows.len();
        info!(date = %date, count = rows_fetched, "submissions fetched");

        // A fetch that limped through its retries may already have burned
        // the budget.
        Self::check_deadline(started, budget)?;

        // Aggregating
        let groups = self.group_scores(&rows);
        debug!(date = %date, count = groups.len(), "groups aggregated");

        // Signing + Persisting, group by group
        let mut groups_signed = 0usize;
        let mut groups_skipped = 0usize;

        for (group, scores) in &groups {
            Self::check_deadline(started, budget)?;

            let summary = match summarize(scores) {
                Ok(summary) => summary,
                Err(e) => {
                    // Only reachable for an empty score list, which the
                    // grouping step never produces.
                    warn!(group = %group, error = %e, "group skipped: not summarizable");
                    groups_skipped += 1;
                    continue;
                }
            };

            let record = AggregateRecord::from_summary(group.clone(), date, &summary);

            let signed = match self.signer.sign_aggregate(record) {
                Ok(signed) => signed,
                Err(e) => {
                    warn!(group = %group, date = %date, error = %e, "group skipped: signing failed");
                    groups_skipped += 1;
                    continue;
                }
            };

            let stored = StoredSignature {
                signature_id: signed.signature_id(),
                data_hash: signed.signature.content_hash.clone(),
                signature: signed.signature.signature.clone(),
                public_key: signed.signature.public_key.clone(),
                metadata: serde_json::json!({
                    "record": &signed.record,
                    "algorithm": &signed.signature.algorithm,
                    "signed_at": signed.signature.timestamp,
                }),
            };

            let store = self.store.clone();
            let persist = with_retries(&retry_policy, "upsert_signature", || {
                let store = store.clone();
                let stored = stored.clone();
                async move { store.upsert(stored).await }
            })
            .await;

            if let Err(e) = persist {
                // Per-group storage errors are non-fatal to the run.
                warn!(group = %group, date = %date, error = %e, "group skipped: signature store error");
                groups_skipped += 1;
                continue;
            }

            self.chain.append(
                EventType::AggregateUpdated,
                serde_json::json!({
                    "group": &signed.record.group,
                    "date": signed.record.date,
                    "n": signed.record.n,
                    "content_hash": &signed.signature.content_hash,
                    "signature_id": &stored.signature_id,
                }),
            )?;

            debug!(
                group = %group,
                date = %date,
                n = signed.record.n,
                "group aggregate signed and stored"
            );
            groups_signed += 1;
        }

        info!(
            date = %date,
            rows = rows_fetched,
            signed = groups_signed,
            skipped = groups_skipped,
            duration_ms = started.elapsed().as_millis() as u64,
            "nightly signing run complete"
        );

        Ok(JobRunReport {
            date,
            state: JobState::Done,
            rows_fetched,
            groups_signed,
            groups_skipped,
            already_running: false,
        })
    }

    /// Group rows by group identifier and map to composite scores.
    /// Groups with zero rows simply never appear; nothing is ever signed
    /// with `n = 0`.
    fn group_scores(&self, rows: &[SubmissionRow]) -> BTreeMap<String, Vec<f64>> {
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in rows {
            groups.entry(row.group.clone()).or_default().push(
                self.config
                    .weights
                    .composite(row.sub_score_policy, row.sub_score_urgency),
            );
        }
        groups
    }

    fn check_deadline(started: Instant, budget: Duration) -> JobResult<()> {
        let elapsed = started.elapsed();
        if elapsed > budget {
            return Err(JobError::DeadlineExceeded {
                elapsed_secs: elapsed.as_secs(),
                budget_secs: budget.as_secs(),
            });
        }
        Ok(())
    }
}
