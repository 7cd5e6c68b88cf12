//! Contract sync pipeline
//!
//! A fetch task walks the ledger from the persisted checkpoint and hands
//! filtered batches over a bounded channel to the commit side, which decodes
//! candidate scripts, extracts registrations and commits records plus the
//! new checkpoint in one atomic write.

use crate::config::SyncConfig;
use crate::ledger::{LedgerEntry, LedgerReader};
use crate::notify::Notifier;
use crate::progress::Progress;
use crate::records::ContractRecord;
use crate::registration::{create_signature, registration_from_script, RejectReason};
use crate::store::ContractStore;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, trace};

/// Fatal pipeline failures. The process is expected to stop on any of them
/// and resume from the last committed checkpoint.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read checkpoint: {0:#}")]
    Checkpoint(anyhow::Error),

    #[error("ledger read failed: {0:#}")]
    Ledger(anyhow::Error),

    #[error("commit of batch ending at {checkpoint} failed: {error:#}")]
    Storage {
        checkpoint: u64,
        error: anyhow::Error,
    },

    #[error("fetch task stopped: {0}")]
    Producer(String),
}

/// Why a single entry produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// Script does not end with the create-contract signature.
    NotCandidate,
    /// Signature matched but the script is not a valid registration.
    Malformed(RejectReason),
}

/// Entries handed from the fetch task to the commit side.
#[derive(Debug, Clone)]
pub struct Batch {
    pub entries: Vec<LedgerEntry>,
    /// Id of the last entry; becomes the checkpoint once committed.
    pub last_id: u64,
}

/// Result of committing one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub checkpoint: u64,
    pub stored: usize,
    pub malformed: usize,
}

/// Cheap checks applied before an entry is queued.
pub fn passes_prefilter(entry: &LedgerEntry, config: &SyncConfig) -> bool {
    entry.script.len() >= config.min_script_len && !config.denylist.contains(&entry.tx_id)
}

/// Turn one entry into a registration record, if it is one.
pub fn classify(entry: &LedgerEntry, signature: &[u8]) -> Result<ContractRecord, Skip> {
    if !entry.script.ends_with(signature) {
        return Err(Skip::NotCandidate);
    }
    registration_from_script(entry.tx_id, &entry.script).map_err(Skip::Malformed)
}

/// Fetch loop: reads batches from `start` and sends them to the commit side.
///
/// Pauses only when a read reaches the ledger tip without leaving anything to
/// send. Returns `Ok(())` once the receiving side is gone.
#[instrument(name = "contract_fetch", skip(ledger, tx, config))]
pub async fn run_fetch_stage<L>(
    ledger: Arc<L>,
    tx: mpsc::Sender<Batch>,
    start: u64,
    config: Arc<SyncConfig>,
) -> Result<(), SyncError>
where
    L: LedgerReader + ?Sized,
{
    let mut next = start;

    loop {
        let page = ledger
            .read_page(next, config.batch_size)
            .await
            .map_err(SyncError::Ledger)?;

        let fetched = page.entries.len();
        next = next.max(page.next);

        let entries: Vec<LedgerEntry> = page
            .entries
            .into_iter()
            .filter(|e| passes_prefilter(e, &config))
            .collect();

        let Some(last_id) = entries.last().map(|e| e.id) else {
            if page.at_tip {
                trace!(next, fetched, "Nothing to process, pausing");
                tokio::time::sleep(config.idle_pause).await;
            } else {
                trace!(next, fetched, "Whole batch filtered out");
            }
            continue;
        };

        trace!(
            first_id = entries[0].id,
            last_id,
            kept = entries.len(),
            fetched,
            "Fetched batch"
        );
        if tx.send(Batch { entries, last_id }).await.is_err() {
            return Ok(());
        }
    }
}

/// Ledger-to-store contract sync.
pub struct SyncPipeline<L: ?Sized, S: ?Sized, N: ?Sized> {
    ledger: Arc<L>,
    store: Arc<S>,
    notifier: Arc<N>,
    config: Arc<SyncConfig>,
    signature: Vec<u8>,
}

impl<L, S, N> SyncPipeline<L, S, N>
where
    L: LedgerReader + ?Sized + 'static,
    S: ContractStore + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(ledger: Arc<L>, store: Arc<S>, notifier: Arc<N>, config: SyncConfig) -> Self {
        Self {
            ledger,
            store,
            notifier,
            config: Arc::new(config),
            signature: create_signature(),
        }
    }

    /// Run until a fatal error.
    ///
    /// Resumes from the stored checkpoint; every batch is committed before
    /// the next one is taken from the channel.
    pub async fn run(&self) -> Result<(), SyncError> {
        let checkpoint = self
            .store
            .get_checkpoint()
            .map_err(SyncError::Checkpoint)?;
        let start = checkpoint.map_or(0, |c| c + 1);
        info!(?checkpoint, start, "Starting contract sync");

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let fetch = tokio::spawn(run_fetch_stage(
            Arc::clone(&self.ledger),
            tx,
            start,
            Arc::clone(&self.config),
        ));

        let mut progress = Progress::new(checkpoint.unwrap_or(0), Instant::now(), &self.config);
        match self.run_commit_stage(rx, &mut progress).await {
            Err(e) => {
                fetch.abort();
                Err(e)
            }
            Ok(()) => match fetch.await {
                Ok(result) => result,
                Err(join_error) => Err(SyncError::Producer(join_error.to_string())),
            },
        }
    }

    async fn run_commit_stage(
        &self,
        mut rx: mpsc::Receiver<Batch>,
        progress: &mut Progress,
    ) -> Result<(), SyncError> {
        while let Some(batch) = rx.recv().await {
            self.process_batch(batch, progress).await?;
        }
        Ok(())
    }

    /// Classify, extract and commit one batch, then report progress.
    pub async fn process_batch(
        &self,
        batch: Batch,
        progress: &mut Progress,
    ) -> Result<BatchOutcome, SyncError> {
        let mut records = Vec::new();
        let mut malformed = 0usize;

        for entry in &batch.entries {
            match classify(entry, &self.signature) {
                Ok(record) => records.push(record),
                Err(Skip::NotCandidate) => {}
                Err(Skip::Malformed(reason)) => {
                    malformed += 1;
                    debug!(
                        id = entry.id,
                        tx_id = %entry.tx_id,
                        %reason,
                        "Skipping malformed contract registration"
                    );
                }
            }
        }

        self.store
            .commit_batch(&records, batch.last_id)
            .map_err(|error| SyncError::Storage {
                checkpoint: batch.last_id,
                error,
            })?;

        if !records.is_empty() {
            info!(
                checkpoint = batch.last_id,
                stored = records.len(),
                "Stored contract registrations"
            );
            for record in &records {
                debug!(contract = %record.contract_id(), name = %record.name, "Registered contract");
            }
        }

        progress
            .update(batch.last_id, Instant::now(), &*self.ledger, &*self.notifier)
            .await;

        Ok(BatchOutcome {
            checkpoint: batch.last_id,
            stored: records.len(),
            malformed,
        })
    }
}
