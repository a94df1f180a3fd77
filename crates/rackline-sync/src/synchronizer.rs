//! # Synchronizer
//!
//! Drains the pending transaction queue against the remote sink with
//! bounded retry and exponential backoff.
//!
//! ## Sync Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        One Sync Cycle                               │
//! │                                                                     │
//! │  sync_with_retry(max_attempts = 3)                                  │
//! │       │                                                             │
//! │       ├── offline?            → Outcome::Offline  (no-op)           │
//! │       ├── cycle in flight?    → Outcome::Coalesced (ignored)        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SNAPSHOT = list_pending()          ← read once per cycle;          │
//! │       │                               sales enqueued mid-cycle      │
//! │       │                               wait for the next one         │
//! │       ▼                                                             │
//! │  PASS 1: submit each, oldest first                                  │
//! │    ok → dequeue     fail → keep for next pass                       │
//! │       │                                                             │
//! │       ▼  (anything left?)                                           │
//! │  wait base × 2^0 ── PASS 2 ── wait base × 2^1 ── PASS 3             │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  still failing after PASS max_attempts:                             │
//! │    mark_failed(id): stays queued, reported, NEVER dropped           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One failing transaction never aborts the cycle: every snapshot entry
//! gets its own attempts, and exhaustion is reported per transaction.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use rackline_core::{SaleTransaction, TransactionStatus};
use rackline_db::Database;

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::sink::TransactionSink;

// =============================================================================
// Cycle Reporting
// =============================================================================

/// A transaction whose retries ran out this cycle.
///
/// Not a loss: the transaction is still queued with status `failed` and
/// will be picked up by a future cycle. Surfaced so the UI can show a
/// non-blocking "N sales will retry" indicator.
#[derive(Debug, Clone)]
pub struct ExhaustedTransaction {
    /// Transaction id.
    pub id: String,

    /// Attempts spent this cycle.
    pub attempts: u32,

    /// The last submission error seen.
    pub last_error: String,
}

/// What happened in one completed sync cycle.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Transactions in the cycle's snapshot.
    pub attempted: usize,

    /// Transactions confirmed remotely and dequeued.
    pub synced: usize,

    /// Transactions whose retries ran out (still queued).
    pub exhausted: Vec<ExhaustedTransaction>,
}

/// Outcome of a sync trigger.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// A cycle ran to completion.
    Completed(SyncReport),

    /// Another cycle was already in flight; this trigger was ignored.
    Coalesced,

    /// Offline; the cycle was skipped entirely.
    Offline,
}

// =============================================================================
// Synchronizer
// =============================================================================

/// Drains the local queue against the remote sink.
pub struct Synchronizer {
    db: Arc<Database>,
    sink: Arc<dyn TransactionSink>,
    config: Arc<SyncConfig>,
    online_rx: watch::Receiver<bool>,

    /// Held for the duration of a cycle. `try_lock` makes re-entrant
    /// triggers coalesce instead of queueing, so the same transaction is
    /// never submitted by two overlapping cycles.
    in_flight: Mutex<()>,
}

impl Synchronizer {
    /// Creates a synchronizer.
    ///
    /// `online_rx` is the connectivity watch produced by
    /// [`crate::monitor::ConnectivityMonitor::spawn`].
    pub fn new(
        db: Arc<Database>,
        sink: Arc<dyn TransactionSink>,
        config: Arc<SyncConfig>,
        online_rx: watch::Receiver<bool>,
    ) -> Self {
        Synchronizer {
            db,
            sink,
            config,
            online_rx,
            in_flight: Mutex::new(()),
        }
    }

    /// Runs one sync cycle with up to `max_attempts` submission passes.
    ///
    /// Reads the queue once (snapshot), submits oldest sale first, and
    /// waits `backoff_base * 2^(attempt-1)` between passes. Transactions
    /// that fail every pass are marked `failed` and reported; they remain
    /// queued for future cycles.
    pub async fn sync_with_retry(&self, max_attempts: u32) -> SyncResult<CycleOutcome> {
        if !*self.online_rx.borrow() {
            debug!("Offline, skipping sync cycle");
            return Ok(CycleOutcome::Offline);
        }

        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Sync cycle already in flight, coalescing trigger");
                return Ok(CycleOutcome::Coalesced);
            }
        };

        // Snapshot: transactions enqueued after this point belong to the
        // next cycle, keeping this cycle's accounting bounded.
        let snapshot = self.db.queue().list_pending().await?;
        if snapshot.is_empty() {
            debug!("Queue empty, nothing to sync");
            return Ok(CycleOutcome::Completed(SyncReport::default()));
        }

        info!(count = snapshot.len(), "Starting sync cycle");

        let mut backoff = self.create_backoff();
        let attempted = snapshot.len();
        let mut remaining = snapshot;
        let mut synced = 0usize;
        let mut last_errors: HashMap<String, String> = HashMap::new();
        let mut attempt = 0u32;

        while attempt < max_attempts && !remaining.is_empty() {
            attempt += 1;
            let mut still_failing = Vec::new();

            for tx in remaining {
                match self.submit_one(&tx).await? {
                    Ok(()) => {
                        synced += 1;
                        debug!(id = %tx.id, attempt, "Transaction synced");
                    }
                    Err(reason) => {
                        warn!(id = %tx.id, attempt, error = %reason, "Submission failed");
                        last_errors.insert(tx.id.clone(), reason);
                        still_failing.push(tx);
                    }
                }
            }

            remaining = still_failing;

            if !remaining.is_empty() && attempt < max_attempts {
                if let Some(delay) = backoff.next_backoff() {
                    debug!(?delay, attempt, "Backing off before next pass");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // Whatever is left keeps its place in the queue, flagged failed.
        let mut exhausted = Vec::new();
        for tx in &remaining {
            let last_error = last_errors
                .remove(&tx.id)
                .unwrap_or_else(|| "unknown error".to_string());
            self.db.queue().mark_failed(&tx.id, &last_error).await?;
            exhausted.push(ExhaustedTransaction {
                id: tx.id.clone(),
                attempts: max_attempts,
                last_error,
            });
        }

        if exhausted.is_empty() {
            info!(synced, "Sync cycle complete");
        } else {
            warn!(
                synced,
                exhausted = exhausted.len(),
                "Sync cycle complete; some transactions will retry later"
            );
        }

        Ok(CycleOutcome::Completed(SyncReport {
            attempted,
            synced,
            exhausted,
        }))
    }

    /// Submits one transaction and settles its queue state on success.
    ///
    /// Returns Ok(Err(reason)) for a failed attempt: attempt failures are
    /// data for the retry loop, not errors of the cycle itself.
    async fn submit_one(&self, tx: &SaleTransaction) -> SyncResult<Result<(), String>> {
        // A failed entry being re-attempted goes back to pending first, so
        // the queue always reflects what the synchronizer is doing.
        if tx.status == TransactionStatus::Failed {
            self.db.queue().mark_pending(&tx.id).await?;
        }

        match self.sink.submit(tx).await {
            Ok(()) => {
                self.db.queue().dequeue(&tx.id).await?;
                Ok(Ok(()))
            }
            Err(e) => Ok(Err(e.to_string())),
        }
    }

    /// Backoff schedule: base, base×2, base×4, ... capped at max_backoff.
    fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.backoff_base(),
            max_interval: self.config.max_backoff(),
            multiplier: 2.0,
            // Deterministic schedule; jitter is optional by design and the
            // deterministic form is what the tests pin down.
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..Default::default()
        };
        // Aligns current_interval with initial_interval.
        backoff.reset();
        backoff
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
