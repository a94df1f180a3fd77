//! # Sync Agent
//!
//! Main orchestrator for offline-first sync. Owns the synchronizer and
//! decides *when* cycles run; the synchronizer decides *how*.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      SyncAgent Triggers                             │
//! │                                                                     │
//! │  (a) Connectivity edge    offline ──► online   (watch channel)      │
//! │  (b) Poll interval        while online and queue non-empty          │
//! │  (c) Manual trigger       checkout / "sync now" button              │
//! │                                                                     │
//! │         │                    │                     │                │
//! │         └────────────────────┼─────────────────────┘                │
//! │                              ▼                                      │
//! │               Synchronizer::sync_with_retry()                       │
//! │               (single-flight; overlapping triggers coalesce)        │
//! │                              │                                      │
//! │                              ▼                                      │
//! │               SyncStatus + SyncEventEmitter                         │
//! │               "sync://status"   { online, pending }                 │
//! │               "sync://progress" { synced, remaining }               │
//! │               "sync://error"    { message, retryable: true }        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, error, info, warn};

use chrono::Utc;
use rackline_core::SaleTransaction;
use rackline_db::Database;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::sink::TransactionSink;
use crate::synchronizer::{CycleOutcome, Synchronizer};

// =============================================================================
// Sync Status
// =============================================================================

/// Current sync status for external queries (status bar, indicators).
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    /// Whether the remote store is currently reachable.
    pub is_online: bool,

    /// Number of transactions waiting in the local queue.
    pub pending_count: i64,

    /// Last successful sync timestamp (ISO8601).
    pub last_synced_at: Option<String>,

    /// Last error message (if any).
    pub last_error: Option<String>,
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Trait for emitting sync events (implemented by the UI integration).
pub trait SyncEventEmitter: Send + Sync {
    /// Emits a sync status change event.
    fn emit_status(&self, status: &SyncStatus);

    /// Emits a sync progress event.
    fn emit_progress(&self, synced: usize, remaining: i64);

    /// Emits a sync error event. `retryable` distinguishes "will retry"
    /// warnings from conditions needing attention.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter for headless use and testing.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
    fn emit_progress(&self, _synced: usize, _remaining: i64) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Sync Agent
// =============================================================================

/// Orchestrates queue draining against connectivity and timers.
///
/// ## Wiring
/// ```rust,ignore
/// let monitor = ConnectivityMonitor::spawn(probe, config.health_interval());
/// let mut agent = SyncAgent::new(config, db, sink, monitor.subscribe());
/// agent.start().await?;
///
/// // checkout:
/// agent.submit_sale(&transaction).await?;
/// ```
pub struct SyncAgent {
    config: Arc<SyncConfig>,
    db: Arc<Database>,
    synchronizer: Arc<Synchronizer>,
    online_rx: watch::Receiver<bool>,
    emitter: Arc<dyn SyncEventEmitter>,
    status: Arc<RwLock<SyncStatus>>,

    /// Manual trigger channel. Capacity 1: triggers arriving while a
    /// cycle runs are coalesced, not queued up.
    trigger_tx: mpsc::Sender<()>,
    trigger_rx: Option<mpsc::Receiver<()>>,

    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl SyncAgent {
    /// Creates a new sync agent.
    pub fn new(
        config: SyncConfig,
        db: Arc<Database>,
        sink: Arc<dyn TransactionSink>,
        online_rx: watch::Receiver<bool>,
    ) -> Self {
        Self::with_emitter(config, db, sink, online_rx, Arc::new(NoOpEmitter))
    }

    /// Creates a new sync agent with a custom event emitter.
    pub fn with_emitter(
        config: SyncConfig,
        db: Arc<Database>,
        sink: Arc<dyn TransactionSink>,
        online_rx: watch::Receiver<bool>,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> Self {
        let config = Arc::new(config);
        let synchronizer = Arc::new(Synchronizer::new(
            db.clone(),
            sink,
            config.clone(),
            online_rx.clone(),
        ));
        let (trigger_tx, trigger_rx) = mpsc::channel(1);

        SyncAgent {
            config,
            db,
            synchronizer,
            online_rx,
            emitter,
            status: Arc::new(RwLock::new(SyncStatus::default())),
            trigger_tx,
            trigger_rx: Some(trigger_rx),
            shutdown_tx: None,
        }
    }

    /// Starts the background drain loop.
    ///
    /// A no-op when sync is disabled in the config (local-only mode).
    pub async fn start(&mut self) -> SyncResult<()> {
        if !self.config.is_sync_enabled() {
            info!("Sync is disabled, agent not started");
            return Ok(());
        }

        self.config.validate()?;

        let trigger_rx = self
            .trigger_rx
            .take()
            .ok_or_else(|| SyncError::Internal("Sync agent already started".into()))?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        info!(device_id = %self.config.device_id(), "Starting sync agent");

        tokio::spawn(Self::run_loop(
            self.config.clone(),
            self.db.clone(),
            self.synchronizer.clone(),
            self.online_rx.clone(),
            self.emitter.clone(),
            self.status.clone(),
            trigger_rx,
            shutdown_rx,
        ));

        Ok(())
    }

    /// Stops the agent gracefully.
    pub async fn shutdown(&mut self) {
        info!("Shutting down sync agent");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }

    /// Accepts a completed sale: durably enqueues it, then nudges the
    /// drain loop for immediate submission if we are online.
    ///
    /// Once this returns Ok, the sale cannot be lost; worst case it waits
    /// in the queue until connectivity returns.
    pub async fn submit_sale(&self, tx: &SaleTransaction) -> SyncResult<()> {
        self.db.queue().enqueue(tx).await?;
        debug!(id = %tx.id, "Sale queued");
        self.trigger_sync();
        Ok(())
    }

    /// Requests a sync cycle (e.g., from a "sync now" button).
    ///
    /// Never blocks; a trigger arriving while a cycle is running is
    /// coalesced.
    pub fn trigger_sync(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Returns the current sync status with a fresh queue count.
    pub async fn status(&self) -> SyncStatus {
        let mut status = self.status.read().await.clone();
        status.is_online = *self.online_rx.borrow();
        if let Ok(count) = self.db.queue().count_pending().await {
            status.pending_count = count;
        }
        status
    }

    // =========================================================================
    // Background Loop
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    async fn run_loop(
        config: Arc<SyncConfig>,
        db: Arc<Database>,
        synchronizer: Arc<Synchronizer>,
        mut online_rx: watch::Receiver<bool>,
        emitter: Arc<dyn SyncEventEmitter>,
        status: Arc<RwLock<SyncStatus>>,
        mut trigger_rx: mpsc::Receiver<()>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut poll = tokio::time::interval(config.poll_interval());
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // (a) Connectivity edges: drain immediately on reconnect.
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        warn!("Connectivity monitor gone, stopping sync agent");
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    if online {
                        info!("Connectivity restored, draining queue");
                        Self::run_cycle(&config, &db, &synchronizer, &emitter, &status).await;
                    } else {
                        let mut s = status.write().await;
                        s.is_online = false;
                        emitter.emit_status(&s);
                    }
                }

                // (b) Periodic poll while online with work to do. The
                // first tick fires immediately, draining any backlog left
                // over from the previous run.
                _ = poll.tick() => {
                    if *online_rx.borrow() {
                        let pending = db.queue().count_pending().await.unwrap_or(0);
                        if pending > 0 {
                            debug!(pending, "Poll tick, draining queue");
                            Self::run_cycle(&config, &db, &synchronizer, &emitter, &status).await;
                        }
                    }
                }

                // (c) Manual triggers (checkout, "sync now").
                Some(()) = trigger_rx.recv() => {
                    Self::run_cycle(&config, &db, &synchronizer, &emitter, &status).await;
                    // Triggers that piled up during the cycle were about
                    // this same backlog; drop them.
                    while trigger_rx.try_recv().is_ok() {}
                }

                // Shutdown
                _ = shutdown_rx.recv() => {
                    info!("Sync agent shutting down");
                    break;
                }
            }
        }

        info!("Sync agent stopped");
    }

    /// Runs one cycle and folds its outcome into status + events.
    async fn run_cycle(
        config: &Arc<SyncConfig>,
        db: &Arc<Database>,
        synchronizer: &Arc<Synchronizer>,
        emitter: &Arc<dyn SyncEventEmitter>,
        status: &Arc<RwLock<SyncStatus>>,
    ) {
        let report = match synchronizer.sync_with_retry(config.sync.max_attempts).await {
            Ok(CycleOutcome::Completed(report)) => report,
            Ok(CycleOutcome::Coalesced) | Ok(CycleOutcome::Offline) => return,
            Err(e) => {
                error!(error = %e, "Sync cycle failed");
                let mut s = status.write().await;
                s.last_error = Some(e.to_string());
                emitter.emit_error(&e.to_string(), e.is_retryable());
                return;
            }
        };

        let remaining = db.queue().count_pending().await.unwrap_or(0);

        {
            let mut s = status.write().await;
            s.pending_count = remaining;
            if report.synced > 0 {
                s.last_synced_at = Some(Utc::now().to_rfc3339());
            }
            s.last_error = report
                .exhausted
                .last()
                .map(|e| format!("Sale {} will retry: {}", e.id, e.last_error));
            emitter.emit_status(&s);
        }

        if report.attempted > 0 {
            emitter.emit_progress(report.synced, remaining);
        }

        // Exhaustion is a warning, not a crash: the sales stay queued.
        for exhausted in &report.exhausted {
            emitter.emit_error(
                &format!(
                    "Sale {} not yet synced ({}); will retry",
                    exhausted.id, exhausted.last_error
                ),
                true,
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkResult;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rackline_core::{Allocation, CellKey, SaleItem, TransactionStatus};
    use rackline_db::DbConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSink {
        submissions: AtomicUsize,
    }

    impl CountingSink {
        fn new() -> Arc<Self> {
            Arc::new(CountingSink {
                submissions: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.submissions.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TransactionSink for CountingSink {
        async fn submit(&self, _tx: &SaleTransaction) -> SinkResult<()> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingEmitter {
        statuses: AtomicUsize,
    }

    impl SyncEventEmitter for RecordingEmitter {
        fn emit_status(&self, _status: &SyncStatus) {
            self.statuses.fetch_add(1, Ordering::SeqCst);
        }
        fn emit_progress(&self, _synced: usize, _remaining: i64) {}
        fn emit_error(&self, _message: &str, _retryable: bool) {}
    }

    fn sample_tx(id: &str) -> SaleTransaction {
        SaleTransaction {
            id: id.to_string(),
            items: vec![SaleItem {
                variant_id: "VAR-1".to_string(),
                name_snapshot: "Hammer 16oz".to_string(),
                unit_price_cents: 24_900,
                quantity: 1,
                allocations: vec![Allocation {
                    cell: CellKey::new("Unit A", "Shelf 1", "Row A", 0),
                    quantity: 1,
                }],
                line_total_cents: 24_900,
            }],
            total_cents: 24_900,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            status: TransactionStatus::Pending,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_sale_enqueues_and_drains() {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let sink = CountingSink::new();
        let (_online_tx, online_rx) = watch::channel(true);

        let mut agent = SyncAgent::new(SyncConfig::default(), db.clone(), sink.clone(), online_rx);
        agent.start().await.unwrap();

        agent.submit_sale(&sample_tx("tx-1")).await.unwrap();
        settle().await;

        assert_eq!(sink.count(), 1);
        assert_eq!(db.queue().count_pending().await.unwrap(), 0);

        let status = agent.status().await;
        assert!(status.is_online);
        assert_eq!(status.pending_count, 0);
        assert!(status.last_synced_at.is_some());

        agent.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_drains_backlog() {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let sink = CountingSink::new();
        let (online_tx, online_rx) = watch::channel(false);

        // Sales made while offline pile up in the queue.
        db.queue().enqueue(&sample_tx("tx-1")).await.unwrap();
        db.queue().enqueue(&sample_tx("tx-2")).await.unwrap();

        let mut agent = SyncAgent::new(SyncConfig::default(), db.clone(), sink.clone(), online_rx);
        agent.start().await.unwrap();

        settle().await;
        // Offline: nothing submitted yet.
        assert_eq!(sink.count(), 0);

        // Connectivity restored: the false-to-true edge triggers a drain.
        online_tx.send(true).unwrap();
        settle().await;

        assert_eq!(sink.count(), 2);
        assert_eq!(db.queue().count_pending().await.unwrap(), 0);

        agent.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_poll_drains_existing_backlog() {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let sink = CountingSink::new();
        let (_online_tx, online_rx) = watch::channel(true);

        // Backlog from a previous run, already on disk at startup.
        db.queue().enqueue(&sample_tx("tx-old")).await.unwrap();

        let mut agent = SyncAgent::new(SyncConfig::default(), db.clone(), sink.clone(), online_rx);
        agent.start().await.unwrap();

        settle().await;

        assert_eq!(sink.count(), 1);
        assert_eq!(db.queue().count_pending().await.unwrap(), 0);

        agent.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_sync_never_submits() {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let sink = CountingSink::new();
        let (_online_tx, online_rx) = watch::channel(true);

        let mut config = SyncConfig::default();
        config.sync.enabled = false;

        let mut agent = SyncAgent::new(config, db.clone(), sink.clone(), online_rx);
        agent.start().await.unwrap();

        agent.submit_sale(&sample_tx("tx-1")).await.unwrap();
        settle().await;

        // Queued durably, but no drain loop is running.
        assert_eq!(sink.count(), 0);
        assert_eq!(db.queue().count_pending().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emitter_sees_status_updates() {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let sink = CountingSink::new();
        let (_online_tx, online_rx) = watch::channel(true);
        let emitter = Arc::new(RecordingEmitter {
            statuses: AtomicUsize::new(0),
        });

        let mut agent = SyncAgent::with_emitter(
            SyncConfig::default(),
            db.clone(),
            sink.clone(),
            online_rx,
            emitter.clone(),
        );
        agent.start().await.unwrap();

        agent.submit_sale(&sample_tx("tx-1")).await.unwrap();
        settle().await;

        assert!(emitter.statuses.load(Ordering::SeqCst) >= 1);

        agent.shutdown().await;
    }
}
