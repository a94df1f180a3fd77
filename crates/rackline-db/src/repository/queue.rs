//! # Transaction Queue Repository
//!
//! The durable local queue of sale transactions pending synchronization.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  Offline Sale Queue Flow                            │
//! │                                                                     │
//! │  CHECKOUT (always, online or not)                                   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  enqueue(tx) ── INSERT status='pending' ── COMMIT (fsynced)         │
//! │       │                                                             │
//! │       │   The sale now survives crash, restart, power loss.        │
//! │       ▼                                                             │
//! │  ┌──────────────────────────────────────────────────────────────┐   │
//! │  │              SYNCHRONIZER (rackline-sync)                    │   │
//! │  │                                                              │   │
//! │  │  1. list_pending(): snapshot, oldest first                   │   │
//! │  │  2. submit each to the remote sink (id = idempotency key)    │   │
//! │  │  3. accepted  → dequeue(id)                                  │   │
//! │  │  4. exhausted → mark_failed(id, err): entry stays queued     │   │
//! │  └──────────────────────────────────────────────────────────────┘   │
//! │                                                                     │
//! │  INVARIANT: a transaction is in this table iff its status is        │
//! │  pending or failed. Synced transactions are removed, never stored.  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use rackline_core::{SaleTransaction, TransactionStatus};

// =============================================================================
// Queue Row
// =============================================================================

/// One row of the pending transaction queue.
///
/// The full [`SaleTransaction`] lives in `payload`; id, status, total and
/// timestamps are denormalized for querying without deserialization.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueuedTransaction {
    /// Transaction id (the idempotency key).
    pub id: String,

    /// `pending` or `failed`; `synced` rows don't exist, they are removed.
    pub status: TransactionStatus,

    /// Full SaleTransaction serialized as JSON.
    pub payload: String,

    /// Grand total in centavos.
    pub total_cents: i64,

    /// Number of submission attempts so far.
    pub attempts: i64,

    /// Last submission error, if any.
    pub last_error: Option<String>,

    /// When the sale was made (drain order).
    pub created_at: DateTime<Utc>,

    /// When submission was last attempted.
    pub attempted_at: Option<DateTime<Utc>>,
}

impl QueuedTransaction {
    /// Decodes the embedded sale transaction, with the row's status.
    pub fn transaction(&self) -> DbResult<SaleTransaction> {
        let mut tx: SaleTransaction =
            serde_json::from_str(&self.payload).map_err(|e| DbError::PayloadCorrupt {
                id: self.id.clone(),
                reason: e.to_string(),
            })?;
        // The row is authoritative for status; the payload keeps whatever
        // status the transaction had when enqueued.
        tx.status = self.status;
        Ok(tx)
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the pending transaction queue.
#[derive(Debug, Clone)]
pub struct TransactionQueueRepository {
    pool: SqlitePool,
}

impl TransactionQueueRepository {
    /// Creates a new TransactionQueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionQueueRepository { pool }
    }

    /// Persists a transaction with status `pending`.
    ///
    /// The insert is committed (and, with `synchronous=FULL`, flushed)
    /// before this returns: success means the sale survives a crash.
    ///
    /// Idempotent on id: re-enqueueing an already-queued transaction is a
    /// no-op, so a checkout retried after a crash-before-ack cannot
    /// double-queue a sale.
    pub async fn enqueue(&self, tx: &SaleTransaction) -> DbResult<()> {
        let payload = serde_json::to_string(tx)
            .map_err(|e| DbError::Internal(format!("Failed to encode transaction: {e}")))?;

        debug!(id = %tx.id, total_cents = tx.total_cents, "Enqueueing transaction");

        sqlx::query(
            r#"
            INSERT INTO pending_transactions (
                id, status, payload, total_cents, attempts, last_error,
                created_at, attempted_at
            ) VALUES (?1, 'pending', ?2, ?3, 0, NULL, ?4, NULL)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&tx.id)
        .bind(&payload)
        .bind(tx.total_cents)
        .bind(tx.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes a transaction by id after remote confirmation.
    ///
    /// Idempotent: removing an absent id is a no-op, not an error. Returns
    /// whether a row was actually removed.
    pub async fn dequeue(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM pending_transactions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            debug!(id = %id, "Dequeued transaction");
        }
        Ok(removed)
    }

    /// Returns all queued transactions (`pending` or `failed`), oldest
    /// sale first.
    ///
    /// Oldest-first preserves sale ordering when the synchronizer later
    /// reconciles inventory against the remote store.
    pub async fn list_pending(&self) -> DbResult<Vec<SaleTransaction>> {
        let rows = self.list_rows().await?;
        rows.iter().map(QueuedTransaction::transaction).collect()
    }

    /// Returns the raw queue rows, oldest first (attempts, errors and all).
    pub async fn list_rows(&self) -> DbResult<Vec<QueuedTransaction>> {
        let rows: Vec<QueuedTransaction> = sqlx::query_as(
            r#"
            SELECT id, status, payload, total_cents, attempts, last_error,
                   created_at, attempted_at
            FROM pending_transactions
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Looks up a single queued transaction by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<QueuedTransaction>> {
        let row: Option<QueuedTransaction> = sqlx::query_as(
            r#"
            SELECT id, status, payload, total_cents, attempts, last_error,
                   created_at, attempted_at
            FROM pending_transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Transitions a transaction to `failed` without removing it.
    ///
    /// "Given up for now", not "gone": the entry stays eligible for future
    /// manual or connectivity-triggered retries.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE pending_transactions SET
                status = 'failed',
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Re-arms a `failed` transaction to `pending` when a new cycle picks
    /// it up again.
    pub async fn mark_pending(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE pending_transactions SET
                status = 'pending',
                attempted_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts queued transactions (pending and failed).
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;
    use rackline_core::{Allocation, CellKey, SaleItem};

    fn sample_tx(id: &str, created_at: DateTime<Utc>) -> SaleTransaction {
        SaleTransaction {
            id: id.to_string(),
            items: vec![SaleItem {
                variant_id: "VAR-1".to_string(),
                name_snapshot: "Hammer 16oz".to_string(),
                unit_price_cents: 24_900,
                quantity: 2,
                allocations: vec![Allocation {
                    cell: CellKey::new("Unit A", "Shelf 1", "Row A", 0),
                    quantity: 2,
                }],
                line_total_cents: 49_800,
            }],
            total_cents: 49_800,
            created_at,
            status: TransactionStatus::Pending,
        }
    }

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, secs).unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_then_list_pending() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        queue.enqueue(&sample_tx("tx-1", at(0))).await.unwrap();

        let pending = queue.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "tx-1");
        assert_eq!(pending[0].status, TransactionStatus::Pending);
        assert_eq!(pending[0].total_cents, 49_800);
        assert_eq!(pending[0].items.len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_same_id_is_noop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        let tx = sample_tx("tx-1", at(0));
        queue.enqueue(&tx).await.unwrap();
        queue.enqueue(&tx).await.unwrap();

        assert_eq!(queue.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dequeue_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        queue.enqueue(&sample_tx("tx-1", at(0))).await.unwrap();

        assert!(queue.dequeue("tx-1").await.unwrap());
        // Absent id: no-op, not an error.
        assert!(!queue.dequeue("tx-1").await.unwrap());
        assert!(!queue.dequeue("never-existed").await.unwrap());

        assert_eq!(queue.count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_pending_ordered_oldest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        // Enqueue out of chronological order.
        queue.enqueue(&sample_tx("tx-b", at(30))).await.unwrap();
        queue.enqueue(&sample_tx("tx-a", at(10))).await.unwrap();
        queue.enqueue(&sample_tx("tx-c", at(50))).await.unwrap();

        let pending = queue.list_pending().await.unwrap();
        let ids: Vec<_> = pending.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["tx-a", "tx-b", "tx-c"]);
    }

    #[tokio::test]
    async fn test_mark_failed_keeps_entry_queued() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        queue.enqueue(&sample_tx("tx-1", at(0))).await.unwrap();
        queue.mark_failed("tx-1", "connection refused").await.unwrap();

        let pending = queue.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, TransactionStatus::Failed);

        let row = queue.get("tx-1").await.unwrap().unwrap();
        assert_eq!(row.attempts, 1);
        assert_eq!(row.last_error.as_deref(), Some("connection refused"));
        assert!(row.attempted_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_pending_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        queue.enqueue(&sample_tx("tx-1", at(0))).await.unwrap();
        queue.mark_failed("tx-1", "timeout").await.unwrap();
        queue.mark_pending("tx-1").await.unwrap();

        let row = queue.get("tx-1").await.unwrap().unwrap();
        assert_eq!(row.status, TransactionStatus::Pending);
        // Attempt history survives the round trip.
        assert_eq!(row.attempts, 1);
    }

    #[tokio::test]
    async fn test_queue_survives_reopen() {
        // Durability across a simulated process restart: write through a
        // file-backed database, drop the handle, reopen, and the sale is
        // still queued.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rackline.db");

        {
            let db = Database::new(DbConfig::new(&path)).await.unwrap();
            db.queue().enqueue(&sample_tx("tx-1", at(0))).await.unwrap();
            db.close().await;
        }

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let pending = db.queue().list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "tx-1");
        assert_eq!(pending[0].items[0].allocations[0].quantity, 2);
    }
}
