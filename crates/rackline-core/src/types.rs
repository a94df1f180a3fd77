//! # Domain Types
//!
//! Core domain types used throughout Rackline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌─────────────────┐  ┌───────────────────┐  ┌──────────────────┐   │
//! │  │   StorageCell   │  │ AllocationRequest │  │ AllocationResult │   │
//! │  │  ─────────────  │  │  ───────────────  │  │  ──────────────  │   │
//! │  │  key (CellKey)  │  │  variant_id       │  │  allocations     │   │
//! │  │  variant_id     │  │  requested_qty    │  │  fully_satisfied │   │
//! │  │  available_qty  │  │  candidate_cells  │  │                  │   │
//! │  └─────────────────┘  └───────────────────┘  └──────────────────┘   │
//! │                                                                     │
//! │  ┌─────────────────┐  ┌───────────────────┐  ┌──────────────────┐   │
//! │  │    CartLine     │  │  SaleTransaction  │  │TransactionStatus │   │
//! │  │  ─────────────  │  │  ───────────────  │  │  ──────────────  │   │
//! │  │  variant_id     │  │  id (UUID)        │  │  Pending         │   │
//! │  │  quantity       │  │  items            │  │  Synced          │   │
//! │  │  unit_price     │  │  total_cents      │  │  Failed          │   │
//! │  └─────────────────┘  └───────────────────┘  └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A cell is one addressable shelf/row/column slot; it holds at most one
//! variant's stock at a time. All field normalization (string column
//! indexes, nested documents) happens at the data-access boundary; by the
//! time a `StorageCell` exists, its fields are canonical.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cell Identity
// =============================================================================

/// The 4-tuple identity of a storage cell.
///
/// (unit, shelf, row, column) uniquely addresses one slot in the warehouse
/// map. This is the key inventory writes are applied against, so it stays
/// stable across allocation, transaction assembly, and sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CellKey {
    /// Storage unit identifier (e.g., "Unit A").
    pub unit_id: String,

    /// Shelf name within the unit.
    pub shelf_name: String,

    /// Row name within the shelf.
    pub row_name: String,

    /// Zero-based column index within the row.
    pub column_index: u32,
}

impl CellKey {
    /// Creates a cell key from its four components.
    pub fn new(
        unit_id: impl Into<String>,
        shelf_name: impl Into<String>,
        row_name: impl Into<String>,
        column_index: u32,
    ) -> Self {
        CellKey {
            unit_id: unit_id.into(),
            shelf_name: shelf_name.into(),
            row_name: row_name.into(),
            column_index,
        }
    }
}

/// Human-readable path, shown on pick lists and receipts.
impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} - {} - Col {}",
            self.unit_id, self.shelf_name, self.row_name, self.column_index
        )
    }
}

// =============================================================================
// Storage Cell
// =============================================================================

/// One addressable unit-of-storage slot and its current stock.
///
/// Read-only from the allocation engine's perspective: the engine proposes
/// allocations against `available_quantity`, and the external inventory
/// system applies them transactionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StorageCell {
    /// Cell identity.
    pub key: CellKey,

    /// The variant stored in this cell.
    pub variant_id: String,

    /// Units of the variant currently available here.
    pub available_quantity: i64,
}

impl StorageCell {
    /// Creates a storage cell.
    pub fn new(key: CellKey, variant_id: impl Into<String>, available_quantity: i64) -> Self {
        StorageCell {
            key,
            variant_id: variant_id.into(),
            available_quantity,
        }
    }
}

// =============================================================================
// Allocation Request / Result
// =============================================================================

/// Input to the allocation engine: "I need N units of variant V".
///
/// `candidate_cells` is an ordered sequence; order is the tie-breaker when
/// two cells hold the same quantity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocationRequest {
    /// The variant being requested.
    pub variant_id: String,

    /// Units needed. Must be positive.
    pub requested_quantity: i64,

    /// Cells holding this variant, as resolved by the data-access layer.
    pub candidate_cells: Vec<StorageCell>,
}

/// An assignment of quantity to one specific cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Allocation {
    /// The cell the quantity is drawn from.
    pub cell: CellKey,

    /// Units drawn from this cell. Always positive; a cell contributing
    /// zero is omitted from the result entirely.
    pub quantity: i64,
}

/// Output of the allocation engine.
///
/// The sum of allocated quantities never exceeds the requested quantity,
/// and equals it exactly when `fully_satisfied` is true. A shortfall is a
/// normal outcome, not an error: callers decide whether to accept the
/// partial distribution, prompt, or reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocationResult {
    /// Per-cell allocations, in the order cells were consumed.
    pub allocations: Vec<Allocation>,

    /// Whether the full requested quantity was covered.
    pub fully_satisfied: bool,
}

impl AllocationResult {
    /// An empty, unsatisfied result ("out of stock").
    pub fn unsatisfied() -> Self {
        AllocationResult {
            allocations: Vec::new(),
            fully_satisfied: false,
        }
    }

    /// Total units allocated across all cells.
    pub fn total_allocated(&self) -> i64 {
        self.allocations.iter().map(|a| a.quantity).sum()
    }

    /// Units still uncovered for a given requested quantity.
    pub fn shortfall(&self, requested_quantity: i64) -> i64 {
        (requested_quantity - self.total_allocated()).max(0)
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One line of the checkout cart, with product data frozen at sale time.
///
/// Snapshot pattern: the name and unit price are copied out of the catalog
/// when the line is created, so later catalog edits don't rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    /// The variant being sold.
    pub variant_id: String,

    /// Product/variant name at time of sale (frozen).
    pub name: String,

    /// Units requested by the cashier.
    pub quantity: i64,

    /// Unit price in centavos at time of sale (frozen).
    pub unit_price_cents: i64,
}

impl CartLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// The sync status of a sale transaction.
///
/// `pending → synced` is terminal (the record leaves queue ownership);
/// `pending ⇄ failed` is the retry loop. Never `synced → anything`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Persisted locally, awaiting remote acceptance.
    Pending,
    /// Confirmed by the remote store. Terminal.
    Synced,
    /// Retries exhausted for now; still queued for future attempts.
    Failed,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Synced => write!(f, "synced"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Sale Transaction
// =============================================================================

/// A line item in a completed sale, with its cell-level allocations.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    /// The variant sold.
    pub variant_id: String,

    /// Name at time of sale (frozen).
    pub name_snapshot: String,

    /// Unit price in centavos at time of sale (frozen).
    pub unit_price_cents: i64,

    /// Units sold (sum of allocation quantities).
    pub quantity: i64,

    /// Which cells the quantity was drawn from.
    pub allocations: Vec<Allocation>,

    /// unit_price × quantity, in centavos.
    pub line_total_cents: i64,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A sale, assembled at checkout and owned by the local queue until synced.
///
/// `id` is generated locally at build time and never regenerated on retry:
/// it is the idempotency key the queue and the remote store both key off
/// of, so a retransmitted transaction is recognized as a duplicate rather
/// than double-counted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTransaction {
    /// Locally generated UUID v4, stable across retries.
    pub id: String,

    /// Line items with their allocations.
    pub items: Vec<SaleItem>,

    /// Grand total in centavos, recomputed from the items at build time.
    pub total_cents: i64,

    /// When the sale was made.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Sync status.
    pub status: TransactionStatus,
}

impl SaleTransaction {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Total units sold across all items.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Offline Catalog Cache
// =============================================================================

/// A variant row in the local offline catalog cache.
///
/// Mirrors the remote catalog so the POS keeps selling while offline.
/// Replaced wholesale on each successful catalog refresh.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CachedVariant {
    /// Variant identifier.
    pub variant_id: String,

    /// Parent product identifier.
    pub product_id: String,

    /// Display name (product + size/spec).
    pub name: String,

    /// Unit price in centavos.
    pub unit_price_cents: i64,

    /// When this row was last refreshed from the remote catalog.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Locally tracked stock level for one variant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    /// Variant identifier.
    pub variant_id: String,

    /// Units believed available across all cells.
    pub quantity: i64,

    /// When this level was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
