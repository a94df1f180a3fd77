//! # Sale Transaction Assembly
//!
//! Combines allocated cart lines plus pricing into a single atomic
//! [`SaleTransaction`] record ready for the local queue.
//!
//! ## Assembly Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Assembly                               │
//! │                                                                     │
//! │  CartLine ──► allocate() ──► AllocationResult                       │
//! │       │                           │                                 │
//! │       └──────────┬────────────────┘                                 │
//! │                  ▼                                                  │
//! │  TransactionBuilder::add_line(line, allocation)                     │
//! │       │                                                             │
//! │       ├── allocation covers line quantity? ──► SaleItem             │
//! │       │                                                             │
//! │       └── uncovered ──► CoreError::UnsatisfiedLine (whole build     │
//! │                         fails; nothing reaches the queue)           │
//! │                  │                                                  │
//! │                  ▼                                                  │
//! │  build() ──► SaleTransaction { id: UUID v4, total: recomputed }     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The grand total is always recomputed from unit price × allocated
//! quantity rather than trusted from the caller, which guards against
//! tampering and UI arithmetic bugs. The transaction id is generated once
//! here and never regenerated on retry: it is the idempotency key.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{AllocationResult, CartLine, SaleItem, SaleTransaction, TransactionStatus};
use crate::validation;

// =============================================================================
// Transaction Builder
// =============================================================================

/// Assembles cart lines and their allocations into a sale transaction.
///
/// ## Example
/// ```rust
/// use rackline_core::alloc::allocate;
/// use rackline_core::transaction::TransactionBuilder;
/// use rackline_core::types::{AllocationRequest, CartLine, CellKey, StorageCell};
///
/// let line = CartLine {
///     variant_id: "VAR-1".into(),
///     name: "Hammer 16oz".into(),
///     quantity: 3,
///     unit_price_cents: 24_900,
/// };
/// let allocation = allocate(&AllocationRequest {
///     variant_id: line.variant_id.clone(),
///     requested_quantity: line.quantity,
///     candidate_cells: vec![StorageCell::new(
///         CellKey::new("Unit A", "Shelf 1", "Row A", 0),
///         "VAR-1",
///         10,
///     )],
/// })
/// .unwrap();
///
/// let mut builder = TransactionBuilder::new();
/// builder.add_line(&line, &allocation).unwrap();
/// let tx = builder.build().unwrap();
///
/// assert_eq!(tx.total_cents, 74_700);
/// assert_eq!(tx.items.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    items: Vec<SaleItem>,
}

impl TransactionBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        TransactionBuilder { items: Vec::new() }
    }

    /// Adds a cart line whose allocation must cover it exactly.
    ///
    /// ## Errors
    /// - [`CoreError::UnsatisfiedLine`] if the allocation is not fully
    ///   satisfied or its total differs from the line quantity.
    /// - [`CoreError::Validation`] if the line itself is malformed.
    pub fn add_line(
        &mut self,
        line: &CartLine,
        allocation: &AllocationResult,
    ) -> CoreResult<&mut Self> {
        validation::validate_cart_line(line)?;

        let allocated = allocation.total_allocated();
        if !allocation.fully_satisfied || allocated != line.quantity {
            return Err(CoreError::UnsatisfiedLine {
                variant_id: line.variant_id.clone(),
                requested: line.quantity,
                allocated,
            });
        }

        self.push_item(line, allocation, allocated);
        Ok(self)
    }

    /// Adds a cart line with an explicitly accepted partial allocation.
    ///
    /// The caller has already confirmed (e.g. with the cashier) that a
    /// shorted quantity is acceptable. The sale item records the allocated
    /// quantity, not the originally requested one, so totals stay honest.
    ///
    /// ## Errors
    /// - [`CoreError::UnsatisfiedLine`] if the allocation is empty;
    ///   accepting a partial still requires something to sell.
    /// - [`CoreError::Validation`] if the line itself is malformed.
    pub fn add_line_partial(
        &mut self,
        line: &CartLine,
        allocation: &AllocationResult,
    ) -> CoreResult<&mut Self> {
        validation::validate_cart_line(line)?;

        let allocated = allocation.total_allocated();
        if allocated == 0 {
            return Err(CoreError::UnsatisfiedLine {
                variant_id: line.variant_id.clone(),
                requested: line.quantity,
                allocated: 0,
            });
        }

        self.push_item(line, allocation, allocated);
        Ok(self)
    }

    /// Number of lines added so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no lines have been added yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finalizes the transaction.
    ///
    /// Generates the transaction id (UUID v4) and recomputes the grand
    /// total from the items. Consumes the builder: a transaction is
    /// assembled exactly once, then owned by the queue.
    ///
    /// ## Errors
    /// - [`CoreError::EmptyTransaction`] if no lines were added.
    pub fn build(self) -> CoreResult<SaleTransaction> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyTransaction);
        }

        let total_cents = self.items.iter().map(|i| i.line_total_cents).sum();

        Ok(SaleTransaction {
            id: Uuid::new_v4().to_string(),
            items: self.items,
            total_cents,
            created_at: Utc::now(),
            status: TransactionStatus::Pending,
        })
    }

    fn push_item(&mut self, line: &CartLine, allocation: &AllocationResult, quantity: i64) {
        let line_total_cents = line.unit_price().multiply_quantity(quantity).cents();
        self.items.push(SaleItem {
            variant_id: line.variant_id.clone(),
            name_snapshot: line.name.clone(),
            unit_price_cents: line.unit_price_cents,
            quantity,
            allocations: allocation.allocations.clone(),
            line_total_cents,
        });
    }
}

// =============================================================================
// Convenience Entry Point
// =============================================================================

/// Builds a transaction from fully satisfied cart lines.
///
/// Every line must come with an allocation covering it exactly; the first
/// uncovered line fails the whole build. Use [`TransactionBuilder`]
/// directly when some lines are explicitly accepted as partial.
pub fn build_transaction(
    lines: &[(CartLine, AllocationResult)],
) -> CoreResult<SaleTransaction> {
    let mut builder = TransactionBuilder::new();
    for (line, allocation) in lines {
        builder.add_line(line, allocation)?;
    }
    builder.build()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Allocation, CellKey};

    fn line(variant: &str, qty: i64, price: i64) -> CartLine {
        CartLine {
            variant_id: variant.to_string(),
            name: format!("{variant} name"),
            quantity: qty,
            unit_price_cents: price,
        }
    }

    fn covering_allocation(qty: i64) -> AllocationResult {
        AllocationResult {
            allocations: vec![Allocation {
                cell: CellKey::new("Unit A", "Shelf 1", "Row A", 0),
                quantity: qty,
            }],
            fully_satisfied: true,
        }
    }

    #[test]
    fn test_total_recomputed_from_items() {
        let tx = build_transaction(&[
            (line("VAR-1", 3, 1000), covering_allocation(3)),
            (line("VAR-2", 2, 2550), covering_allocation(2)),
        ])
        .unwrap();

        // 3×10.00 + 2×25.50 = 81.00
        assert_eq!(tx.total_cents, 8100);
        assert_eq!(tx.items.len(), 2);
        assert_eq!(tx.items[0].line_total_cents, 3000);
        assert_eq!(tx.items[1].line_total_cents, 5100);
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[test]
    fn test_id_is_generated_once_per_build() {
        let tx = build_transaction(&[(line("VAR-1", 1, 100), covering_allocation(1))]).unwrap();
        assert!(uuid::Uuid::parse_str(&tx.id).is_ok());

        // A distinct build gets a distinct id; within one transaction the
        // id never changes: it is the retry idempotency key.
        let other = build_transaction(&[(line("VAR-1", 1, 100), covering_allocation(1))]).unwrap();
        assert_ne!(tx.id, other.id);
    }

    #[test]
    fn test_unsatisfied_line_fails_whole_build() {
        let partial = AllocationResult {
            allocations: vec![Allocation {
                cell: CellKey::new("Unit A", "Shelf 1", "Row A", 0),
                quantity: 2,
            }],
            fully_satisfied: false,
        };

        let err = build_transaction(&[
            (line("VAR-1", 3, 1000), covering_allocation(3)),
            (line("VAR-2", 5, 500), partial),
        ])
        .unwrap_err();

        match err {
            CoreError::UnsatisfiedLine {
                variant_id,
                requested,
                allocated,
            } => {
                assert_eq!(variant_id, "VAR-2");
                assert_eq!(requested, 5);
                assert_eq!(allocated, 2);
            }
            other => panic!("expected UnsatisfiedLine, got {other:?}"),
        }
    }

    #[test]
    fn test_quantity_mismatch_rejected_even_if_flagged_satisfied() {
        // An allocation claiming satisfaction but covering the wrong
        // quantity is still refused: the sums must agree.
        let wrong = AllocationResult {
            allocations: vec![Allocation {
                cell: CellKey::new("Unit A", "Shelf 1", "Row A", 0),
                quantity: 2,
            }],
            fully_satisfied: true,
        };

        let err = build_transaction(&[(line("VAR-1", 3, 1000), wrong)]).unwrap_err();
        assert!(matches!(err, CoreError::UnsatisfiedLine { .. }));
    }

    #[test]
    fn test_partial_acceptance_records_allocated_quantity() {
        let partial = AllocationResult {
            allocations: vec![Allocation {
                cell: CellKey::new("Unit A", "Shelf 1", "Row A", 0),
                quantity: 2,
            }],
            fully_satisfied: false,
        };

        let mut builder = TransactionBuilder::new();
        builder
            .add_line_partial(&line("VAR-1", 5, 1000), &partial)
            .unwrap();
        let tx = builder.build().unwrap();

        // The shorted quantity is what gets sold and totaled.
        assert_eq!(tx.items[0].quantity, 2);
        assert_eq!(tx.total_cents, 2000);
    }

    #[test]
    fn test_partial_acceptance_requires_nonempty_allocation() {
        let mut builder = TransactionBuilder::new();
        let err = builder
            .add_line_partial(&line("VAR-1", 5, 1000), &AllocationResult::unsatisfied())
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsatisfiedLine { allocated: 0, .. }));
    }

    #[test]
    fn test_empty_transaction_rejected() {
        let err = TransactionBuilder::new().build().unwrap_err();
        assert!(matches!(err, CoreError::EmptyTransaction));
    }

    #[test]
    fn test_malformed_line_rejected() {
        let mut builder = TransactionBuilder::new();
        let bad = CartLine {
            variant_id: String::new(),
            name: "no variant".to_string(),
            quantity: 1,
            unit_price_cents: 100,
        };
        let err = builder.add_line(&bad, &covering_allocation(1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
