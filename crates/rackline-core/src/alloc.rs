//! # Allocation Engine
//!
//! Turns "I need N units of variant V" into a concrete, feasible
//! distribution across one or more storage cells.
//!
//! ## Allocation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Allocation Decision                            │
//! │                                                                     │
//! │  AllocationRequest { variant, qty: 12, cells: [50, 30, 10] }        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Any single cell with available >= 12?                              │
//! │       │                                                             │
//! │       ├── YES → BEST FIT: pick the SMALLEST sufficient cell         │
//! │       │         [50, 30, 10] + qty 12 → take all 12 from the 30     │
//! │       │         (keeps large cells whole for large future requests) │
//! │       │                                                             │
//! │       └── NO  → GREEDY: sort descending, drain largest first        │
//! │                 [5, 5, 5] + qty 12 → 5 + 5 + 2                      │
//! │                 (touches the fewest cells, so the inventory store   │
//! │                  gets the fewest write transactions)                │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  AllocationResult { allocations, fully_satisfied }                  │
//! │                                                                     │
//! │  Shortfall ([5, 5] + qty 20 → 10 allocated) is a NORMAL result      │
//! │  with fully_satisfied = false, never an error.                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine performs no I/O and holds no state between calls. It is a
//! pure function of its inputs, callable from any task without
//! synchronization. It never mutates cell quantities; it proposes a
//! distribution that the external inventory system applies transactionally.

use crate::error::{CoreError, CoreResult};
use crate::types::{Allocation, AllocationRequest, AllocationResult};

// =============================================================================
// Allocation
// =============================================================================

/// Resolves an allocation request into per-cell quantities.
///
/// ## Outcomes
/// - Full coverage from one cell (best fit) or several (greedy largest
///   first): `fully_satisfied = true`, allocations sum to the request.
/// - Not enough stock anywhere: the partial distribution is returned with
///   `fully_satisfied = false`. Whether to accept, prompt, or reject
///   belongs to the caller, not the engine.
/// - Empty candidate list: empty allocations, `fully_satisfied = false`
///   ("out of stock"), not an error.
///
/// ## Errors
/// Only for malformed input, which indicates a caller bug:
/// - [`CoreError::NonPositiveQuantity`] if `requested_quantity <= 0`
/// - [`CoreError::VariantMismatch`] if a candidate cell holds a different
///   variant than the request
///
/// ## Example
/// ```rust
/// use rackline_core::alloc::allocate;
/// use rackline_core::types::{AllocationRequest, CellKey, StorageCell};
///
/// let request = AllocationRequest {
///     variant_id: "VAR-1".into(),
///     requested_quantity: 8,
///     candidate_cells: vec![
///         StorageCell::new(CellKey::new("A", "S1", "R1", 0), "VAR-1", 20),
///         StorageCell::new(CellKey::new("A", "S1", "R1", 1), "VAR-1", 8),
///     ],
/// };
///
/// let result = allocate(&request).unwrap();
/// // Tightest sufficient fit: everything from the 8-unit cell.
/// assert!(result.fully_satisfied);
/// assert_eq!(result.allocations.len(), 1);
/// assert_eq!(result.allocations[0].cell.column_index, 1);
/// ```
pub fn allocate(request: &AllocationRequest) -> CoreResult<AllocationResult> {
    if request.requested_quantity <= 0 {
        return Err(CoreError::NonPositiveQuantity {
            requested: request.requested_quantity,
        });
    }

    for cell in &request.candidate_cells {
        if cell.variant_id != request.variant_id {
            return Err(CoreError::VariantMismatch {
                expected: request.variant_id.clone(),
                found: cell.variant_id.clone(),
                cell: cell.key.to_string(),
            });
        }
    }

    // Cells with nothing available can never contribute; drop them up front
    // so they don't show up as zero-quantity allocations.
    let candidates: Vec<_> = request
        .candidate_cells
        .iter()
        .filter(|c| c.available_quantity > 0)
        .collect();

    if candidates.is_empty() {
        return Ok(AllocationResult::unsatisfied());
    }

    let requested = request.requested_quantity;

    // Fast path: best fit. Among cells that can cover the whole request,
    // take the one with the smallest sufficient quantity. min_by_key keeps
    // the first such cell on ties, so candidate order is the tie-breaker.
    if let Some(best) = candidates
        .iter()
        .filter(|c| c.available_quantity >= requested)
        .min_by_key(|c| c.available_quantity)
    {
        return Ok(AllocationResult {
            allocations: vec![Allocation {
                cell: best.key.clone(),
                quantity: requested,
            }],
            fully_satisfied: true,
        });
    }

    // Multi-cell path: no single cell suffices. Drain the largest cells
    // first to touch as few cells as possible. Stable sort, so equal-sized
    // cells are consumed in candidate order.
    let mut sorted = candidates;
    sorted.sort_by(|a, b| b.available_quantity.cmp(&a.available_quantity));

    let mut remaining = requested;
    let mut allocations = Vec::new();

    for cell in sorted {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(cell.available_quantity);
        allocations.push(Allocation {
            cell: cell.key.clone(),
            quantity: take,
        });
        remaining -= take;
    }

    Ok(AllocationResult {
        allocations,
        fully_satisfied: remaining == 0,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellKey, StorageCell};

    fn cell(col: u32, qty: i64) -> StorageCell {
        StorageCell::new(CellKey::new("Unit A", "Shelf 1", "Row A", col), "VAR-1", qty)
    }

    fn request(qty: i64, cells: Vec<StorageCell>) -> AllocationRequest {
        AllocationRequest {
            variant_id: "VAR-1".to_string(),
            requested_quantity: qty,
            candidate_cells: cells,
        }
    }

    #[test]
    fn test_best_fit_prefers_smallest_sufficient_cell() {
        // Candidates [50, 30, 10], request 25: the 30 is the tightest fit.
        let result = allocate(&request(25, vec![cell(0, 50), cell(1, 30), cell(2, 10)])).unwrap();

        assert!(result.fully_satisfied);
        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.allocations[0].cell.column_index, 1);
        assert_eq!(result.allocations[0].quantity, 25);
    }

    #[test]
    fn test_best_fit_over_first_fit() {
        // [20, 8] with request 8: the exact-fit 8 wins over the larger 20
        // even though the 20 comes first.
        let result = allocate(&request(8, vec![cell(0, 20), cell(1, 8)])).unwrap();

        assert!(result.fully_satisfied);
        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.allocations[0].cell.column_index, 1);
        assert_eq!(result.allocations[0].quantity, 8);
    }

    #[test]
    fn test_greedy_multi_cell_split() {
        // [5, 5, 5] with request 12: two full cells plus a partial third.
        let result = allocate(&request(12, vec![cell(0, 5), cell(1, 5), cell(2, 5)])).unwrap();

        assert!(result.fully_satisfied);
        assert_eq!(result.total_allocated(), 12);
        let quantities: Vec<_> = result.allocations.iter().map(|a| a.quantity).collect();
        assert_eq!(quantities, vec![5, 5, 2]);
        // Equal-sized cells are consumed in candidate order.
        let cols: Vec<_> = result
            .allocations
            .iter()
            .map(|a| a.cell.column_index)
            .collect();
        assert_eq!(cols, vec![0, 1, 2]);
    }

    #[test]
    fn test_greedy_drains_largest_first() {
        let result = allocate(&request(12, vec![cell(0, 3), cell(1, 9), cell(2, 6)])).unwrap();

        assert!(result.fully_satisfied);
        assert_eq!(result.total_allocated(), 12);
        // Largest cell first (9), then the 6 covers the remaining 3.
        assert_eq!(result.allocations[0].cell.column_index, 1);
        assert_eq!(result.allocations[0].quantity, 9);
        assert_eq!(result.allocations[1].cell.column_index, 2);
        assert_eq!(result.allocations[1].quantity, 3);
        assert_eq!(result.allocations.len(), 2);
    }

    #[test]
    fn test_shortfall_returns_partial() {
        // [5, 5] with request 20: everything is allocated, nothing covers.
        let result = allocate(&request(20, vec![cell(0, 5), cell(1, 5)])).unwrap();

        assert!(!result.fully_satisfied);
        assert_eq!(result.total_allocated(), 10);
        assert_eq!(result.shortfall(20), 10);
    }

    #[test]
    fn test_conservation_never_over_allocates() {
        let cells = vec![cell(0, 7), cell(1, 3), cell(2, 11)];
        for requested in 1..=30 {
            let result = allocate(&request(requested, cells.clone())).unwrap();
            let total = result.total_allocated();
            assert!(total <= requested);
            if result.fully_satisfied {
                assert_eq!(total, requested);
            }
            // No allocation exceeds its cell's availability.
            for alloc in &result.allocations {
                let cell = cells.iter().find(|c| c.key == alloc.cell).unwrap();
                assert!(alloc.quantity <= cell.available_quantity);
                assert!(alloc.quantity > 0);
            }
        }
    }

    #[test]
    fn test_empty_candidates_is_out_of_stock_not_error() {
        let result = allocate(&request(5, vec![])).unwrap();
        assert!(!result.fully_satisfied);
        assert!(result.allocations.is_empty());
    }

    #[test]
    fn test_empty_cells_are_skipped() {
        let result = allocate(&request(4, vec![cell(0, 0), cell(1, 4), cell(2, 0)])).unwrap();
        assert!(result.fully_satisfied);
        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.allocations[0].cell.column_index, 1);
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        assert!(matches!(
            allocate(&request(0, vec![cell(0, 5)])),
            Err(CoreError::NonPositiveQuantity { requested: 0 })
        ));
        assert!(matches!(
            allocate(&request(-3, vec![cell(0, 5)])),
            Err(CoreError::NonPositiveQuantity { requested: -3 })
        ));
    }

    #[test]
    fn test_variant_mismatch_rejected() {
        let mut foreign = cell(1, 10);
        foreign.variant_id = "VAR-2".to_string();

        let err = allocate(&request(5, vec![cell(0, 2), foreign])).unwrap_err();
        match err {
            CoreError::VariantMismatch {
                expected, found, ..
            } => {
                assert_eq!(expected, "VAR-1");
                assert_eq!(found, "VAR-2");
            }
            other => panic!("expected VariantMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_total_capacity_is_fully_satisfied() {
        let result = allocate(&request(15, vec![cell(0, 5), cell(1, 5), cell(2, 5)])).unwrap();
        assert!(result.fully_satisfied);
        assert_eq!(result.total_allocated(), 15);
        assert_eq!(result.allocations.len(), 3);
    }
}
