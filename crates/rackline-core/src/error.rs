//! # Error Types
//!
//! Domain-specific error types for rackline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  rackline-core errors (this file)                                   │
//! │  ├── CoreError        - Allocation / transaction-build failures     │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  rackline-db errors (separate crate)                                │
//! │  └── DbError          - Queue / cache storage failures              │
//! │                                                                     │
//! │  rackline-sync errors (separate crate)                              │
//! │  └── SyncError        - Submission / retry-exhaustion failures      │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → DbError/SyncError → Frontend   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Insufficient stock is deliberately NOT in this enum. A shortfall is a
//! normal outcome of allocation, reported as
//! `AllocationResult { fully_satisfied: false }`, and the caller decides
//! what to do with it. `CoreError` covers only conditions that indicate a
//! bug in the calling code.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Allocation and transaction-assembly errors.
///
/// Every variant here is a caller bug (malformed request, unsatisfied cart
/// line submitted anyway). These are raised synchronously and are not meant
/// to be caught-and-ignored.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Allocation was requested for a zero or negative quantity.
    #[error("Requested quantity must be positive, got {requested}")]
    NonPositiveQuantity { requested: i64 },

    /// A candidate cell holds a different variant than the request.
    ///
    /// Normalization is supposed to happen at the data-access boundary;
    /// a mismatched candidate reaching the engine means that boundary
    /// let an unfiltered cell through.
    #[error("Cell {cell} holds variant {found}, request is for variant {expected}")]
    VariantMismatch {
        expected: String,
        found: String,
        cell: String,
    },

    /// A cart line was submitted without an allocation covering it.
    ///
    /// A transaction with missing allocations would corrupt downstream
    /// inventory accounting, so the whole build fails naming the line.
    #[error(
        "Cart line for variant {variant_id} is not covered: requested {requested}, allocated {allocated}"
    )]
    UnsatisfiedLine {
        variant_id: String,
        requested: i64,
        allocated: i64,
    },

    /// Attempted to build a transaction with no items.
    #[error("Transaction must contain at least one item")]
    EmptyTransaction,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller-supplied values don't meet requirements.
/// Used for early validation before allocation or assembly runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnsatisfiedLine {
            variant_id: "VAR-001".to_string(),
            requested: 12,
            allocated: 10,
        };
        assert_eq!(
            err.to_string(),
            "Cart line for variant VAR-001 is not covered: requested 12, allocated 10"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "variant_id".to_string(),
        };
        assert_eq!(err.to_string(), "variant_id is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "variant_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
