//! # rackline-core: Pure Business Logic for Rackline
//!
//! This crate is the heart of Rackline. It contains all business logic as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Rackline Architecture                          │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                    POS Front End (React)                      │  │
//! │  │   Catalog UI ──► Cart UI ──► Location Picker ──► Receipt      │  │
//! │  └────────────────────────────┬──────────────────────────────────┘  │
//! │                               │                                     │
//! │  ┌────────────────────────────▼──────────────────────────────────┐  │
//! │  │              ★ rackline-core (THIS CRATE) ★                   │  │
//! │  │                                                               │  │
//! │  │  ┌─────────┐  ┌─────────┐  ┌─────────────┐  ┌────────────┐    │  │
//! │  │  │  types  │  │  alloc  │  │ transaction │  │ validation │    │  │
//! │  │  │ CellKey │  │ best-fit│  │  assembly + │  │ cart lines │    │  │
//! │  │  │  Sale   │  │  greedy │  │  totals     │  │ stock check│    │  │
//! │  │  └─────────┘  └─────────┘  └─────────────┘  └────────────┘    │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │  │
//! │  └────────────────────────────┬──────────────────────────────────┘  │
//! │                               │                                     │
//! │  ┌────────────────────────────▼──────────────────────────────────┐  │
//! │  │          rackline-db (queue) / rackline-sync (drain)          │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (StorageCell, AllocationResult, SaleTransaction, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`alloc`] - Multi-location stock allocation engine
//! - [`transaction`] - Sale transaction assembly
//! - [`validation`] - Cart line validation and offline stock checks
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; the allocation engine
//!    holds no state between calls
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in centavos (i64)
//! 4. **Explicit Errors**: errors are typed enums; shortfalls are results,
//!    not errors

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alloc;
pub mod error;
pub mod money;
pub mod transaction;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use rackline_core::Money` instead of
// `use rackline_core::money::Money`

pub use alloc::allocate;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use transaction::{build_transaction, TransactionBuilder};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
///
/// Prevents runaway carts and keeps a single transaction's queue payload
/// bounded.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Guards against accidental over-ordering (typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
