//! # rackline-db: Local Storage Layer for Rackline
//!
//! This crate provides local durable storage for the Rackline POS core.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Rackline Data Flow                              │
//! │                                                                     │
//! │  Checkout flow (enqueue)        Synchronizer (drain)                │
//! │       │                              │                              │
//! │       ▼                              ▼                              │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                  rackline-db (THIS CRATE)                     │  │
//! │  │                                                               │  │
//! │  │  ┌─────────────┐   ┌────────────────┐   ┌────────────────┐    │  │
//! │  │  │  Database   │   │  Repositories  │   │   Migrations   │    │  │
//! │  │  │  (pool.rs)  │◄──│  queue.rs      │   │   (embedded)   │    │  │
//! │  │  │             │   │  catalog.rs    │   │  001_init.sql  │    │  │
//! │  │  └─────────────┘   └────────────────┘   └────────────────┘    │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite file (WAL, synchronous=FULL)                                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Queue and catalog cache repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rackline_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/rackline.db")).await?;
//!
//! db.queue().enqueue(&transaction).await?;
//! let pending = db.queue().list_pending().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogCacheRepository;
pub use repository::queue::{QueuedTransaction, TransactionQueueRepository};
