//! # Repository Module
//!
//! Database repository implementations for Rackline.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  Repository Pattern Explained                       │
//! │                                                                     │
//! │  Caller (checkout flow / synchronizer)                              │
//! │       │                                                             │
//! │       │  db.queue().enqueue(&tx)                                    │
//! │       ▼                                                             │
//! │  TransactionQueueRepository                                         │
//! │  ├── enqueue(&self, tx)                                             │
//! │  ├── dequeue(&self, id)                                             │
//! │  ├── list_pending(&self)                                            │
//! │  └── mark_failed(&self, id, error)                                  │
//! │       │                                                             │
//! │       │  SQL                                                        │
//! │       ▼                                                             │
//! │  SQLite Database                                                    │
//! │                                                                     │
//! │  SQL is isolated in one place; callers see typed operations.        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`queue::TransactionQueueRepository`] - Pending sale queue (outbox)
//! - [`catalog::CatalogCacheRepository`] - Offline catalog and stock levels

pub mod catalog;
pub mod queue;
