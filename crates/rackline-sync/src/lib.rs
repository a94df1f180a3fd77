//! # rackline-sync: Offline-First Sync Engine for Rackline
//!
//! Drains the local pending-transaction queue against the remote store
//! whenever connectivity allows, without losing or duplicating sales.
//!
//! ## The Offline Story
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Sale Lifecycle                                 │
//! │                                                                     │
//! │  checkout ──► build_transaction ──► SyncAgent::submit_sale          │
//! │                                          │                          │
//! │                         enqueue (durable, fsynced)                  │
//! │                                          │                          │
//! │          ┌───────────────────────────────┴─────────────┐            │
//! │          │ online                                      │ offline    │
//! │          ▼                                             ▼            │
//! │   drain cycle now                              wait in queue        │
//! │          │                                             │            │
//! │          │             ConnectivityMonitor             │            │
//! │          │         (probe ok: offline → online)        │            │
//! │          │                     │                       │            │
//! │          ▼                     ▼                       │            │
//! │   remote store  ◄── Synchronizer (retry/backoff) ◄─────┘            │
//! │          │                                                          │
//! │          ▼                                                          │
//! │   confirmed → dequeue  (sale leaves local ownership)                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`agent`] - Orchestrator: decides when cycles run
//! - [`synchronizer`] - One cycle: snapshot, submit, retry, backoff
//! - [`monitor`] - Trustworthy connectivity signal (active probes)
//! - [`sink`] - Remote store boundary (idempotent HTTP submission)
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod config;
pub mod error;
pub mod monitor;
pub mod sink;
pub mod synchronizer;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{NoOpEmitter, SyncAgent, SyncEventEmitter, SyncStatus};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use monitor::{
    ConnectivityMonitor, ConnectivityMonitorHandle, ConnectivitySignal, HealthProbe,
    HttpHealthProbe, LinkEvent, ProbeError,
};
pub use sink::{HttpTransactionSink, SinkError, SinkResult, TransactionSink};
pub use synchronizer::{CycleOutcome, ExhaustedTransaction, SyncReport, Synchronizer};
