//! # Remote Transaction Sink
//!
//! The boundary to the remote store that ultimately owns completed sales.
//!
//! ## Idempotent Submission
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Why Submission Is Idempotent                        │
//! │                                                                     │
//! │  Terminal                               Remote Store                │
//! │     │  PUT /transactions/{id}  ────────────►  record created        │
//! │     │                                              │                │
//! │     │  ◄──────────── ack LOST (timeout) ───────────┘                │
//! │     │                                                               │
//! │     │  PUT /transactions/{id}  (retry, SAME id) ──►  409 duplicate  │
//! │     │  ◄──────────────── treated as success ───────────┘            │
//! │                                                                     │
//! │  The transaction id is generated once at build time and never       │
//! │  regenerated, so a retried submission whose first ack was lost is   │
//! │  recognized remotely as a duplicate: recorded once, not twice.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use rackline_core::SaleTransaction;

// =============================================================================
// Sink Error
// =============================================================================

/// Result type for sink submissions.
pub type SinkResult<T> = Result<T, SinkError>;

/// A single submission failure.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Network-level failure (connection refused, DNS, reset).
    #[error("Remote store unreachable: {0}")]
    Unreachable(String),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The remote store rejected the transaction (4xx other than 409).
    /// Retrying the same payload will not help.
    #[error("Remote store rejected transaction ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The remote store is up but failing (5xx). Worth retrying.
    #[error("Remote store unavailable ({status})")]
    RemoteUnavailable { status: u16 },

    /// The request could not be constructed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SinkError {
    /// Returns true if retrying the submission may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SinkError::Unreachable(_) | SinkError::Timeout | SinkError::RemoteUnavailable { .. }
        )
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SinkError::Timeout
        } else {
            SinkError::Unreachable(err.to_string())
        }
    }
}

// =============================================================================
// Sink Trait
// =============================================================================

/// A remote store that accepts sale transactions keyed by id.
///
/// Implementations must be idempotent on `tx.id`: submitting the same
/// transaction twice leaves exactly one canonical record remote-side.
#[async_trait]
pub trait TransactionSink: Send + Sync {
    /// Submits one transaction. `Ok(())` means the remote store durably
    /// accepted it (including "already had it").
    async fn submit(&self, tx: &SaleTransaction) -> SinkResult<()>;
}

// =============================================================================
// Status Classification
// =============================================================================

/// What a response status means for the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Recorded remotely (first time).
    Accepted,
    /// Remote already had this id; the earlier ack was lost. Success.
    Duplicate,
    /// Permanent rejection; retry is pointless.
    Rejected,
    /// Transient server failure; retry later.
    Retryable,
}

pub(crate) fn classify_status(status: StatusCode) -> Disposition {
    if status.is_success() {
        Disposition::Accepted
    } else if status == StatusCode::CONFLICT {
        Disposition::Duplicate
    } else if status.is_client_error() {
        Disposition::Rejected
    } else {
        Disposition::Retryable
    }
}

// =============================================================================
// HTTP Sink
// =============================================================================

/// HTTP implementation of [`TransactionSink`].
///
/// Submits `PUT {endpoint}/transactions/{id}` with the transaction as the
/// JSON body and the id repeated in an `Idempotency-Key` header.
#[derive(Debug)]
pub struct HttpTransactionSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransactionSink {
    /// Creates a sink for the given base endpoint.
    ///
    /// ## Arguments
    /// * `endpoint` - Base URL, e.g. `https://api.example.com/pos`
    /// * `timeout` - Per-request timeout
    pub fn new(endpoint: &str, timeout: Duration) -> SinkResult<Self> {
        // A trailing slash makes Url::join treat the last segment as a
        // directory instead of replacing it.
        let normalized = format!("{}/", endpoint.trim_end_matches('/'));
        let endpoint =
            Url::parse(&normalized).map_err(|e| SinkError::InvalidRequest(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::InvalidRequest(e.to_string()))?;

        Ok(HttpTransactionSink { client, endpoint })
    }
}

#[async_trait]
impl TransactionSink for HttpTransactionSink {
    async fn submit(&self, tx: &SaleTransaction) -> SinkResult<()> {
        let url = self
            .endpoint
            .join(&format!("transactions/{}", tx.id))
            .map_err(|e| SinkError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .put(url)
            .header("Idempotency-Key", &tx.id)
            .json(tx)
            .send()
            .await?;

        let status = response.status();
        match classify_status(status) {
            Disposition::Accepted => {
                debug!(id = %tx.id, "Transaction accepted remotely");
                Ok(())
            }
            Disposition::Duplicate => {
                // The remote already has this id: an earlier submission
                // landed but its ack never reached us.
                debug!(id = %tx.id, "Transaction was already recorded remotely");
                Ok(())
            }
            Disposition::Rejected => {
                let message = response.text().await.unwrap_or_default();
                Err(SinkError::Rejected {
                    status: status.as_u16(),
                    message,
                })
            }
            Disposition::Retryable => Err(SinkError::RemoteUnavailable {
                status: status.as_u16(),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
