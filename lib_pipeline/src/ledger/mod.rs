//! # Ledger Collaborator Module
//!
//! The pipeline treats the ledger as an opaque write-once/read-many
//! key-addressed store with a non-refundable cost per write and an eventual
//! confirmation. This module defines the seam the orchestrators talk to:
//!
//! - **`gateway`**: the HTTP implementation, submitting transactions to a
//!   ledger gateway service and blocking on confirmation with a bounded
//!   polling loop.
//!
//! Each write is a request/acknowledge operation; the caller waits for the
//! confirmation before advancing any durable state, which is what makes the
//! "registry snapshot only moves after a confirmed write" invariant hold.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::model::StatSnapshot;

/// HTTP gateway implementation of [`Ledger`].
pub mod gateway;

/// Address of one provisioned ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAddress(pub String);

impl std::fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Acknowledgement of one confirmed ledger write.
#[derive(Debug, Clone, Serialize)]
pub struct TxReceipt {
    pub tx_id: String,
    pub confirmed_at: DateTime<Utc>,
}

/// Failures of the ledger collaborator. A timeout is handled exactly like
/// any other failed write: the entity is marked failed for this run and the
/// registry snapshot is not advanced.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger transport failure at {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("ledger rejected transaction {tx_id}")]
    Rejected { tx_id: String },

    #[error("ledger transaction {tx_id} unconfirmed after {attempts} polls")]
    Timeout { tx_id: String, attempts: u32 },
}

/// The three operations the core needs from the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Allocates a new addressed record for a name/symbol pair.
    async fn provision_record(
        &self,
        name: &str,
        symbol: &str,
    ) -> Result<LedgerAddress, LedgerError>;

    /// Writes the initialization payload into a freshly provisioned record.
    async fn write_initial(
        &self,
        address: &str,
        snapshot: &StatSnapshot,
    ) -> Result<TxReceipt, LedgerError>;

    /// Writes an updated snapshot payload into an existing record.
    async fn write_update(
        &self,
        address: &str,
        snapshot: &StatSnapshot,
    ) -> Result<TxReceipt, LedgerError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
