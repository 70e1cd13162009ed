// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded receipt log backed by redb (pure Rust, ACID).
//!
//! Every mutating ledger submission leaves a receipt keyed by its transaction
//! id. Receipts whose outcome was unknown when the request returned stay in
//! the pending index until the reconciler resolves them.
//!
//! ## Table Layout
//!
//! - `receipts`: tx_id → serialized LedgerReceipt
//! - `pending_receipts`: tx_id → submission time (RFC 3339)

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger::types::{OperationKind, TransactionId, TransactionStatus};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: tx_id → serialized LedgerReceipt (JSON bytes).
const RECEIPTS: TableDefinition<&str, &[u8]> = TableDefinition::new("receipts");

/// Index of receipts without a final status.
const PENDING: TableDefinition<&str, &str> = TableDefinition::new("pending_receipts");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ReceiptDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type ReceiptDbResult<T> = Result<T, ReceiptDbError>;

// =============================================================================
// Receipt
// =============================================================================

/// What the gateway knows about one submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LedgerReceipt {
    pub transaction_id: TransactionId,
    pub operation: OperationKind,
    pub key: String,
    pub status: TransactionStatus,
    pub submitted_at: DateTime<Utc>,
    /// Set once the status became final.
    pub resolved_at: Option<DateTime<Utc>>,
    pub detail: Option<String>,
}

impl LedgerReceipt {
    pub fn new(
        transaction_id: TransactionId,
        operation: OperationKind,
        key: impl Into<String>,
        status: TransactionStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            transaction_id,
            operation,
            key: key.into(),
            resolved_at: status.is_final().then_some(now),
            status,
            submitted_at: now,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_pending(&self) -> bool {
        !self.status.is_final()
    }
}

// =============================================================================
// ReceiptDatabase
// =============================================================================

pub struct ReceiptDatabase {
    db: Database,
}

impl ReceiptDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> ReceiptDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECEIPTS)?;
            let _ = write_txn.open_table(PENDING)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert or replace a receipt, keeping the pending index in step.
    pub fn record(&self, receipt: &LedgerReceipt) -> ReceiptDbResult<()> {
        let json = serde_json::to_vec(receipt)?;
        let tx_id = receipt.transaction_id.as_str();

        let write_txn = self.db.begin_write()?;
        {
            let mut receipts = write_txn.open_table(RECEIPTS)?;
            receipts.insert(tx_id, json.as_slice())?;

            let mut pending = write_txn.open_table(PENDING)?;
            if receipt.is_pending() {
                let submitted = receipt.submitted_at.to_rfc3339();
                pending.insert(tx_id, submitted.as_str())?;
            } else {
                pending.remove(tx_id)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Record a fresh submission.
    pub fn record_submitted(
        &self,
        transaction_id: &TransactionId,
        operation: OperationKind,
        key: &str,
        status: TransactionStatus,
    ) -> ReceiptDbResult<LedgerReceipt> {
        let receipt = LedgerReceipt::new(transaction_id.clone(), operation, key, status);
        self.record(&receipt)?;
        Ok(receipt)
    }

    /// Move a receipt to `status`. Final statuses leave the pending index.
    pub fn resolve(
        &self,
        transaction_id: &TransactionId,
        status: TransactionStatus,
    ) -> ReceiptDbResult<LedgerReceipt> {
        let mut receipt = self
            .get(transaction_id)?
            .ok_or_else(|| ReceiptDbError::NotFound(format!("Receipt {transaction_id}")))?;

        receipt.resolved_at = status.is_final().then(Utc::now);
        if let TransactionStatus::Rejected { reason } = &status {
            receipt.detail = Some(reason.clone());
        }
        receipt.status = status;
        self.record(&receipt)?;
        Ok(receipt)
    }

    pub fn get(&self, transaction_id: &TransactionId) -> ReceiptDbResult<Option<LedgerReceipt>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECEIPTS)?;
        match table.get(transaction_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Up to `limit` receipts still waiting for a final status.
    pub fn list_pending(&self, limit: usize) -> ReceiptDbResult<Vec<LedgerReceipt>> {
        let read_txn = self.db.begin_read()?;
        let pending = read_txn.open_table(PENDING)?;
        let receipts = read_txn.open_table(RECEIPTS)?;

        let mut results = Vec::new();
        for entry in pending.iter()? {
            if results.len() >= limit {
                break;
            }
            let (tx_id, _) = entry?;
            if let Some(value) = receipts.get(tx_id.value())? {
                results.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(results)
    }

    pub fn pending_count(&self) -> ReceiptDbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let pending = read_txn.open_table(PENDING)?;
        Ok(pending.len()?)
    }
}
