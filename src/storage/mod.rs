// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistent storage.
//!
//! The relational entity copy is held in memory ([`crate::store`]); what
//! persists across restarts is the ledger receipt log, an embedded redb
//! database under `DATA_DIR`.

pub mod receipts;

pub use receipts::{LedgerReceipt, ReceiptDatabase, ReceiptDbError, ReceiptDbResult};

/// File name of the receipt database inside `DATA_DIR`.
pub const RECEIPTS_FILE: &str = "ledger-receipts.redb";
