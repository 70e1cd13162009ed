// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::ledger::LedgerGateway;
use crate::storage::receipts::ReceiptDatabase;
use crate::store::InMemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<InMemoryStore>>,
    pub ledger: Arc<LedgerGateway>,
    /// Receipt log; absent when the gateway runs without one.
    pub receipts: Option<Arc<ReceiptDatabase>>,
    /// Expose the direct `/api/blogs/{id}/chaincode` routes.
    pub chaincode_api_enabled: bool,
}

impl AppState {
    pub fn new(store: InMemoryStore, ledger: Arc<LedgerGateway>) -> Self {
        let receipts = ledger.receipts().cloned();
        Self {
            store: Arc::new(RwLock::new(store)),
            ledger,
            receipts,
            chaincode_api_enabled: false,
        }
    }

    pub fn with_chaincode_api(mut self, enabled: bool) -> Self {
        self.chaincode_api_enabled = enabled;
        self
    }
}
