// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Gateway
//!
//! Entry point for the rest of the application. Wraps the session manager,
//! runs [`LedgerOperation`]s on the shared session, invalidates that session
//! when it turns out to be broken and keeps the receipt log current.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::error::{GatewayError, NetworkError};
use super::operation::LedgerOperation;
use super::session::{SessionManager, SessionStatus};
use super::transport::FabricTransport;
use super::types::{TransactionId, TransactionOutcome, TransactionStatus};
use crate::config::LedgerConfig;
use crate::storage::receipts::{LedgerReceipt, ReceiptDatabase};

pub struct LedgerGateway {
    sessions: SessionManager,
    receipts: Option<Arc<ReceiptDatabase>>,
}

impl LedgerGateway {
    pub fn new(transport: Arc<dyn FabricTransport>, config: LedgerConfig) -> Self {
        Self {
            sessions: SessionManager::new(transport, config),
            receipts: None,
        }
    }

    /// Record every mutating submission in `receipts`.
    pub fn with_receipts(mut self, receipts: Arc<ReceiptDatabase>) -> Self {
        self.receipts = Some(receipts);
        self
    }

    pub fn receipts(&self) -> Option<&Arc<ReceiptDatabase>> {
        self.receipts.as_ref()
    }

    pub fn config(&self) -> &LedgerConfig {
        self.sessions.config()
    }

    pub async fn add(&self, key: &str, value: &str) -> Result<TransactionOutcome, GatewayError> {
        self.execute(LedgerOperation::add(key, value)?).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<TransactionOutcome, GatewayError> {
        self.execute(LedgerOperation::set(key, value)?).await
    }

    pub async fn get(&self, key: &str) -> Result<TransactionOutcome, GatewayError> {
        self.execute(LedgerOperation::get(key)?).await
    }

    pub async fn delete(&self, key: &str) -> Result<TransactionOutcome, GatewayError> {
        self.execute(LedgerOperation::delete(key)?).await
    }

    /// Submit `operation` on the shared session.
    pub async fn execute(
        &self,
        operation: LedgerOperation,
    ) -> Result<TransactionOutcome, GatewayError> {
        operation.validate()?;
        let session = self.sessions.session().await?;
        let config = self.sessions.config();

        let result = operation
            .submit(&session, &config.chaincode, config.commit_timeout)
            .await;

        let broken = matches!(result, Err(GatewayError::Transport { .. })) || !session.is_healthy();
        if broken {
            self.sessions.invalidate(&session).await;
        }

        match &result {
            Ok(outcome) => debug!(
                operation = %operation.kind(),
                key = %operation.key(),
                tx_id = ?outcome.transaction_id().map(TransactionId::as_str),
                "Ledger operation completed"
            ),
            Err(err) => warn!(
                operation = %operation.kind(),
                key = %operation.key(),
                error_code = err.error_code(),
                error = %err,
                "Ledger operation failed"
            ),
        }

        self.record_receipt(&operation, &result);
        result
    }

    /// Final or provisional status of `transaction_id` on the live ledger.
    pub async fn transaction_status(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionStatus, GatewayError> {
        let session = self.sessions.session().await?;
        let lookup = session
            .transport()
            .transaction_status(session.channel(), transaction_id)
            .await;

        match lookup {
            Ok(status) => Ok(status),
            Err(NetworkError::NotFound(_)) => Ok(session
                .events()
                .recent(transaction_id)
                .map(|event| TransactionStatus::from(&event))
                .unwrap_or(TransactionStatus::Unknown)),
            Err(err) => {
                let err = GatewayError::transport(err.to_string());
                self.sessions.invalidate(&session).await;
                Err(err)
            }
        }
    }

    /// Look `transaction_id` up on the ledger and resolve its receipt when
    /// the status is final.
    pub async fn reconcile(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionStatus, GatewayError> {
        let status = self.transaction_status(transaction_id).await?;
        if status.is_final() {
            if let Some(receipts) = &self.receipts {
                match receipts.resolve(transaction_id, status.clone()) {
                    Ok(receipt) => info!(
                        tx_id = %transaction_id,
                        status = ?receipt.status,
                        "Ledger receipt resolved"
                    ),
                    Err(e) => warn!(tx_id = %transaction_id, error = %e, "Failed to resolve receipt"),
                }
            }
        }
        Ok(status)
    }

    /// Establish the session ahead of the first request.
    pub async fn warm_up(&self) -> Result<(), GatewayError> {
        self.sessions.session().await?;
        Ok(())
    }

    pub async fn session_status(&self) -> SessionStatus {
        self.sessions.status().await
    }

    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
    }

    fn record_receipt(
        &self,
        operation: &LedgerOperation,
        result: &Result<TransactionOutcome, GatewayError>,
    ) {
        let Some(receipts) = &self.receipts else {
            return;
        };
        if !operation.kind().is_mutating() {
            return;
        }

        let (transaction_id, status, detail) = match result {
            Ok(TransactionOutcome::Committed { transaction_id }) => {
                (transaction_id, TransactionStatus::Committed, None)
            }
            Err(GatewayError::TimedOut {
                transaction_id: Some(transaction_id),
                waited,
            }) => (
                transaction_id,
                TransactionStatus::Pending,
                Some(format!("not confirmed within {waited:?}")),
            ),
            Err(GatewayError::Ledger {
                transaction_id: Some(transaction_id),
                reason,
                ..
            }) => (
                transaction_id,
                TransactionStatus::Rejected {
                    reason: reason.clone(),
                },
                None,
            ),
            _ => return,
        };

        let mut receipt = LedgerReceipt::new(
            transaction_id.clone(),
            operation.kind(),
            operation.key(),
            status,
        );
        if let Some(detail) = detail {
            receipt = receipt.with_detail(detail);
        }
        if let Err(e) = receipts.record(&receipt) {
            error!(
                tx_id = %transaction_id,
                operation = %operation.kind(),
                error = %e,
                "Failed to record ledger receipt"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::test_ledger_config;
    use crate::ledger::error::ErrorClass;
    use crate::ledger::memory::InMemoryNetwork;

    fn gateway_with_receipts(
        network: &InMemoryNetwork,
    ) -> (tempfile::TempDir, Arc<ReceiptDatabase>, LedgerGateway) {
        let dir = tempfile::tempdir().unwrap();
        let receipts = Arc::new(ReceiptDatabase::open(&dir.path().join("receipts.redb")).unwrap());
        let gateway = LedgerGateway::new(Arc::new(network.clone()), test_ledger_config())
            .with_receipts(Arc::clone(&receipts));
        (dir, receipts, gateway)
    }

    #[tokio::test]
    async fn committed_submissions_leave_final_receipts() {
        let network = InMemoryNetwork::new("mychannel");
        let (_dir, receipts, gateway) = gateway_with_receipts(&network);

        let outcome = gateway.add("tag:1", "{\"id\":1}").await.unwrap();
        let tx = outcome.transaction_id().unwrap();
        let receipt = receipts.get(tx).unwrap().unwrap();
        assert_eq!(receipt.status, TransactionStatus::Committed);
        assert_eq!(receipt.key, "tag:1");

        // Queries never produce receipts.
        gateway.get("tag:1").await.unwrap();
        assert_eq!(receipts.pending_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn timed_out_submission_is_pending_until_reconciled() {
        let network = InMemoryNetwork::new("mychannel");
        let mut config = test_ledger_config();
        config.commit_timeout = Duration::from_millis(50);
        let dir = tempfile::tempdir().unwrap();
        let receipts = Arc::new(ReceiptDatabase::open(&dir.path().join("receipts.redb")).unwrap());
        let gateway = LedgerGateway::new(Arc::new(network.clone()), config)
            .with_receipts(Arc::clone(&receipts));
        gateway.warm_up().await.unwrap();
        network.set_commit_delay(Duration::from_millis(150));

        let err = gateway.add("blog:9", "{}").await.unwrap_err();
        assert_eq!(err.classification(), ErrorClass::Timeout);
        let tx = err.transaction_id().cloned().unwrap();
        assert!(receipts.get(&tx).unwrap().unwrap().is_pending());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(gateway.reconcile(&tx).await.unwrap(), TransactionStatus::Committed);
        assert!(!receipts.get(&tx).unwrap().unwrap().is_pending());
    }

    #[tokio::test]
    async fn transport_failure_invalidates_session() {
        let network = InMemoryNetwork::new("mychannel");
        let (_dir, _receipts, gateway) = gateway_with_receipts(&network);
        gateway.warm_up().await.unwrap();
        assert_eq!(network.enrollment_count(), 1);

        network.set_unreachable(crate::ledger::types::EndpointRole::Peer, true);
        let err = gateway.add("blog:1", "{}").await.unwrap_err();
        assert_eq!(err.classification(), ErrorClass::Transport);
        assert_eq!(gateway.session_status().await, SessionStatus::NotEstablished);

        network.set_unreachable(crate::ledger::types::EndpointRole::Peer, false);
        gateway.add("blog:1", "{}").await.unwrap();
        assert_eq!(network.enrollment_count(), 2);
    }
}
