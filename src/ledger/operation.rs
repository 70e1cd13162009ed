// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Operations
//!
//! One [`LedgerOperation`] is one chaincode interaction. Every kind follows
//! the same lifecycle:
//!
//! ```text
//! Created ──submit──▶ Submitted ──▶ Committed | Rejected | TimedOut
//! ```
//!
//! Mutating kinds (`Add`, `Set`, `Delete`) are endorsed by the peer, handed to
//! the orderer and reported `Committed` only once the event hub delivers a
//! valid commit event for their transaction id. `Get` is a plain peer query
//! with no ordering step.
//!
//! The deadline covers the whole path. Once the orderer accepted a
//! transaction, running out of time yields [`GatewayError::TimedOut`] with
//! the transaction id: the ledger may still commit it.

use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::debug;

use super::error::{GatewayError, NetworkError};
use super::events::WaitError;
use super::session::NetworkSession;
use super::types::{
    ChaincodeCall, CommitStatus, OperationKind, TransactionId, TransactionOutcome,
    NOT_FOUND_SENTINEL,
};

/// A single ledger interaction. Keys and values are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOperation {
    Add { key: String, value: String },
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

impl LedgerOperation {
    pub fn add(key: impl Into<String>, value: impl Into<String>) -> Result<Self, GatewayError> {
        Self::checked(LedgerOperation::Add {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Result<Self, GatewayError> {
        Self::checked(LedgerOperation::Set {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn get(key: impl Into<String>) -> Result<Self, GatewayError> {
        Self::checked(LedgerOperation::Get { key: key.into() })
    }

    pub fn delete(key: impl Into<String>) -> Result<Self, GatewayError> {
        Self::checked(LedgerOperation::Delete { key: key.into() })
    }

    fn checked(operation: Self) -> Result<Self, GatewayError> {
        operation.validate()?;
        Ok(operation)
    }

    /// Reject empty keys and values, and values that would read back as
    /// "not found".
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.key().trim().is_empty() {
            return Err(GatewayError::InvalidInput("entity key is empty".to_string()));
        }
        if let Some(value) = self.value() {
            if value.trim().is_empty() {
                return Err(GatewayError::InvalidInput("entity value is empty".to_string()));
            }
            if value == NOT_FOUND_SENTINEL {
                return Err(GatewayError::InvalidInput(format!(
                    "`{NOT_FOUND_SENTINEL}` is reserved and cannot be stored"
                )));
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            LedgerOperation::Add { .. } => OperationKind::Add,
            LedgerOperation::Set { .. } => OperationKind::Set,
            LedgerOperation::Get { .. } => OperationKind::Get,
            LedgerOperation::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            LedgerOperation::Add { key, .. }
            | LedgerOperation::Set { key, .. }
            | LedgerOperation::Get { key }
            | LedgerOperation::Delete { key } => key,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            LedgerOperation::Add { value, .. } | LedgerOperation::Set { value, .. } => Some(value),
            LedgerOperation::Get { .. } | LedgerOperation::Delete { .. } => None,
        }
    }

    /// Chaincode invocation for this operation: function name by kind, key
    /// then value as arguments.
    pub fn call(&self, chaincode: &str) -> ChaincodeCall {
        let mut args = vec![self.key().to_string()];
        if let Some(value) = self.value() {
            args.push(value.to_string());
        }
        ChaincodeCall {
            chaincode: chaincode.to_string(),
            function: self.kind().chaincode_function().to_string(),
            args,
        }
    }

    /// Run the operation on `session` within `timeout`.
    pub async fn submit(
        &self,
        session: &NetworkSession,
        chaincode: &str,
        timeout: Duration,
    ) -> Result<TransactionOutcome, GatewayError> {
        self.validate()?;
        session.ensure_initialized()?;

        let deadline = Instant::now() + timeout;
        let call = self.call(chaincode);

        if self.kind().is_mutating() {
            self.invoke(session, &call, deadline, timeout).await
        } else {
            self.query(session, &call, deadline, timeout).await
        }
    }

    async fn query(
        &self,
        session: &NetworkSession,
        call: &ChaincodeCall,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<TransactionOutcome, GatewayError> {
        let state = match timeout_at(deadline, session.transport().query(session.channel(), call)).await
        {
            Err(_) => return Err(self.timed_out(None, timeout)),
            Ok(Err(err)) => return Err(self.classify(err, None, timeout)),
            Ok(Ok(state)) => state,
        };

        debug!(key = %self.key(), "Ledger query answered");
        if state == NOT_FOUND_SENTINEL {
            Ok(TransactionOutcome::NotFound)
        } else {
            Ok(TransactionOutcome::QueryResult { state })
        }
    }

    async fn invoke(
        &self,
        session: &NetworkSession,
        call: &ChaincodeCall,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<TransactionOutcome, GatewayError> {
        let transport = session.transport();
        let channel = session.channel();

        let endorsement = match timeout_at(deadline, transport.endorse(channel, call)).await {
            Err(_) => return Err(self.timed_out(None, timeout)),
            Ok(Err(err)) => return Err(self.classify(err, None, timeout)),
            Ok(Ok(endorsement)) => endorsement,
        };
        let transaction_id = endorsement.transaction_id.clone();

        // Registered before the broadcast so a fast commit is not missed.
        let watch = session.events().watch(&transaction_id);

        match timeout_at(deadline, transport.broadcast(channel, &endorsement)).await {
            Err(_) => return Err(self.timed_out(Some(transaction_id), timeout)),
            Ok(Err(err)) => return Err(self.classify(err, Some(transaction_id), timeout)),
            Ok(Ok(())) => {}
        }
        debug!(
            operation = %self.kind(),
            key = %self.key(),
            tx_id = %transaction_id,
            "Transaction accepted by orderer"
        );

        match watch.wait_until(deadline).await {
            Ok(event) => match event.status {
                CommitStatus::Valid => Ok(TransactionOutcome::Committed { transaction_id }),
                CommitStatus::Invalid(reason) => Err(GatewayError::Ledger {
                    operation: self.kind(),
                    key: self.key().to_string(),
                    reason,
                    transaction_id: Some(transaction_id),
                }),
            },
            // The transaction is on its way either way; only its fate is unknown.
            Err(WaitError::Elapsed) | Err(WaitError::Disconnected) => {
                Err(self.timed_out(Some(transaction_id), timeout))
            }
        }
    }

    fn timed_out(&self, transaction_id: Option<TransactionId>, waited: Duration) -> GatewayError {
        GatewayError::TimedOut {
            transaction_id,
            waited,
        }
    }

    fn classify(
        &self,
        err: NetworkError,
        transaction_id: Option<TransactionId>,
        timeout: Duration,
    ) -> GatewayError {
        match err {
            NetworkError::Rejected(reason) => GatewayError::Ledger {
                operation: self.kind(),
                key: self.key().to_string(),
                reason,
                transaction_id,
            },
            NetworkError::Timeout if transaction_id.is_some() => {
                self.timed_out(transaction_id, timeout)
            }
            other => GatewayError::transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::test_ledger_config;
    use crate::ledger::error::ErrorClass;
    use crate::ledger::memory::{InMemoryNetwork, DEFAULT_CHAINCODE};
    use crate::ledger::types::EndpointRole;

    async fn session(network: &InMemoryNetwork) -> NetworkSession {
        NetworkSession::bootstrap(Arc::new(network.clone()), &test_ledger_config())
            .await
            .unwrap_or_else(|e| panic!("bootstrap failed: {e}"))
    }

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn constructors_reject_empty_input() {
        assert!(matches!(LedgerOperation::add("", "v"), Err(GatewayError::InvalidInput(_))));
        assert!(matches!(LedgerOperation::set("k", "  "), Err(GatewayError::InvalidInput(_))));
        assert!(matches!(LedgerOperation::get(""), Err(GatewayError::InvalidInput(_))));
        assert!(matches!(LedgerOperation::delete(" "), Err(GatewayError::InvalidInput(_))));
    }

    #[test]
    fn sentinel_value_cannot_be_written() {
        let err = LedgerOperation::add("k", NOT_FOUND_SENTINEL).unwrap_err();
        assert_eq!(err.classification(), ErrorClass::Validation);
        assert!(LedgerOperation::set("k", "NOT_FOUND_AT_ALL").is_ok());
    }

    #[test]
    fn call_carries_function_and_arguments() {
        let call = LedgerOperation::set("42", "{\"title\":\"hello\"}")
            .unwrap()
            .call("blog");
        assert_eq!(call.function, "set");
        assert_eq!(call.args, vec!["42".to_string(), "{\"title\":\"hello\"}".to_string()]);

        let call = LedgerOperation::delete("42").unwrap().call("blog");
        assert_eq!(call.function, "delete");
        assert_eq!(call.args, vec!["42".to_string()]);
    }

    #[tokio::test]
    async fn add_then_get_round_trip() {
        let network = InMemoryNetwork::new("mychannel");
        let session = session(&network).await;

        let outcome = LedgerOperation::add("42", "{\"title\":\"hello\"}")
            .unwrap()
            .submit(&session, DEFAULT_CHAINCODE, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TransactionOutcome::Committed {
                transaction_id: TransactionId::new("tx-001")
            }
        );

        let outcome = LedgerOperation::get("42")
            .unwrap()
            .submit(&session, DEFAULT_CHAINCODE, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TransactionOutcome::QueryResult {
                state: "{\"title\":\"hello\"}".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_key_is_not_found_not_error() {
        let network = InMemoryNetwork::new("mychannel");
        let session = session(&network).await;
        let outcome = LedgerOperation::get("never-added")
            .unwrap()
            .submit(&session, DEFAULT_CHAINCODE, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(outcome, TransactionOutcome::NotFound);
    }

    #[tokio::test]
    async fn chaincode_rejection_is_ledger_error() {
        let network = InMemoryNetwork::new("mychannel");
        let session = session(&network).await;
        let err = LedgerOperation::delete("never-added")
            .unwrap()
            .submit(&session, DEFAULT_CHAINCODE, TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.classification(), ErrorClass::Ledger);
        assert!(err.transaction_id().is_none());
    }

    #[tokio::test]
    async fn slow_commit_times_out_with_transaction_id() {
        let network = InMemoryNetwork::new("mychannel");
        let session = session(&network).await;
        network.set_commit_delay(Duration::from_millis(300));

        let err = LedgerOperation::add("k", "v")
            .unwrap()
            .submit(&session, DEFAULT_CHAINCODE, Duration::from_millis(50))
            .await
            .unwrap_err();
        match err {
            GatewayError::TimedOut {
                transaction_id: Some(tx),
                ..
            } => assert_eq!(tx.as_str(), "tx-001"),
            other => panic!("expected timeout, got {other}"),
        }
    }

    #[tokio::test]
    async fn failed_broadcast_releases_commit_watch() {
        let network = InMemoryNetwork::new("mychannel");
        let session = session(&network).await;
        network.set_unreachable(EndpointRole::Orderer, true);

        for key in ["a", "b", "c"] {
            let err = LedgerOperation::set(key, "v")
                .unwrap()
                .submit(&session, DEFAULT_CHAINCODE, TIMEOUT)
                .await
                .unwrap_err();
            assert_eq!(err.classification(), ErrorClass::Transport);
        }
        assert_eq!(session.events().pending_watches(), 0);
    }

    #[tokio::test]
    async fn uninstalled_chaincode_is_transport_error() {
        let network = InMemoryNetwork::new("mychannel");
        let session = session(&network).await;

        let err = LedgerOperation::get("42")
            .unwrap()
            .submit(&session, "not-deployed", TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.classification(), ErrorClass::Transport);
    }

    #[tokio::test]
    async fn unreachable_peer_is_transport_error() {
        let network = InMemoryNetwork::new("mychannel");
        let session = session(&network).await;
        network.set_unreachable(EndpointRole::Peer, true);

        let err = LedgerOperation::add("k", "v")
            .unwrap()
            .submit(&session, DEFAULT_CHAINCODE, TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.classification(), ErrorClass::Transport);
    }
}
