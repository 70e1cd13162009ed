// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The seam between the gateway and a concrete ledger network.
//!
//! A transport performs single protocol round-trips; it holds no session
//! state of its own. Session lifecycle, confirmation waiting and error
//! classification all live above it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::channel::Channel;
use super::error::NetworkError;
use super::types::{
    ChaincodeCall, CommitEvent, Endorsement, Endpoint, Enrollment, EnrollmentRequest,
    TransactionId, TransactionStatus,
};

/// Protocol-level operations against the certificate authority, peer,
/// orderer and event hub.
#[async_trait]
pub trait FabricTransport: Send + Sync {
    /// Enroll an identity and return the issued credentials.
    async fn enroll(
        &self,
        ca_url: &str,
        request: &EnrollmentRequest,
    ) -> Result<Enrollment, NetworkError>;

    /// Check that an endpoint accepts connections.
    async fn probe(&self, endpoint: &Endpoint) -> Result<(), NetworkError>;

    /// Handshake that makes the channel ready to route calls.
    async fn initialize_channel(&self, channel: &Channel) -> Result<(), NetworkError>;

    /// Send a proposal to the peer and collect its endorsement.
    async fn endorse(
        &self,
        channel: &Channel,
        call: &ChaincodeCall,
    ) -> Result<Endorsement, NetworkError>;

    /// Hand an endorsed transaction to the orderer.
    async fn broadcast(
        &self,
        channel: &Channel,
        endorsement: &Endorsement,
    ) -> Result<(), NetworkError>;

    /// Evaluate a read-only call on the peer.
    async fn query(&self, channel: &Channel, call: &ChaincodeCall) -> Result<String, NetworkError>;

    /// Open the event-hub subscription. The stream ends when the hub disconnects.
    async fn subscribe_commits(
        &self,
        channel: &Channel,
    ) -> Result<mpsc::Receiver<CommitEvent>, NetworkError>;

    /// Look up the validation state of a transaction on the peer's ledger.
    async fn transaction_status(
        &self,
        channel: &Channel,
        transaction_id: &TransactionId,
    ) -> Result<TransactionStatus, NetworkError>;
}
