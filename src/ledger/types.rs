// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger types: identities, endpoints, transaction ids and outcomes.

use std::fmt;

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Reserved state string returned by the chaincode `get` function when the
/// key has no value on the ledger.
pub const NOT_FOUND_SENTINEL: &str = "NOT_FOUND";

/// Length of the random nonce mixed into every transaction id.
pub const NONCE_LEN: usize = 24;

// =============================================================================
// Topology
// =============================================================================

/// Role an endpoint plays on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    Peer,
    Orderer,
    EventHub,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Peer => write!(f, "peer"),
            EndpointRole::Orderer => write!(f, "orderer"),
            EndpointRole::EventHub => write!(f, "event hub"),
        }
    }
}

/// A named network endpoint registered on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub role: EndpointRole,
    pub name: String,
    pub url: String,
}

impl Endpoint {
    pub fn new(role: EndpointRole, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn peer(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(EndpointRole::Peer, name, url)
    }

    pub fn orderer(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(EndpointRole::Orderer, name, url)
    }

    pub fn event_hub(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(EndpointRole::EventHub, name, url)
    }
}

/// Channel name plus the one peer, orderer and event hub the session uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTopology {
    pub channel: String,
    pub peer: Endpoint,
    pub orderer: Endpoint,
    pub event_hub: Endpoint,
}

impl ChannelTopology {
    /// Endpoints in registration order.
    pub fn endpoints(&self) -> [&Endpoint; 3] {
        [&self.peer, &self.event_hub, &self.orderer]
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Credentials issued by the certificate authority.
///
/// The private key never leaves the key store that produced it; the session
/// only carries an opaque handle to it.
#[derive(Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub certificate_pem: String,
    pub key_handle: String,
}

impl fmt::Debug for Enrollment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enrollment")
            .field("certificate_pem", &format_args!("<{} bytes>", self.certificate_pem.len()))
            .field("key_handle", &"<redacted>")
            .finish()
    }
}

/// An enrolled application identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub affiliation: String,
    pub msp_id: String,
    pub enrollment: Enrollment,
}

impl Identity {
    /// Serialized creator bytes: MSP id followed by the enrollment certificate.
    pub fn creator(&self) -> Vec<u8> {
        let mut creator =
            Vec::with_capacity(self.msp_id.len() + self.enrollment.certificate_pem.len());
        creator.extend_from_slice(self.msp_id.as_bytes());
        creator.extend_from_slice(self.enrollment.certificate_pem.as_bytes());
        creator
    }
}

/// Parameters for an enrollment round-trip with the certificate authority.
#[derive(Clone)]
pub struct EnrollmentRequest {
    pub enrollment_id: String,
    pub secret: String,
    pub affiliation: String,
    pub msp_id: String,
}

impl fmt::Debug for EnrollmentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrollmentRequest")
            .field("enrollment_id", &self.enrollment_id)
            .field("secret", &"<redacted>")
            .field("affiliation", &self.affiliation)
            .field("msp_id", &self.msp_id)
            .finish()
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Opaque transaction identifier assigned to a mutating submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fabric-style id: hex SHA-256 over the nonce and the creator bytes.
    pub fn derive(nonce: &[u8], identity: &Identity) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(nonce);
        hasher.update(identity.creator());
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        TransactionId(value)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        TransactionId(value.to_string())
    }
}

/// Fill a fresh nonce from the system CSPRNG.
pub fn generate_nonce() -> Result<[u8; NONCE_LEN], ring::error::Unspecified> {
    let mut nonce = [0u8; NONCE_LEN];
    SystemRandom::new().fill(&mut nonce)?;
    Ok(nonce)
}

/// The four ledger interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Set,
    Get,
    Delete,
}

impl OperationKind {
    /// Chaincode function invoked for this kind.
    pub fn chaincode_function(&self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Set => "set",
            OperationKind::Get => "get",
            OperationKind::Delete => "delete",
        }
    }

    /// Mutating kinds go through ordering and commit; `Get` is a plain query.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, OperationKind::Get)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chaincode_function())
    }
}

/// A chaincode function invocation with string arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeCall {
    pub chaincode: String,
    pub function: String,
    pub args: Vec<String>,
}

/// Peer endorsement of a proposal, ready to be sent to the orderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endorsement {
    pub transaction_id: TransactionId,
    pub payload: String,
}

/// Validation result the committing peer attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    Valid,
    Invalid(String),
}

/// Block commit notification delivered by the event hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    pub transaction_id: TransactionId,
    pub status: CommitStatus,
    pub block_number: u64,
}

/// Successful result of a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// A mutating transaction was ordered and committed.
    Committed { transaction_id: TransactionId },
    /// A query returned the entity's current state.
    QueryResult { state: String },
    /// A query found no state for the key.
    NotFound,
}

impl TransactionOutcome {
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            TransactionOutcome::Committed { transaction_id } => Some(transaction_id),
            _ => None,
        }
    }
}

/// Final or provisional state of a transaction, as reported by a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionStatus {
    Committed,
    Rejected { reason: String },
    Pending,
    Unknown,
}

impl TransactionStatus {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed | TransactionStatus::Rejected { .. }
        )
    }
}

impl From<&CommitEvent> for TransactionStatus {
    fn from(event: &CommitEvent) -> Self {
        match &event.status {
            CommitStatus::Valid => TransactionStatus::Committed,
            CommitStatus::Invalid(reason) => TransactionStatus::Rejected {
                reason: reason.clone(),
            },
        }
    }
}
