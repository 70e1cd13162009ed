// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Failure taxonomy for the ledger gateway.
//!
//! Three layers:
//!
//! - [`NetworkError`]: what a transport reports for a single call.
//! - [`EnrollmentError`] / [`BootstrapError`]: session establishment failures.
//!   Each names the stage and endpoint so logs can tell them apart.
//! - [`GatewayError`]: what callers see. Bootstrap failures collapse into
//!   [`GatewayError::Transport`]; chaincode rejections become
//!   [`GatewayError::Ledger`]; an unconfirmed commit is
//!   [`GatewayError::TimedOut`], which is *not* a failure of the transaction.

use std::error::Error as StdError;
use std::time::Duration;

use super::types::{EndpointRole, OperationKind, TransactionId};

/// Error reported by a [`FabricTransport`](super::transport::FabricTransport) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    /// Chaincode, endorsement policy or commit validation refused the call.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("request timed out")]
    Timeout,

    /// The looked-up transaction does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Errors that can occur while enrolling an identity with the certificate authority.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("invalid enrollment request: {0}")]
    InvalidRequest(String),

    #[error("certificate authority {ca_url} unreachable: {reason}")]
    Unreachable { ca_url: String, reason: String },

    #[error("certificate authority {ca_url} rejected enrollment: {reason}")]
    Rejected { ca_url: String, reason: String },

    #[error("invalid enrollment certificate: {0}")]
    InvalidCertificate(String),
}

/// Errors that prevent a network session from being established.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("admin enrollment for organization {organization} failed")]
    Enrollment {
        organization: String,
        #[source]
        source: EnrollmentError,
    },

    #[error("failed to register {role} `{name}` at {url}: {reason}")]
    Registration {
        role: EndpointRole,
        name: String,
        url: String,
        reason: String,
    },

    #[error("failed to initialize channel `{channel}`: {reason}")]
    ChannelInitialize { channel: String, reason: String },

    #[error("channel `{channel}` is already initialized")]
    AlreadyInitialized { channel: String },

    #[error("event hub `{name}` at {url} unavailable: {reason}")]
    EventHub {
        name: String,
        url: String,
        reason: String,
    },

    #[error("session rebuild suppressed for another {remaining:?} after a failed bootstrap: {last_failure}")]
    CoolingDown {
        remaining: Duration,
        last_failure: String,
    },
}

impl BootstrapError {
    /// Bootstrap stage label used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            BootstrapError::Enrollment { .. } => "enrollment",
            BootstrapError::Registration { .. } => "registration",
            BootstrapError::ChannelInitialize { .. } | BootstrapError::AlreadyInitialized { .. } => {
                "channel_initialize"
            }
            BootstrapError::EventHub { .. } => "event_hub",
            BootstrapError::CoolingDown { .. } => "cooldown",
        }
    }
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Empty key or value; the caller should have caught it.
    Validation,
    /// The ledger refused the call on business grounds.
    Ledger,
    /// Session, connectivity or enrollment failure.
    Transport,
    /// The final state of a broadcast transaction is unknown.
    Timeout,
}

/// Errors returned by [`LedgerGateway`](super::gateway::LedgerGateway) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid ledger input: {0}")]
    InvalidInput(String),

    #[error("ledger rejected {operation} of `{key}`: {reason}")]
    Ledger {
        operation: OperationKind,
        key: String,
        reason: String,
        /// Set when the rejection happened at commit validation.
        transaction_id: Option<TransactionId>,
    },

    #[error("ledger transport failure: {reason}")]
    Transport { reason: String },

    #[error("transaction {} not confirmed within {waited:?}", tx_label(.transaction_id))]
    TimedOut {
        transaction_id: Option<TransactionId>,
        waited: Duration,
    },
}

fn tx_label(transaction_id: &Option<TransactionId>) -> &str {
    transaction_id
        .as_ref()
        .map(TransactionId::as_str)
        .unwrap_or("<unassigned>")
}

impl GatewayError {
    pub fn transport(reason: impl Into<String>) -> Self {
        GatewayError::Transport {
            reason: reason.into(),
        }
    }

    pub fn classification(&self) -> ErrorClass {
        match self {
            GatewayError::InvalidInput(_) => ErrorClass::Validation,
            GatewayError::Ledger { .. } => ErrorClass::Ledger,
            GatewayError::Transport { .. } => ErrorClass::Transport,
            GatewayError::TimedOut { .. } => ErrorClass::Timeout,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self.classification() {
            ErrorClass::Validation => "invalid_input",
            ErrorClass::Ledger => "ledger_rejected",
            ErrorClass::Transport => "ledger_unavailable",
            ErrorClass::Timeout => "ledger_timeout",
        }
    }

    /// Transaction id carried by the error, if one was assigned.
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            GatewayError::Ledger { transaction_id, .. }
            | GatewayError::TimedOut { transaction_id, .. } => transaction_id.as_ref(),
            _ => None,
        }
    }
}

impl From<BootstrapError> for GatewayError {
    fn from(err: BootstrapError) -> Self {
        GatewayError::Transport {
            reason: error_chain(&err),
        }
    }
}

/// Render an error and its sources as `outer: inner: root`.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        source = inner.source();
    }
    rendered
}
