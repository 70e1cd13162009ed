// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Transaction Gateway
//!
//! Mirrors entity writes onto a permissioned ledger channel.
//!
//! ## Layers
//!
//! ```text
//! LedgerGateway ── add / set / get / delete, receipts
//!   └─ SessionManager ── one shared NetworkSession, serialized rebuilds
//!        └─ NetworkSession ── identity + initialized Channel + EventHub
//!             └─ FabricTransport ── HttpTransport | InMemoryNetwork
//! ```
//!
//! ## Confirmation
//!
//! A mutating operation is `Committed` only after the event hub reports a
//! valid commit for its transaction id. Everything short of that within the
//! deadline is `TimedOut`, carrying the id when one was assigned, and the
//! receipt stays pending until [`crate::reconciler`] resolves it.

pub mod channel;
pub mod enroll;
pub mod error;
pub mod events;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod operation;
pub mod session;
pub mod transport;
pub mod types;

pub use error::{BootstrapError, EnrollmentError, ErrorClass, GatewayError, NetworkError};
pub use gateway::LedgerGateway;
pub use http::HttpTransport;
pub use memory::InMemoryNetwork;
pub use operation::LedgerOperation;
pub use session::{NetworkSession, SessionManager, SessionStatus};
pub use transport::FabricTransport;
pub use types::{TransactionId, TransactionOutcome, TransactionStatus};
