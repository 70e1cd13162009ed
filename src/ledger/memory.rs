// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process ledger network.
//!
//! Implements [`FabricTransport`] end to end so the gateway can run without
//! external infrastructure (`LEDGER_TRANSPORT=memory`) and so tests can
//! exercise every state transition.
//!
//! ## Model
//!
//! - **CA**: accepts exactly one admin name/secret pair.
//! - **Peer**: runs the blog chaincode against the current world state and
//!   records the key version it read (the read set).
//! - **Orderer**: accepts endorsed transactions and schedules their commit
//!   after a configurable delay.
//! - **Committer**: re-checks the read set (MVCC). A transaction whose key
//!   changed since endorsement is invalidated with `MVCC_READ_CONFLICT`.
//! - **Event hub**: every commit is pushed to all open subscriptions.
//!
//! ## Chaincode contract
//!
//! | Function | Args | Behavior |
//! |----------|------|----------|
//! | `add` | key, value | rejects an existing key |
//! | `set` | key, value | upsert |
//! | `delete` | key | rejects a missing key |
//! | `get` | key | value, or `NOT_FOUND` |

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;

use super::channel::Channel;
use super::error::NetworkError;
use super::transport::FabricTransport;
use super::types::{
    ChaincodeCall, CommitEvent, CommitStatus, Endorsement, Endpoint, EndpointRole, Enrollment,
    EnrollmentRequest, TransactionId, TransactionStatus, NOT_FOUND_SENTINEL,
};

/// Default chaincode installed on the simulated channel.
pub const DEFAULT_CHAINCODE: &str = "blog";

/// Validation code attached to transactions invalidated by a read conflict.
pub const MVCC_READ_CONFLICT: &str = "MVCC_READ_CONFLICT";

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
struct Versioned {
    value: String,
    version: u64,
}

#[derive(Debug, Clone)]
enum Write {
    Put(String),
    Delete,
}

/// Endorsed transaction waiting for the orderer.
#[derive(Debug, Clone)]
struct Proposal {
    key: String,
    read_version: Option<u64>,
    write: Write,
}

#[derive(Debug, Default)]
struct Faults {
    ca_unreachable: bool,
    unreachable: HashSet<EndpointRole>,
    commit_delay: Duration,
}

#[derive(Debug, Default)]
struct LedgerState {
    world: HashMap<String, Versioned>,
    next_version: u64,
    next_tx: u64,
    block_height: u64,
    initialized_channels: HashSet<String>,
    endorsed: HashMap<TransactionId, Proposal>,
    statuses: HashMap<TransactionId, TransactionStatus>,
    subscribers: Vec<mpsc::Sender<CommitEvent>>,
    enrollments: u64,
}

struct Shared {
    channel: String,
    chaincode: String,
    msp_id: Option<String>,
    admin_name: String,
    admin_secret: String,
    state: Mutex<LedgerState>,
    faults: Mutex<Faults>,
}

/// Simulated ledger network implementing [`FabricTransport`].
///
/// Cloning yields another handle onto the same network.
#[derive(Clone)]
pub struct InMemoryNetwork {
    shared: Arc<Shared>,
}

impl InMemoryNetwork {
    /// Create a network hosting `channel` with the default admin
    /// (`admin` / `adminpw`) and the `blog` chaincode.
    pub fn new(channel: impl Into<String>) -> Self {
        Self::build(channel.into(), DEFAULT_CHAINCODE.into(), None, "admin".into(), "adminpw".into())
    }

    fn build(
        channel: String,
        chaincode: String,
        msp_id: Option<String>,
        admin_name: String,
        admin_secret: String,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                channel,
                chaincode,
                msp_id,
                admin_name,
                admin_secret,
                state: Mutex::new(LedgerState::default()),
                faults: Mutex::new(Faults::default()),
            }),
        }
    }

    /// Replace the admin credentials the CA accepts.
    pub fn with_admin(self, name: impl Into<String>, secret: impl Into<String>) -> Self {
        let shared = &self.shared;
        Self::build(
            shared.channel.clone(),
            shared.chaincode.clone(),
            shared.msp_id.clone(),
            name.into(),
            secret.into(),
        )
    }

    /// Replace the installed chaincode name.
    pub fn with_chaincode(self, chaincode: impl Into<String>) -> Self {
        let shared = &self.shared;
        Self::build(
            shared.channel.clone(),
            chaincode.into(),
            shared.msp_id.clone(),
            shared.admin_name.clone(),
            shared.admin_secret.clone(),
        )
    }

    /// Only accept enrollments for this MSP id.
    pub fn with_msp_id(self, msp_id: impl Into<String>) -> Self {
        let shared = &self.shared;
        Self::build(
            shared.channel.clone(),
            shared.chaincode.clone(),
            Some(msp_id.into()),
            shared.admin_name.clone(),
            shared.admin_secret.clone(),
        )
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    pub fn set_ca_reachable(&self, reachable: bool) {
        self.faults().ca_unreachable = !reachable;
    }

    pub fn set_unreachable(&self, role: EndpointRole, unreachable: bool) {
        let mut faults = self.faults();
        if unreachable {
            faults.unreachable.insert(role);
        } else {
            faults.unreachable.remove(&role);
        }
    }

    /// Delay between orderer acceptance and commit.
    pub fn set_commit_delay(&self, delay: Duration) {
        self.faults().commit_delay = delay;
    }

    /// Drop every open event-hub subscription.
    pub fn disconnect_event_streams(&self) {
        self.state().subscribers.clear();
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Committed world state for a key.
    pub fn state_of(&self, key: &str) -> Option<String> {
        self.state().world.get(key).map(|v| v.value.clone())
    }

    pub fn block_height(&self) -> u64 {
        self.state().block_height
    }

    /// Number of successful enrollments served by the CA.
    pub fn enrollment_count(&self) -> u64 {
        self.state().enrollments
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.shared
            .faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_reachable(&self, role: EndpointRole) -> Result<(), NetworkError> {
        if self.faults().unreachable.contains(&role) {
            Err(NetworkError::Unreachable(format!("{role} is not accepting connections")))
        } else {
            Ok(())
        }
    }

    fn ensure_channel_ready(&self, channel: &Channel) -> Result<(), NetworkError> {
        if self.state().initialized_channels.contains(channel.name()) {
            Ok(())
        } else {
            Err(NetworkError::Protocol(format!(
                "channel `{}` has not been initialized",
                channel.name()
            )))
        }
    }

    fn ensure_chaincode(&self, call: &ChaincodeCall) -> Result<(), NetworkError> {
        if call.chaincode == self.shared.chaincode {
            Ok(())
        } else {
            Err(NetworkError::Protocol(format!(
                "chaincode `{}` is not installed on channel `{}`",
                call.chaincode, self.shared.channel
            )))
        }
    }

    /// Apply an ordered transaction after MVCC validation and notify subscribers.
    async fn commit(self, transaction_id: TransactionId, proposal: Proposal, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (event, subscribers) = {
            let mut state = self.state();
            state.block_height += 1;
            let block_number = state.block_height;

            let current_version = state.world.get(&proposal.key).map(|v| v.version);
            let status = if current_version == proposal.read_version {
                state.next_version += 1;
                let version = state.next_version;
                match proposal.write {
                    Write::Put(value) => {
                        state.world.insert(proposal.key.clone(), Versioned { value, version });
                    }
                    Write::Delete => {
                        state.world.remove(&proposal.key);
                    }
                }
                state
                    .statuses
                    .insert(transaction_id.clone(), TransactionStatus::Committed);
                CommitStatus::Valid
            } else {
                state.statuses.insert(
                    transaction_id.clone(),
                    TransactionStatus::Rejected {
                        reason: MVCC_READ_CONFLICT.to_string(),
                    },
                );
                CommitStatus::Invalid(MVCC_READ_CONFLICT.to_string())
            };

            state.subscribers.retain(|sender| !sender.is_closed());
            let subscribers = state.subscribers.clone();
            let event = CommitEvent {
                transaction_id,
                status,
                block_number,
            };
            (event, subscribers)
        };

        tracing::trace!(
            tx_id = %event.transaction_id,
            block = event.block_number,
            status = ?event.status,
            "In-memory ledger committed block"
        );

        for subscriber in subscribers {
            let _ = subscriber.send(event.clone()).await;
        }
    }
}

fn expect_args<'a>(call: &'a ChaincodeCall, count: usize) -> Result<&'a [String], NetworkError> {
    if call.args.len() == count {
        Ok(&call.args)
    } else {
        Err(NetworkError::Rejected(format!(
            "function `{}` expects {count} argument(s), got {}",
            call.function,
            call.args.len()
        )))
    }
}

#[async_trait]
impl FabricTransport for InMemoryNetwork {
    async fn enroll(
        &self,
        ca_url: &str,
        request: &EnrollmentRequest,
    ) -> Result<Enrollment, NetworkError> {
        if self.faults().ca_unreachable {
            return Err(NetworkError::Unreachable(format!("{ca_url} refused the connection")));
        }
        if request.enrollment_id != self.shared.admin_name
            || request.secret != self.shared.admin_secret
        {
            return Err(NetworkError::Rejected("authentication failure".to_string()));
        }
        if let Some(msp_id) = &self.shared.msp_id {
            if &request.msp_id != msp_id {
                return Err(NetworkError::Rejected(format!(
                    "unknown membership service `{}`",
                    request.msp_id
                )));
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(request.enrollment_id.as_bytes());
        hasher.update(request.affiliation.as_bytes());
        hasher.update(request.msp_id.as_bytes());
        let der = hasher.finalize().to_vec();

        let serial = {
            let mut state = self.state();
            state.enrollments += 1;
            state.enrollments
        };

        Ok(Enrollment {
            certificate_pem: pem::encode(&pem::Pem::new("CERTIFICATE", der)),
            key_handle: format!("memory-key-{serial}"),
        })
    }

    async fn probe(&self, endpoint: &Endpoint) -> Result<(), NetworkError> {
        self.ensure_reachable(endpoint.role)
    }

    async fn initialize_channel(&self, channel: &Channel) -> Result<(), NetworkError> {
        self.ensure_reachable(EndpointRole::Peer)?;
        self.ensure_reachable(EndpointRole::Orderer)?;
        if channel.name() != self.shared.channel {
            return Err(NetworkError::NotFound(format!("channel `{}`", channel.name())));
        }
        self.state()
            .initialized_channels
            .insert(channel.name().to_string());
        Ok(())
    }

    async fn endorse(
        &self,
        channel: &Channel,
        call: &ChaincodeCall,
    ) -> Result<Endorsement, NetworkError> {
        self.ensure_reachable(EndpointRole::Peer)?;
        self.ensure_channel_ready(channel)?;
        self.ensure_chaincode(call)?;

        let mut state = self.state();
        let proposal = match call.function.as_str() {
            "add" => {
                let args = expect_args(call, 2)?;
                if state.world.contains_key(&args[0]) {
                    return Err(NetworkError::Rejected(format!(
                        "entity {} already exists",
                        args[0]
                    )));
                }
                Proposal {
                    key: args[0].clone(),
                    read_version: None,
                    write: Write::Put(args[1].clone()),
                }
            }
            "set" => {
                let args = expect_args(call, 2)?;
                Proposal {
                    key: args[0].clone(),
                    read_version: state.world.get(&args[0]).map(|v| v.version),
                    write: Write::Put(args[1].clone()),
                }
            }
            "delete" => {
                let args = expect_args(call, 1)?;
                let Some(current) = state.world.get(&args[0]) else {
                    return Err(NetworkError::Rejected(format!(
                        "entity {} does not exist",
                        args[0]
                    )));
                };
                Proposal {
                    key: args[0].clone(),
                    read_version: Some(current.version),
                    write: Write::Delete,
                }
            }
            "get" => {
                return Err(NetworkError::Rejected(
                    "function `get` is read-only and cannot be ordered".to_string(),
                ))
            }
            other => {
                return Err(NetworkError::Rejected(format!(
                    "unknown chaincode function `{other}`"
                )))
            }
        };

        state.next_tx += 1;
        let transaction_id = TransactionId::new(format!("tx-{:03}", state.next_tx));
        state.endorsed.insert(transaction_id.clone(), proposal);

        Ok(Endorsement {
            transaction_id,
            payload: String::new(),
        })
    }

    async fn broadcast(
        &self,
        channel: &Channel,
        endorsement: &Endorsement,
    ) -> Result<(), NetworkError> {
        self.ensure_reachable(EndpointRole::Orderer)?;
        self.ensure_channel_ready(channel)?;

        let proposal = {
            let mut state = self.state();
            let Some(proposal) = state.endorsed.remove(&endorsement.transaction_id) else {
                return Err(NetworkError::Rejected(format!(
                    "transaction {} is unknown or was already ordered",
                    endorsement.transaction_id
                )));
            };
            state
                .statuses
                .insert(endorsement.transaction_id.clone(), TransactionStatus::Pending);
            proposal
        };

        let delay = self.faults().commit_delay;
        tokio::spawn(
            self.clone()
                .commit(endorsement.transaction_id.clone(), proposal, delay),
        );
        Ok(())
    }

    async fn query(&self, channel: &Channel, call: &ChaincodeCall) -> Result<String, NetworkError> {
        self.ensure_reachable(EndpointRole::Peer)?;
        self.ensure_channel_ready(channel)?;
        self.ensure_chaincode(call)?;

        if call.function != "get" {
            return Err(NetworkError::Rejected(format!(
                "function `{}` cannot be evaluated as a query",
                call.function
            )));
        }
        let args = expect_args(call, 1)?;
        Ok(self
            .state()
            .world
            .get(&args[0])
            .map(|v| v.value.clone())
            .unwrap_or_else(|| NOT_FOUND_SENTINEL.to_string()))
    }

    async fn subscribe_commits(
        &self,
        channel: &Channel,
    ) -> Result<mpsc::Receiver<CommitEvent>, NetworkError> {
        self.ensure_reachable(EndpointRole::EventHub)?;
        self.ensure_channel_ready(channel)?;

        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
        self.state().subscribers.push(sender);
        Ok(receiver)
    }

    async fn transaction_status(
        &self,
        channel: &Channel,
        transaction_id: &TransactionId,
    ) -> Result<TransactionStatus, NetworkError> {
        self.ensure_reachable(EndpointRole::Peer)?;
        self.ensure_channel_ready(channel)?;

        Ok(self
            .state()
            .statuses
            .get(transaction_id)
            .cloned()
            .unwrap_or(TransactionStatus::Unknown))
    }
}
