// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Network Session
//!
//! A [`NetworkSession`] is one enrolled identity plus one initialized channel
//! plus the event-hub listener feeding commit confirmations. It is built once
//! and shared read-only by every ledger operation.
//!
//! [`SessionManager`] owns the process-wide session:
//!
//! - built lazily on first use;
//! - rebuilt only after it is invalidated or its event stream dies;
//! - at most one rebuild in flight, other callers wait for it;
//! - after a failed bootstrap, callers fail fast until the cool-down passes.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::channel::Channel;
use super::enroll::IdentityEnroller;
use super::error::{error_chain, BootstrapError};
use super::events::EventHub;
use super::transport::FabricTransport;
use super::types::{EndpointRole, EnrollmentRequest};
use crate::config::LedgerConfig;

/// An established, initialized connection to the ledger network.
pub struct NetworkSession {
    transport: Arc<dyn FabricTransport>,
    channel: Channel,
    events: EventHub,
    shutdown: CancellationToken,
    established_at: DateTime<Utc>,
}

impl NetworkSession {
    /// Enroll the admin, build and initialize the channel, then subscribe to
    /// commit events.
    pub async fn bootstrap(
        transport: Arc<dyn FabricTransport>,
        config: &LedgerConfig,
    ) -> Result<Self, BootstrapError> {
        let topology = &config.topology;

        let enroller = IdentityEnroller::new(Arc::clone(&transport), &config.ca_url);
        let enrolled = if config.affiliation == config.organization {
            enroller
                .enroll_admin(
                    &config.organization,
                    &config.msp_id,
                    &config.admin_name,
                    &config.admin_secret,
                )
                .await
        } else {
            enroller
                .enroll(EnrollmentRequest {
                    enrollment_id: config.admin_name.clone(),
                    secret: config.admin_secret.clone(),
                    affiliation: config.affiliation.clone(),
                    msp_id: config.msp_id.clone(),
                })
                .await
        };
        let identity = enrolled.map_err(|source| BootstrapError::Enrollment {
            organization: config.organization.clone(),
            source,
        })?;

        let mut channel = Channel::new(&topology.channel, identity);
        for endpoint in topology.endpoints() {
            channel.add_endpoint(transport.as_ref(), endpoint.clone()).await?;
        }
        channel.initialize(transport.as_ref()).await?;

        let commits = transport
            .subscribe_commits(&channel)
            .await
            .map_err(|e| BootstrapError::EventHub {
                name: topology.event_hub.name.clone(),
                url: topology.event_hub.url.clone(),
                reason: e.to_string(),
            })?;

        let shutdown = CancellationToken::new();
        let events = EventHub::start(&topology.event_hub.name, commits, shutdown.clone());

        info!(
            organization = %config.organization,
            channel = %topology.channel,
            peer = %topology.peer.url,
            orderer = %topology.orderer.url,
            event_hub = %topology.event_hub.url,
            "Ledger session established"
        );

        Ok(Self {
            transport,
            channel,
            events,
            shutdown,
            established_at: Utc::now(),
        })
    }

    /// Confirm the channel is ready and the event stream is still open.
    pub fn ensure_initialized(&self) -> Result<(), BootstrapError> {
        if !self.channel.is_initialized() {
            return Err(BootstrapError::ChannelInitialize {
                channel: self.channel.name().to_string(),
                reason: "channel is not initialized".to_string(),
            });
        }
        if !self.events.is_alive() || self.shutdown.is_cancelled() {
            let (name, url) = self
                .channel
                .endpoint(EndpointRole::EventHub)
                .map(|e| (e.name.clone(), e.url.clone()))
                .unwrap_or_default();
            return Err(BootstrapError::EventHub {
                name,
                url,
                reason: "commit event stream closed".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_healthy(&self) -> bool {
        self.ensure_initialized().is_ok()
    }

    /// Stop the event-hub listener. The session is unusable afterwards.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn transport(&self) -> &dyn FabricTransport {
        self.transport.as_ref()
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }
}

impl Drop for NetworkSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Session state reported by health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Ready { established_at: DateTime<Utc> },
    /// Established but its event stream or channel is gone; rebuilt on next use.
    Unhealthy { established_at: DateTime<Utc> },
    NotEstablished,
    Failed { reason: String, since: DateTime<Utc> },
}

struct BootstrapFailure {
    at: Instant,
    since: DateTime<Utc>,
    reason: String,
}

/// Process-wide owner of the [`NetworkSession`].
pub struct SessionManager {
    transport: Arc<dyn FabricTransport>,
    config: LedgerConfig,
    current: RwLock<Option<Arc<NetworkSession>>>,
    rebuild: Mutex<()>,
    last_failure: StdMutex<Option<BootstrapFailure>>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn FabricTransport>, config: LedgerConfig) -> Self {
        Self {
            transport,
            config,
            current: RwLock::new(None),
            rebuild: Mutex::new(()),
            last_failure: StdMutex::new(None),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current healthy session, bootstrapping a new one when needed.
    pub async fn session(&self) -> Result<Arc<NetworkSession>, BootstrapError> {
        if let Some(session) = self.healthy_session().await {
            return Ok(session);
        }

        let _rebuild = self.rebuild.lock().await;

        // Another caller may have finished a rebuild while we waited.
        if let Some(session) = self.healthy_session().await {
            return Ok(session);
        }

        if let Some(remaining) = self.cooldown_remaining() {
            return Err(BootstrapError::CoolingDown {
                remaining,
                last_failure: self.last_failure_reason().unwrap_or_default(),
            });
        }

        if let Some(stale) = self.current.write().await.take() {
            warn!(
                established_at = %stale.established_at(),
                "Discarding unhealthy ledger session"
            );
            stale.shutdown();
        }

        match NetworkSession::bootstrap(Arc::clone(&self.transport), &self.config).await {
            Ok(session) => {
                let session = Arc::new(session);
                *self.current.write().await = Some(Arc::clone(&session));
                *self.failure_slot() = None;
                Ok(session)
            }
            Err(err) => {
                let reason = error_chain(&err);
                error!(
                    stage = err.stage(),
                    organization = %self.config.organization,
                    ca_url = %self.config.ca_url,
                    channel = %self.config.topology.channel,
                    error = %reason,
                    "Ledger session bootstrap failed"
                );
                *self.failure_slot() = Some(BootstrapFailure {
                    at: Instant::now(),
                    since: Utc::now(),
                    reason,
                });
                Err(err)
            }
        }
    }

    /// Drop `stale` if it is still the current session.
    ///
    /// A session that was already replaced is left alone, so concurrent
    /// failures on the same session trigger one rebuild.
    pub async fn invalidate(&self, stale: &Arc<NetworkSession>) {
        let mut current = self.current.write().await;
        if current
            .as_ref()
            .is_some_and(|session| Arc::ptr_eq(session, stale))
        {
            current.take();
            stale.shutdown();
            warn!(
                channel = %stale.channel().name(),
                "Ledger session invalidated"
            );
        }
    }

    pub async fn status(&self) -> SessionStatus {
        if let Some(session) = self.current.read().await.as_ref() {
            return if session.is_healthy() {
                SessionStatus::Ready {
                    established_at: session.established_at(),
                }
            } else {
                SessionStatus::Unhealthy {
                    established_at: session.established_at(),
                }
            };
        }
        match self.failure_slot().as_ref() {
            Some(failure) => SessionStatus::Failed {
                reason: failure.reason.clone(),
                since: failure.since,
            },
            None => SessionStatus::NotEstablished,
        }
    }

    /// Stop the current session, if any.
    pub async fn shutdown(&self) {
        if let Some(session) = self.current.write().await.take() {
            session.shutdown();
        }
    }

    async fn healthy_session(&self) -> Option<Arc<NetworkSession>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|session| session.is_healthy())
            .cloned()
    }

    fn cooldown_remaining(&self) -> Option<Duration> {
        let slot = self.failure_slot();
        let elapsed = slot.as_ref()?.at.elapsed();
        self.config.rebuild_cooldown.checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    fn last_failure_reason(&self) -> Option<String> {
        self.failure_slot().as_ref().map(|f| f.reason.clone())
    }

    fn failure_slot(&self) -> std::sync::MutexGuard<'_, Option<BootstrapFailure>> {
        self.last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
