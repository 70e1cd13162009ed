// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Event Hub Listener
//!
//! Long-lived task that consumes the commit stream of one session and hands
//! each [`CommitEvent`] to the operation waiting for it.
//!
//! Waiters register with [`EventHub::watch`] before their transaction is
//! broadcast. Events that arrive for nobody are kept in a bounded LRU buffer
//! so a watcher registered a moment too late still resolves.
//!
//! When the stream ends (the hub disconnected) the listener marks itself dead,
//! drops every pending waiter and [`EventHub::is_alive`] turns false. The
//! session manager uses that to decide the session must be rebuilt.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{CommitEvent, TransactionId};

/// Unclaimed commit events kept for late watchers.
const RECENT_COMMITS: usize = 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("deadline elapsed before the commit event arrived")]
    Elapsed,

    #[error("event hub stream closed")]
    Disconnected,
}

struct Dispatch {
    alive: bool,
    waiters: HashMap<TransactionId, oneshot::Sender<CommitEvent>>,
    recent: LruCache<TransactionId, CommitEvent>,
}

struct Inner {
    name: String,
    alive: AtomicBool,
    dispatch: Mutex<Dispatch>,
}

impl Inner {
    fn dispatch(&self) -> MutexGuard<'_, Dispatch> {
        self.dispatch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn deliver(&self, event: CommitEvent) {
        let mut dispatch = self.dispatch();
        match dispatch.waiters.remove(&event.transaction_id) {
            Some(waiter) => {
                if let Err(event) = waiter.send(event) {
                    // Watcher gave up; keep the event for a status lookup.
                    dispatch.recent.put(event.transaction_id.clone(), event);
                }
            }
            None => {
                dispatch.recent.put(event.transaction_id.clone(), event);
            }
        }
    }

    fn close(&self) {
        let mut dispatch = self.dispatch();
        dispatch.alive = false;
        dispatch.waiters.clear();
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// Handle onto a running event-hub listener.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<Inner>,
}

impl EventHub {
    /// Spawn the listener over `events`. It runs until the stream ends or
    /// `shutdown` is cancelled.
    pub fn start(
        name: impl Into<String>,
        events: mpsc::Receiver<CommitEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        let inner = Arc::new(Inner {
            name: name.into(),
            alive: AtomicBool::new(true),
            dispatch: Mutex::new(Dispatch {
                alive: true,
                waiters: HashMap::new(),
                recent: LruCache::new(
                    NonZeroUsize::new(RECENT_COMMITS).unwrap_or(NonZeroUsize::MIN),
                ),
            }),
        });

        tokio::spawn(listen(Arc::clone(&inner), events, shutdown));
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    /// Register interest in the commit of `transaction_id`.
    pub fn watch(&self, transaction_id: &TransactionId) -> CommitWatch {
        let mut dispatch = self.inner.dispatch();
        if let Some(event) = dispatch.recent.pop(transaction_id) {
            return CommitWatch {
                hub: None,
                transaction_id: transaction_id.clone(),
                state: WatchState::Ready(event),
            };
        }

        let (sender, receiver) = oneshot::channel();
        if dispatch.alive {
            dispatch.waiters.insert(transaction_id.clone(), sender);
        }
        CommitWatch {
            hub: Some(Arc::clone(&self.inner)),
            transaction_id: transaction_id.clone(),
            state: WatchState::Waiting(receiver),
        }
    }

    /// Commit event already seen for a transaction nobody claimed.
    pub fn recent(&self, transaction_id: &TransactionId) -> Option<CommitEvent> {
        self.inner.dispatch().recent.peek(transaction_id).cloned()
    }

    /// Number of registered waiters.
    pub fn pending_watches(&self) -> usize {
        self.inner.dispatch().waiters.len()
    }
}

async fn listen(
    inner: Arc<Inner>,
    mut events: mpsc::Receiver<CommitEvent>,
    shutdown: CancellationToken,
) {
    info!(event_hub = %inner.name, "Event hub listener starting");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(event_hub = %inner.name, "Event hub listener shutting down");
                break;
            }
            event = events.recv() => match event {
                Some(event) => {
                    debug!(
                        event_hub = %inner.name,
                        tx_id = %event.transaction_id,
                        block = event.block_number,
                        "Commit event received"
                    );
                    inner.deliver(event);
                }
                None => {
                    warn!(event_hub = %inner.name, "Event hub stream closed");
                    break;
                }
            }
        }
    }

    inner.close();
}

enum WatchState {
    Ready(CommitEvent),
    Waiting(oneshot::Receiver<CommitEvent>),
    Released,
}

/// Pending interest in one transaction's commit event.
///
/// Dropping the watch unregisters it.
pub struct CommitWatch {
    hub: Option<Arc<Inner>>,
    transaction_id: TransactionId,
    state: WatchState,
}

impl CommitWatch {
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Wait for the commit event until `deadline`.
    pub async fn wait_until(mut self, deadline: Instant) -> Result<CommitEvent, WaitError> {
        let state = std::mem::replace(&mut self.state, WatchState::Released);
        match state {
            WatchState::Ready(event) => Ok(event),
            WatchState::Released => Err(WaitError::Disconnected),
            WatchState::Waiting(receiver) => match tokio::time::timeout_at(deadline, receiver).await {
                Ok(Ok(event)) => Ok(event),
                Ok(Err(_)) => Err(WaitError::Disconnected),
                Err(_) => Err(WaitError::Elapsed),
            },
        }
    }
}

impl Drop for CommitWatch {
    fn drop(&mut self) {
        // A delivered event already took the waiter out; anything left is ours.
        if let Some(hub) = &self.hub {
            hub.dispatch().waiters.remove(&self.transaction_id);
        }
    }
}
