// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Receipt Reconciler
//!
//! Background task that resolves receipts left pending when a submission
//! timed out before its commit event arrived.
//!
//! ## Strategy
//!
//! Every `interval` (default 15 s) the reconciler:
//! 1. Lists up to `batch_size` pending receipts.
//! 2. Looks each transaction up on the ledger through the gateway.
//! 3. Resolves the receipt once the status is final; pending or unknown
//!    transactions are retried on the next sweep.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ledger::LedgerGateway;
use crate::storage::receipts::ReceiptDatabase;

/// Default interval between reconciliation sweeps.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// Default number of receipts examined per sweep.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Counts from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub resolved: usize,
    pub failed: usize,
}

pub struct Reconciler {
    gateway: Arc<LedgerGateway>,
    receipts: Arc<ReceiptDatabase>,
    interval: Duration,
    batch_size: usize,
}

impl Reconciler {
    pub fn new(gateway: Arc<LedgerGateway>, receipts: Arc<ReceiptDatabase>) -> Self {
        Self {
            gateway,
            receipts,
            interval: DEFAULT_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(reconciler.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            batch_size = self.batch_size,
            "Receipt reconciler starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Receipt reconciler shutting down");
                return;
            }

            self.reconcile_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Receipt reconciler shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep over the pending receipts.
    pub async fn reconcile_step(&self) -> SweepReport {
        let pending = match self.receipts.list_pending(self.batch_size) {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Receipt reconciler: failed to list pending receipts");
                return SweepReport::default();
            }
        };

        let mut report = SweepReport {
            examined: pending.len(),
            ..SweepReport::default()
        };
        if pending.is_empty() {
            return report;
        }

        debug!(count = pending.len(), "Receipt reconciler: checking pending receipts");

        for receipt in &pending {
            match self.gateway.reconcile(&receipt.transaction_id).await {
                Ok(status) if status.is_final() => report.resolved += 1,
                Ok(_) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        tx_id = %receipt.transaction_id,
                        error = %e,
                        "Receipt reconciler: status lookup failed"
                    );
                }
            }
        }

        if report.resolved > 0 {
            info!(
                resolved = report.resolved,
                remaining = report.examined - report.resolved,
                "Receipt reconciler: resolved pending receipts"
            );
        }
        report
    }
}
