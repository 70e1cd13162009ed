// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end ledger gateway behavior against the in-process network.

mod common;

use std::sync::Arc;
use std::time::Duration;

use ledger_blog_server::ledger::{
    memory::MVCC_READ_CONFLICT, types::EndpointRole, ErrorClass, GatewayError, SessionStatus,
    TransactionId, TransactionOutcome, TransactionStatus,
};
use ledger_blog_server::storage::{ReceiptDatabase, RECEIPTS_FILE};

#[tokio::test]
async fn add_get_delete_walkthrough() {
    let (_network, gateway) = common::gateway(common::ledger_config());
    let value = "{\"title\":\"hello\"}";

    assert_eq!(
        gateway.add("42", value).await.unwrap(),
        TransactionOutcome::Committed {
            transaction_id: TransactionId::new("tx-001")
        }
    );
    assert_eq!(
        gateway.get("42").await.unwrap(),
        TransactionOutcome::QueryResult {
            state: value.to_string()
        }
    );
    assert_eq!(
        gateway.delete("42").await.unwrap(),
        TransactionOutcome::Committed {
            transaction_id: TransactionId::new("tx-002")
        }
    );
    assert_eq!(gateway.get("42").await.unwrap(), TransactionOutcome::NotFound);
}

#[tokio::test]
async fn get_of_unknown_key_is_not_found() {
    let (_network, gateway) = common::gateway(common::ledger_config());
    assert_eq!(
        gateway.get("never-added").await.unwrap(),
        TransactionOutcome::NotFound
    );
}

#[tokio::test]
async fn duplicate_add_is_a_ledger_error() {
    let (network, gateway) = common::gateway(common::ledger_config());
    gateway.add("tag:1", "first").await.unwrap();

    let err = gateway.add("tag:1", "second").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Ledger);
    assert_eq!(network.state_of("tag:1").as_deref(), Some("first"));
}

#[tokio::test]
async fn delete_of_missing_key_is_a_ledger_error() {
    let (_network, gateway) = common::gateway(common::ledger_config());
    let err = gateway.delete("tag:404").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Ledger);
}

#[tokio::test]
async fn concurrent_adds_commit_exactly_once() {
    let (network, gateway) = common::gateway(common::ledger_config());
    let gateway = Arc::new(gateway);
    gateway.warm_up().await.unwrap();
    network.set_commit_delay(Duration::from_millis(20));

    let first = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.add("blog:7", "v1").await })
    };
    let second = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.add("blog:7", "v2").await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    let committed = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.classification() == ErrorClass::Ledger))
        .count();
    assert_eq!(committed, 1);
    assert_eq!(rejected, 1);
}

#[tokio::test]
async fn timed_out_commit_resolves_out_of_band() {
    let mut config = common::ledger_config();
    config.commit_timeout = Duration::from_millis(50);
    let (network, gateway) = common::gateway(config);
    gateway.warm_up().await.unwrap();
    network.set_commit_delay(Duration::from_millis(300));

    let err = gateway.set("blog:1", "{\"id\":1}").await.unwrap_err();
    let GatewayError::TimedOut {
        transaction_id: Some(transaction_id),
        ..
    } = err
    else {
        panic!("expected a timeout carrying a transaction id, got {err:?}");
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        gateway.transaction_status(&transaction_id).await.unwrap(),
        TransactionStatus::Committed
    );
}

#[tokio::test]
async fn timed_out_conflicting_set_resolves_as_rejected() {
    let data_dir = tempfile::tempdir().unwrap();
    let receipts = Arc::new(ReceiptDatabase::open(&data_dir.path().join(RECEIPTS_FILE)).unwrap());
    let mut config = common::ledger_config();
    config.commit_timeout = Duration::from_millis(50);
    let (network, gateway) = common::gateway(config);
    let gateway = Arc::new(gateway.with_receipts(Arc::clone(&receipts)));
    gateway.warm_up().await.unwrap();
    network.set_commit_delay(Duration::from_millis(300));

    // Both endorsed against the same (absent) version before either commits.
    let first = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.set("blog:3", "v1").await })
    };
    let second = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.set("blog:3", "v2").await })
    };

    let mut transaction_ids = Vec::new();
    for result in [first.await.unwrap(), second.await.unwrap()] {
        match result {
            Err(GatewayError::TimedOut {
                transaction_id: Some(transaction_id),
                ..
            }) => transaction_ids.push(transaction_id),
            other => panic!("expected a timeout carrying a transaction id, got {other:?}"),
        }
    }
    assert_eq!(receipts.pending_count().unwrap(), 2);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let mut statuses = Vec::new();
    for transaction_id in &transaction_ids {
        statuses.push(gateway.reconcile(transaction_id).await.unwrap());
    }

    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == TransactionStatus::Committed)
            .count(),
        1
    );
    let rejected = TransactionStatus::Rejected {
        reason: MVCC_READ_CONFLICT.to_string(),
    };
    let loser = statuses
        .iter()
        .position(|s| *s == rejected)
        .unwrap_or_else(|| panic!("no conflicting commit in {statuses:?}"));

    assert_eq!(receipts.pending_count().unwrap(), 0);
    let receipt = receipts.get(&transaction_ids[loser]).unwrap().unwrap();
    assert_eq!(receipt.status, rejected);
    assert!(receipt.resolved_at.is_some());
}

#[tokio::test]
async fn never_bootstrapped_session_fails_with_transport_error() {
    let (network, gateway) = common::gateway(common::ledger_config());
    network.set_ca_reachable(false);

    for result in [
        gateway.add("k", "v").await,
        gateway.get("k").await,
        gateway.delete("k").await,
    ] {
        let err = result.unwrap_err();
        assert_eq!(err.classification(), ErrorClass::Transport);
    }
    assert_eq!(network.block_height(), 0);
    assert!(matches!(
        gateway.session_status().await,
        SessionStatus::Failed { .. }
    ));
}

#[tokio::test]
async fn unreachable_orderer_fails_bootstrap() {
    let (network, gateway) = common::gateway(common::ledger_config());
    network.set_unreachable(EndpointRole::Orderer, true);

    let err = gateway.add("k", "v").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Transport);
    assert_eq!(network.enrollment_count(), 1);
}

#[tokio::test]
async fn session_is_reused_across_operations() {
    let (network, gateway) = common::gateway(common::ledger_config());
    for i in 0..5 {
        gateway.add(&format!("tag:{i}"), "v").await.unwrap();
        gateway.get(&format!("tag:{i}")).await.unwrap();
    }
    assert_eq!(network.enrollment_count(), 1);
}

#[tokio::test]
async fn lost_event_stream_triggers_one_rebuild() {
    let (network, gateway) = common::gateway(common::ledger_config());
    gateway.warm_up().await.unwrap();
    network.disconnect_event_streams();

    // The listener notices the closed stream asynchronously.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        gateway.session_status().await,
        SessionStatus::Unhealthy { .. }
    ));

    gateway.add("blog:1", "v").await.unwrap();
    assert_eq!(network.enrollment_count(), 2);
    assert!(matches!(
        gateway.session_status().await,
        SessionStatus::Ready { .. }
    ));
}

#[tokio::test]
async fn rebuild_waits_out_the_cooldown() {
    let (network, gateway) = common::gateway(common::ledger_config());
    network.set_ca_reachable(false);
    assert!(gateway.warm_up().await.is_err());

    network.set_ca_reachable(true);
    let err = gateway.warm_up().await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Transport);
    assert_eq!(network.enrollment_count(), 0);

    tokio::time::sleep(Duration::from_millis(250)).await;
    gateway.warm_up().await.unwrap();
    assert_eq!(network.enrollment_count(), 1);
}
