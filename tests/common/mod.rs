// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{body::to_bytes, response::Response, Router};
use ledger_blog_server::{
    api::router,
    config::{AppConfig, LedgerConfig},
    ledger::{InMemoryNetwork, LedgerGateway},
    state::AppState,
    storage::{ReceiptDatabase, RECEIPTS_FILE},
    store::InMemoryStore,
};
use tempfile::TempDir;

pub const CHANNEL: &str = "mychannel";

/// Environment for a single-org network, with `overrides` applied on top.
pub fn env(overrides: &[(&str, &str)]) -> HashMap<String, String> {
    let mut vars: HashMap<String, String> = [
        ("FABRIC_CA_URL", "http://localhost:7054"),
        ("FABRIC_ADMIN_NAME", "admin"),
        ("FABRIC_ADMIN_SECRET", "adminpw"),
        ("FABRIC_ORG_NAME", "org1"),
        ("FABRIC_ORG_MSP_ID", "Org1MSP"),
        ("FABRIC_CHANNEL_NAME", CHANNEL),
        ("FABRIC_PEER_NAME", "peer0"),
        ("FABRIC_PEER_URL", "grpc://localhost:7051"),
        ("FABRIC_ORDERER_NAME", "orderer0"),
        ("FABRIC_ORDERER_URL", "grpc://localhost:7050"),
        ("FABRIC_EVENTHUB_NAME", "eventhub0"),
        ("FABRIC_EVENTHUB_URL", "grpc://localhost:7053"),
        ("LEDGER_TRANSPORT", "memory"),
        ("LEDGER_COMMIT_TIMEOUT_MS", "2000"),
        ("LEDGER_REQUEST_TIMEOUT_MS", "1000"),
        ("LEDGER_REBUILD_COOLDOWN_MS", "200"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    vars
}

pub fn config(overrides: &[(&str, &str)]) -> AppConfig {
    let vars = env(overrides);
    AppConfig::from_lookup(|var| vars.get(var).cloned())
        .unwrap_or_else(|e| panic!("test configuration rejected: {e}"))
}

pub fn ledger_config() -> LedgerConfig {
    config(&[]).ledger
}

/// Gateway over a fresh in-process network.
pub fn gateway(config: LedgerConfig) -> (InMemoryNetwork, LedgerGateway) {
    let network = InMemoryNetwork::new(CHANNEL);
    let gateway = LedgerGateway::new(Arc::new(network.clone()), config);
    (network, gateway)
}

pub struct TestApp {
    pub router: Router,
    pub network: InMemoryNetwork,
    pub gateway: Arc<LedgerGateway>,
    pub receipts: Arc<ReceiptDatabase>,
    _data_dir: TempDir,
}

/// Full router over an in-process network and a temporary receipt log.
pub fn app(chaincode_api: bool) -> TestApp {
    app_with(ledger_config(), chaincode_api)
}

pub fn app_with(config: LedgerConfig, chaincode_api: bool) -> TestApp {
    let data_dir = tempfile::tempdir().unwrap();
    let receipts = Arc::new(ReceiptDatabase::open(&data_dir.path().join(RECEIPTS_FILE)).unwrap());
    let (network, gateway) = gateway(config);
    let gateway = Arc::new(gateway.with_receipts(Arc::clone(&receipts)));
    let state = AppState::new(InMemoryStore::new(), Arc::clone(&gateway))
        .with_chaincode_api(chaincode_api);

    TestApp {
        router: router(state),
        network,
        gateway,
        receipts,
        _data_dir: data_dir,
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
