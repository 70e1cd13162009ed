// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `HttpTransport` against a fake REST ledger gateway served on an
//! ephemeral port. One server plays CA, peer, orderer and event hub.

mod common;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use ledger_blog_server::{
    config::{LedgerConfig, TransportKind},
    ledger::{
        ErrorClass, HttpTransport, LedgerGateway, TransactionId, TransactionOutcome,
        TransactionStatus,
    },
};

const CERT_PEM: &str = "-----BEGIN CERTIFICATE-----\nAAEC\n-----END CERTIFICATE-----\n";

#[derive(Default)]
struct FakeLedger {
    world: Mutex<HashMap<String, String>>,
    /// Endorsed but not yet ordered: tx id -> (function, args).
    endorsed: Mutex<HashMap<String, (String, Vec<String>)>>,
    committed: Mutex<HashSet<String>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<String>>>,
    proposals: Mutex<Vec<Value>>,
    blocks: Mutex<u64>,
    /// Answer proposals with 404, as a peer without the chaincode does.
    chaincode_missing: AtomicBool,
    /// Answer broadcasts with 403.
    broadcast_forbidden: AtomicBool,
}

type Fake = Arc<FakeLedger>;

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn enroll(headers: HeaderMap) -> Response {
    let expected = format!("Basic {}", STANDARD.encode("admin:adminpw"));
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "success": true,
        "result": { "Cert": STANDARD.encode(CERT_PEM) },
        "errors": []
    }))
    .into_response()
}

async fn channel_info(Path(channel): Path<String>) -> Response {
    if channel == common::CHANNEL {
        Json(json!({ "name": channel })).into_response()
    } else {
        error(StatusCode::NOT_FOUND, "channel does not exist")
    }
}

async fn proposal(
    State(fake): State<Fake>,
    Path((_channel, _chaincode)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if fake.chaincode_missing.load(Ordering::SeqCst) {
        return error(StatusCode::NOT_FOUND, "chaincode not found");
    }
    fake.proposals.lock().unwrap().push(body.clone());

    let function = body["function"].as_str().unwrap_or_default().to_string();
    let args: Vec<String> = body["args"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let key = args.first().cloned().unwrap_or_default();
    let exists = fake.world.lock().unwrap().contains_key(&key);

    if body["mode"] == "evaluate" {
        let state = fake
            .world
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| "NOT_FOUND".to_string());
        return Json(json!({ "payload": state })).into_response();
    }

    match function.as_str() {
        "add" if exists => return error(StatusCode::BAD_REQUEST, "entity already exists"),
        "delete" if !exists => return error(StatusCode::BAD_REQUEST, "entity does not exist"),
        _ => {}
    }
    let tx_id = body["tx_id"].as_str().unwrap_or_default().to_string();
    fake.endorsed.lock().unwrap().insert(tx_id, (function, args));
    Json(json!({ "payload": "endorsed" })).into_response()
}

async fn broadcast(State(fake): State<Fake>, Json(body): Json<Value>) -> Response {
    if fake.broadcast_forbidden.load(Ordering::SeqCst) {
        return error(StatusCode::FORBIDDEN, "creator is not a member of the channel");
    }
    let tx_id = body["tx_id"].as_str().unwrap_or_default().to_string();
    let Some((function, args)) = fake.endorsed.lock().unwrap().remove(&tx_id) else {
        return error(StatusCode::BAD_REQUEST, "unknown transaction");
    };

    {
        let mut world = fake.world.lock().unwrap();
        match function.as_str() {
            "delete" => {
                world.remove(&args[0]);
            }
            _ => {
                world.insert(args[0].clone(), args[1].clone());
            }
        }
    }
    fake.committed.lock().unwrap().insert(tx_id.clone());
    let block = {
        let mut blocks = fake.blocks.lock().unwrap();
        *blocks += 1;
        *blocks
    };

    let line = format!(
        "{}\n",
        json!({ "tx_id": tx_id, "validation_code": "VALID", "block_number": block })
    );
    fake.subscribers
        .lock()
        .unwrap()
        .retain(|subscriber| subscriber.send(line.clone()).is_ok());
    Json(json!({ "status": "SUCCESS" })).into_response()
}

async fn events(State(fake): State<Fake>) -> Response {
    let (sender, receiver) = mpsc::unbounded_channel::<String>();
    fake.subscribers.lock().unwrap().push(sender);
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        receiver
            .recv()
            .await
            .map(|line| (Ok::<_, std::io::Error>(line), receiver))
    });
    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(stream),
    )
        .into_response()
}

async fn transaction(
    State(fake): State<Fake>,
    Path((_channel, tx_id)): Path<(String, String)>,
) -> Response {
    if fake.committed.lock().unwrap().contains(&tx_id) {
        Json(json!({ "validation_code": "VALID" })).into_response()
    } else if fake.endorsed.lock().unwrap().contains_key(&tx_id) {
        Json(json!({ "validation_code": null })).into_response()
    } else {
        error(StatusCode::NOT_FOUND, "transaction not found")
    }
}

async fn serve(fake: Fake) -> String {
    let app = Router::new()
        .route("/ca/api/v1/enroll", post(enroll))
        .route("/api/v1/channels/{channel}", get(channel_info))
        .route(
            "/api/v1/channels/{channel}/chaincodes/{chaincode}/proposals",
            post(proposal),
        )
        .route("/api/v1/channels/{channel}/broadcast", post(broadcast))
        .route("/api/v1/channels/{channel}/events", get(events))
        .route(
            "/api/v1/channels/{channel}/transactions/{tx_id}",
            get(transaction),
        )
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("127.0.0.1:{}", addr.port())
}

fn config(authority: &str) -> LedgerConfig {
    let ca_url = format!("http://{authority}/ca");
    let node_url = format!("grpc://{authority}");
    let mut config = common::config(&[
        ("FABRIC_CA_URL", ca_url.as_str()),
        ("FABRIC_PEER_URL", node_url.as_str()),
        ("FABRIC_ORDERER_URL", node_url.as_str()),
        ("FABRIC_EVENTHUB_URL", node_url.as_str()),
        ("LEDGER_TRANSPORT", "http"),
    ])
    .ledger;
    assert_eq!(config.transport, TransportKind::Http);
    config.request_timeout = Duration::from_secs(2);
    config
}

fn gateway(config: LedgerConfig) -> LedgerGateway {
    let transport = HttpTransport::new(config.request_timeout).unwrap();
    LedgerGateway::new(Arc::new(transport), config)
}

#[tokio::test]
async fn operations_round_trip_over_rest() {
    let fake = Fake::default();
    let authority = serve(Arc::clone(&fake)).await;
    let gateway = gateway(config(&authority));

    let TransactionOutcome::Committed { transaction_id } =
        gateway.add("blog:1", "{\"id\":1}").await.unwrap()
    else {
        panic!("add did not commit");
    };
    assert_eq!(transaction_id.as_str().len(), 64);
    assert!(transaction_id
        .as_str()
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    assert_eq!(
        gateway.get("blog:1").await.unwrap(),
        TransactionOutcome::QueryResult {
            state: "{\"id\":1}".to_string()
        }
    );
    assert_eq!(
        gateway.transaction_status(&transaction_id).await.unwrap(),
        TransactionStatus::Committed
    );

    gateway.delete("blog:1").await.unwrap();
    assert_eq!(
        gateway.get("blog:1").await.unwrap(),
        TransactionOutcome::NotFound
    );

    let proposals = fake.proposals.lock().unwrap();
    let first = &proposals[0];
    assert_eq!(first["mode"], "endorse");
    assert_eq!(first["function"], "add");
    assert_eq!(first["msp_id"], "Org1MSP");
    assert_eq!(first["tx_id"], transaction_id.as_str());
    assert!(STANDARD.decode(first["nonce"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn chaincode_rejection_is_a_ledger_error() {
    let fake = Fake::default();
    let authority = serve(Arc::clone(&fake)).await;
    let gateway = gateway(config(&authority));

    gateway.add("tag:1", "rust").await.unwrap();
    let err = gateway.add("tag:1", "rust").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Ledger);
    assert!(err.to_string().contains("entity already exists"));

    let err = gateway.delete("tag:2").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Ledger);
}

#[tokio::test]
async fn rejected_enrollment_is_a_transport_error() {
    let authority = serve(Fake::default()).await;
    let mut config = config(&authority);
    config.admin_secret = "wrong".to_string();
    let gateway = gateway(config);

    let err = gateway.get("blog:1").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Transport);
    assert!(err.to_string().contains("authentication failure"));
}

#[tokio::test]
async fn unknown_channel_fails_bootstrap() {
    let authority = serve(Fake::default()).await;
    let mut config = config(&authority);
    config.topology.channel = "otherchannel".to_string();
    let gateway = gateway(config);

    let err = gateway.warm_up().await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Transport);
}

#[tokio::test]
async fn unreachable_ca_is_a_transport_error() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let authority = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
    drop(listener);

    let gateway = gateway(config(&authority));
    let err = gateway.add("blog:1", "v").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Transport);
}

#[tokio::test]
async fn missing_chaincode_route_is_a_transport_error_not_not_found() {
    let fake = Fake::default();
    fake.chaincode_missing.store(true, Ordering::SeqCst);
    let authority = serve(Arc::clone(&fake)).await;
    let gateway = gateway(config(&authority));

    let err = gateway.get("blog:1").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Transport);

    let err = gateway.add("blog:1", "v").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Transport);
}

#[tokio::test]
async fn forbidden_broadcast_is_a_transport_error() {
    let fake = Fake::default();
    fake.broadcast_forbidden.store(true, Ordering::SeqCst);
    let authority = serve(Arc::clone(&fake)).await;
    let gateway = gateway(config(&authority));

    let err = gateway.set("blog:1", "v").await.unwrap_err();
    assert_eq!(err.classification(), ErrorClass::Transport);
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn unknown_transaction_lookup_is_unknown() {
    let authority = serve(Fake::default()).await;
    let gateway = gateway(config(&authority));

    assert_eq!(
        gateway
            .transaction_status(&TransactionId::new("f".repeat(64)))
            .await
            .unwrap(),
        TransactionStatus::Unknown
    );
}
