// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # HTTP Transport
//!
//! [`FabricTransport`] over the REST gateways that front the certificate
//! authority, peer, orderer and event hub.
//!
//! ## Routes
//!
//! | Call | Request |
//! |------|---------|
//! | enroll | `POST {ca}/api/v1/enroll` (basic auth) |
//! | initialize | `GET {peer}/api/v1/channels/{channel}` |
//! | endorse / query | `POST {peer}/api/v1/channels/{channel}/chaincodes/{chaincode}/proposals` |
//! | broadcast | `POST {orderer}/api/v1/channels/{channel}/broadcast` |
//! | commit stream | `GET {event_hub}/api/v1/channels/{channel}/events` (NDJSON) |
//! | status | `GET {peer}/api/v1/channels/{channel}/transactions/{tx_id}` |
//!
//! `grpc://` and `grpcs://` endpoint URLs are reached over `http://` and
//! `https://` respectively. Transaction ids are derived client-side from a
//! fresh nonce and the creator identity, so the id is known before the peer
//! sees the proposal.

use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use super::channel::Channel;
use super::error::NetworkError;
use super::transport::FabricTransport;
use super::types::{
    generate_nonce, ChaincodeCall, CommitEvent, CommitStatus, Endorsement, Endpoint, EndpointRole,
    Enrollment, EnrollmentRequest, TransactionId, TransactionStatus,
};

/// Validation code the committing peer reports for a valid transaction.
const VALID: &str = "VALID";

const EVENT_BUFFER: usize = 256;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct EnrollBody<'a> {
    affiliation: &'a str,
    msp_id: &'a str,
}

/// Fabric CA response envelope.
#[derive(Debug, Deserialize)]
struct CaEnvelope {
    success: bool,
    result: Option<CaEnrollResult>,
    #[serde(default)]
    errors: Vec<CaMessage>,
}

#[derive(Debug, Deserialize)]
struct CaEnrollResult {
    /// Base64 of the PEM certificate.
    #[serde(rename = "Cert")]
    cert: String,
    #[serde(rename = "KeyHandle", default)]
    key_handle: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum ProposalMode {
    Endorse,
    Evaluate,
}

#[derive(Debug, Serialize)]
struct ProposalBody<'a> {
    tx_id: &'a str,
    nonce: String,
    msp_id: &'a str,
    creator: String,
    mode: ProposalMode,
    function: &'a str,
    args: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ProposalResponse {
    payload: String,
}

#[derive(Debug, Serialize)]
struct BroadcastBody<'a> {
    tx_id: &'a str,
    payload: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireCommitEvent {
    tx_id: String,
    validation_code: String,
    block_number: u64,
}

#[derive(Debug, Deserialize)]
struct WireTransaction {
    /// Absent while the transaction is not yet in a block.
    validation_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// HttpTransport
// =============================================================================

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    /// No overall timeout: the commit stream stays open for the session lifetime.
    stream_client: Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| NetworkError::Protocol(format!("failed to build HTTP client: {e}")))?;
        let stream_client = Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| NetworkError::Protocol(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            stream_client,
        })
    }

    fn channel_url(
        channel: &Channel,
        role: EndpointRole,
        extra: &[&str],
    ) -> Result<Url, NetworkError> {
        let endpoint = channel.endpoint(role).ok_or_else(|| {
            NetworkError::Protocol(format!("no {role} registered on channel `{}`", channel.name()))
        })?;
        let mut segments = vec!["api", "v1", "channels", channel.name()];
        segments.extend_from_slice(extra);
        endpoint_url(&endpoint.url, &segments)
    }
}

/// Map an endpoint URL onto its REST gateway and append path segments.
fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url, NetworkError> {
    let rest = if let Some(rest) = base.strip_prefix("grpcs://") {
        format!("https://{rest}")
    } else if let Some(rest) = base.strip_prefix("grpc://") {
        format!("http://{rest}")
    } else {
        base.to_string()
    };

    let mut url =
        Url::parse(&rest).map_err(|e| NetworkError::Protocol(format!("invalid URL `{base}`: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| NetworkError::Protocol(format!("URL `{base}` cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn request_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout
    } else if err.is_connect() {
        NetworkError::Unreachable(err.to_string())
    } else {
        NetworkError::Protocol(err.to_string())
    }
}

/// Pass 2xx responses through; turn everything else into a [`NetworkError`].
///
/// A 404 or an authorization failure means the gateway, route or identity is
/// wrong, never that the chaincode refused the request: those are protocol
/// faults. Lookups where a 404 is a real answer use [`check_lookup_status`].
async fn check_status(response: Response) -> Result<Response, NetworkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = error_reason(response).await;
    Err(match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => NetworkError::Timeout,
        StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            NetworkError::Protocol(format!("HTTP {status}: {reason}"))
        }
        s if s.is_client_error() => NetworkError::Rejected(reason),
        s => NetworkError::Protocol(format!("HTTP {s}: {reason}")),
    })
}

/// Like [`check_status`], but a 404 reports the looked-up resource missing.
async fn check_lookup_status(response: Response) -> Result<Response, NetworkError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(NetworkError::NotFound(error_reason(response).await));
    }
    check_status(response).await
}

async fn error_reason(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body,
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, NetworkError> {
    response
        .json()
        .await
        .map_err(|e| NetworkError::Protocol(format!("malformed response: {e}")))
}

fn commit_event(wire: WireCommitEvent) -> CommitEvent {
    CommitEvent {
        transaction_id: TransactionId::new(wire.tx_id),
        status: if wire.validation_code == VALID {
            CommitStatus::Valid
        } else {
            CommitStatus::Invalid(wire.validation_code)
        },
        block_number: wire.block_number,
    }
}

impl HttpTransport {
    async fn propose(
        &self,
        channel: &Channel,
        call: &ChaincodeCall,
        mode: ProposalMode,
    ) -> Result<(TransactionId, String), NetworkError> {
        let identity = channel.identity();
        let nonce = generate_nonce()
            .map_err(|_| NetworkError::Protocol("system random source unavailable".to_string()))?;
        let transaction_id = TransactionId::derive(&nonce, identity);

        let url = Self::channel_url(
            channel,
            EndpointRole::Peer,
            &["chaincodes", &call.chaincode, "proposals"],
        )?;
        let body = ProposalBody {
            tx_id: transaction_id.as_str(),
            nonce: Base64::encode_string(&nonce),
            msp_id: &identity.msp_id,
            creator: Base64::encode_string(&identity.creator()),
            mode,
            function: &call.function,
            args: &call.args,
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let proposal: ProposalResponse = read_json(check_status(response).await?).await?;
        Ok((transaction_id, proposal.payload))
    }
}

#[async_trait]
impl FabricTransport for HttpTransport {
    async fn enroll(
        &self,
        ca_url: &str,
        request: &EnrollmentRequest,
    ) -> Result<Enrollment, NetworkError> {
        let url = endpoint_url(ca_url, &["api", "v1", "enroll"])?;
        let response = self
            .client
            .post(url)
            .basic_auth(&request.enrollment_id, Some(&request.secret))
            .json(&EnrollBody {
                affiliation: &request.affiliation,
                msp_id: &request.msp_id,
            })
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(NetworkError::Rejected("authentication failure".to_string()));
        }
        let envelope: CaEnvelope = read_json(check_status(response).await?).await?;

        let result = match envelope.result {
            Some(result) if envelope.success => result,
            _ => {
                let messages: Vec<String> = envelope
                    .errors
                    .iter()
                    .map(|m| format!("[{}] {}", m.code, m.message))
                    .collect();
                return Err(NetworkError::Rejected(if messages.is_empty() {
                    "enrollment refused".to_string()
                } else {
                    messages.join("; ")
                }));
            }
        };

        let pem_bytes = Base64::decode_vec(&result.cert)
            .map_err(|e| NetworkError::Protocol(format!("certificate is not base64: {e}")))?;
        let certificate_pem = String::from_utf8(pem_bytes)
            .map_err(|e| NetworkError::Protocol(format!("certificate is not UTF-8: {e}")))?;

        Ok(Enrollment {
            certificate_pem,
            key_handle: result
                .key_handle
                .unwrap_or_else(|| format!("ca-key-{}", uuid::Uuid::new_v4())),
        })
    }

    async fn probe(&self, endpoint: &Endpoint) -> Result<(), NetworkError> {
        // Any HTTP answer proves the gateway is listening.
        let url = endpoint_url(&endpoint.url, &["api", "v1"])?;
        self.client.get(url).send().await.map_err(request_error)?;
        Ok(())
    }

    async fn initialize_channel(&self, channel: &Channel) -> Result<(), NetworkError> {
        let url = Self::channel_url(channel, EndpointRole::Peer, &[])?;
        let response = self.client.get(url).send().await.map_err(request_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn endorse(
        &self,
        channel: &Channel,
        call: &ChaincodeCall,
    ) -> Result<Endorsement, NetworkError> {
        let (transaction_id, payload) = self.propose(channel, call, ProposalMode::Endorse).await?;
        debug!(tx_id = %transaction_id, function = %call.function, "Proposal endorsed");
        Ok(Endorsement {
            transaction_id,
            payload,
        })
    }

    async fn broadcast(
        &self,
        channel: &Channel,
        endorsement: &Endorsement,
    ) -> Result<(), NetworkError> {
        let url = Self::channel_url(channel, EndpointRole::Orderer, &["broadcast"])?;
        let response = self
            .client
            .post(url)
            .json(&BroadcastBody {
                tx_id: endorsement.transaction_id.as_str(),
                payload: &endorsement.payload,
            })
            .send()
            .await
            .map_err(request_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn query(&self, channel: &Channel, call: &ChaincodeCall) -> Result<String, NetworkError> {
        let (_, payload) = self.propose(channel, call, ProposalMode::Evaluate).await?;
        Ok(payload)
    }

    async fn subscribe_commits(
        &self,
        channel: &Channel,
    ) -> Result<mpsc::Receiver<CommitEvent>, NetworkError> {
        let url = Self::channel_url(channel, EndpointRole::EventHub, &["events"])?;
        let response = self
            .stream_client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/x-ndjson")
            .send()
            .await
            .map_err(request_error)?;
        let response = check_status(response).await?;

        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(response, sender, url));
        Ok(receiver)
    }

    async fn transaction_status(
        &self,
        channel: &Channel,
        transaction_id: &TransactionId,
    ) -> Result<TransactionStatus, NetworkError> {
        let url = Self::channel_url(
            channel,
            EndpointRole::Peer,
            &["transactions", transaction_id.as_str()],
        )?;
        let response = self.client.get(url).send().await.map_err(request_error)?;
        let transaction: WireTransaction = read_json(check_lookup_status(response).await?).await?;

        Ok(match transaction.validation_code {
            None => TransactionStatus::Pending,
            Some(code) if code == VALID => TransactionStatus::Committed,
            Some(code) => TransactionStatus::Rejected { reason: code },
        })
    }
}

/// Read the NDJSON commit stream into `sender` until either side goes away.
async fn pump_events(mut response: Response, sender: mpsc::Sender<CommitEvent>, url: Url) {
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let chunk = tokio::select! {
            _ = sender.closed() => break,
            chunk = response.chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                buffer.extend_from_slice(&bytes);
                while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    let line = line.trim_ascii();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_slice::<WireCommitEvent>(line) {
                        Ok(wire) => {
                            if sender.send(commit_event(wire)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!(url = %url, error = %e, "Skipping malformed commit event"),
                    }
                }
            }
            Ok(None) => {
                debug!(url = %url, "Commit stream ended");
                break;
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Commit stream failed");
                break;
            }
        }
    }
}
