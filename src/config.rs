// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the typed configuration loaded
//! once at startup. A missing required variable is a startup error, never a
//! per-request one.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `FABRIC_CA_URL` | Certificate authority base URL | Required |
//! | `FABRIC_ADMIN_NAME` | Admin enrollment id | Required |
//! | `FABRIC_ADMIN_SECRET` | Admin enrollment secret | Required |
//! | `FABRIC_ORG_NAME` | Organization name | Required |
//! | `FABRIC_ORG_MSP_ID` | Membership service id | Required |
//! | `FABRIC_AFFILIATION` | Admin affiliation | org name |
//! | `FABRIC_CHANNEL_NAME` | Channel name | Required |
//! | `FABRIC_CHAINCODE_NAME` | Chaincode invoked by operations | `blog` |
//! | `FABRIC_PEER_NAME` / `FABRIC_PEER_URL` | Endorsing peer | Required |
//! | `FABRIC_ORDERER_NAME` / `FABRIC_ORDERER_URL` | Orderer | Required |
//! | `FABRIC_EVENTHUB_NAME` / `FABRIC_EVENTHUB_URL` | Event hub | Required |
//! | `LEDGER_TRANSPORT` | `http` or `memory` | `http` |
//! | `LEDGER_COMMIT_TIMEOUT_MS` | Deadline per ledger operation | `30000` |
//! | `LEDGER_REQUEST_TIMEOUT_MS` | Timeout per network request | `10000` |
//! | `LEDGER_REBUILD_COOLDOWN_MS` | Pause after a failed session bootstrap | `5000` |
//! | `DATA_DIR` | Directory holding the receipt database | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | Optional |
//! | `CHAINCODE_API_ENABLED` | Expose `/api/blogs/{id}/chaincode` | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::ledger::types::{ChannelTopology, Endpoint};
use crate::ledger::memory::DEFAULT_CHAINCODE;

pub const FABRIC_CA_URL_ENV: &str = "FABRIC_CA_URL";
pub const FABRIC_ADMIN_NAME_ENV: &str = "FABRIC_ADMIN_NAME";
pub const FABRIC_ADMIN_SECRET_ENV: &str = "FABRIC_ADMIN_SECRET";
pub const FABRIC_ORG_NAME_ENV: &str = "FABRIC_ORG_NAME";
pub const FABRIC_ORG_MSP_ID_ENV: &str = "FABRIC_ORG_MSP_ID";
pub const FABRIC_AFFILIATION_ENV: &str = "FABRIC_AFFILIATION";
pub const FABRIC_CHANNEL_NAME_ENV: &str = "FABRIC_CHANNEL_NAME";
pub const FABRIC_CHAINCODE_NAME_ENV: &str = "FABRIC_CHAINCODE_NAME";
pub const FABRIC_PEER_NAME_ENV: &str = "FABRIC_PEER_NAME";
pub const FABRIC_PEER_URL_ENV: &str = "FABRIC_PEER_URL";
pub const FABRIC_ORDERER_NAME_ENV: &str = "FABRIC_ORDERER_NAME";
pub const FABRIC_ORDERER_URL_ENV: &str = "FABRIC_ORDERER_URL";
pub const FABRIC_EVENTHUB_NAME_ENV: &str = "FABRIC_EVENTHUB_NAME";
pub const FABRIC_EVENTHUB_URL_ENV: &str = "FABRIC_EVENTHUB_URL";

pub const LEDGER_TRANSPORT_ENV: &str = "LEDGER_TRANSPORT";
pub const LEDGER_COMMIT_TIMEOUT_MS_ENV: &str = "LEDGER_COMMIT_TIMEOUT_MS";
pub const LEDGER_REQUEST_TIMEOUT_MS_ENV: &str = "LEDGER_REQUEST_TIMEOUT_MS";
pub const LEDGER_REBUILD_COOLDOWN_MS_ENV: &str = "LEDGER_REBUILD_COOLDOWN_MS";

/// Environment variable name for the directory holding the receipt database.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const CHAINCODE_API_ENABLED_ENV: &str = "CHAINCODE_API_ENABLED";

/// Environment variable selecting the log output format.
///
/// `json` emits one JSON object per line for log aggregation; anything else
/// uses the human-readable formatter.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_REBUILD_COOLDOWN: Duration = Duration::from_millis(5_000);
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Which [`FabricTransport`](crate::ledger::transport::FabricTransport) backs the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// REST gateways in front of the CA, peer, orderer and event hub.
    Http,
    /// In-process network; no external infrastructure.
    Memory,
}

/// Everything the gateway needs to bootstrap a session and run operations.
#[derive(Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub ca_url: String,
    pub admin_name: String,
    pub admin_secret: String,
    pub organization: String,
    pub msp_id: String,
    pub affiliation: String,
    pub chaincode: String,
    pub topology: ChannelTopology,
    pub transport: TransportKind,
    pub commit_timeout: Duration,
    pub request_timeout: Duration,
    pub rebuild_cooldown: Duration,
}

impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("ca_url", &self.ca_url)
            .field("admin_name", &self.admin_name)
            .field("admin_secret", &"<redacted>")
            .field("organization", &self.organization)
            .field("msp_id", &self.msp_id)
            .field("affiliation", &self.affiliation)
            .field("chaincode", &self.chaincode)
            .field("topology", &self.topology)
            .field("transport", &self.transport)
            .field("commit_timeout", &self.commit_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("rebuild_cooldown", &self.rebuild_cooldown)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub tls: Option<TlsPaths>,
    pub chaincode_api_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load through an arbitrary lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let organization = required(FABRIC_ORG_NAME_ENV)?;
        let topology = ChannelTopology {
            channel: required(FABRIC_CHANNEL_NAME_ENV)?,
            peer: Endpoint::peer(required(FABRIC_PEER_NAME_ENV)?, required(FABRIC_PEER_URL_ENV)?),
            orderer: Endpoint::orderer(
                required(FABRIC_ORDERER_NAME_ENV)?,
                required(FABRIC_ORDERER_URL_ENV)?,
            ),
            event_hub: Endpoint::event_hub(
                required(FABRIC_EVENTHUB_NAME_ENV)?,
                required(FABRIC_EVENTHUB_URL_ENV)?,
            ),
        };

        let transport = match get(LEDGER_TRANSPORT_ENV).as_deref() {
            None | Some("http") => TransportKind::Http,
            Some("memory") => TransportKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LEDGER_TRANSPORT_ENV,
                    reason: format!("expected `http` or `memory`, got `{other}`"),
                })
            }
        };

        let ledger = LedgerConfig {
            ca_url: required(FABRIC_CA_URL_ENV)?,
            admin_name: required(FABRIC_ADMIN_NAME_ENV)?,
            admin_secret: required(FABRIC_ADMIN_SECRET_ENV)?,
            msp_id: required(FABRIC_ORG_MSP_ID_ENV)?,
            affiliation: get(FABRIC_AFFILIATION_ENV).unwrap_or_else(|| organization.clone()),
            chaincode: get(FABRIC_CHAINCODE_NAME_ENV).unwrap_or_else(|| DEFAULT_CHAINCODE.to_string()),
            organization,
            topology,
            transport,
            commit_timeout: millis(&get, LEDGER_COMMIT_TIMEOUT_MS_ENV, DEFAULT_COMMIT_TIMEOUT)?,
            request_timeout: millis(&get, LEDGER_REQUEST_TIMEOUT_MS_ENV, DEFAULT_REQUEST_TIMEOUT)?,
            rebuild_cooldown: millis(&get, LEDGER_REBUILD_COOLDOWN_MS_ENV, DEFAULT_REBUILD_COOLDOWN)?,
        };

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                var: PORT_ENV,
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let server = ServerConfig {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: get(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            tls,
            chaincode_api_enabled: flag(get(CHAINCODE_API_ENABLED_ENV)),
        };

        Ok(Self { ledger, server })
    }
}

fn millis<G>(get: &G, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => match raw.parse::<u64>() {
            Ok(0) => Err(ConfigError::Invalid {
                var,
                reason: "must be greater than zero".to_string(),
            }),
            Ok(ms) => Ok(Duration::from_millis(ms)),
            Err(e) => Err(ConfigError::Invalid {
                var,
                reason: e.to_string(),
            }),
        },
    }
}

fn flag(value: Option<String>) -> bool {
    matches!(
        value.map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Ledger config pointing at `mychannel` with short timeouts.
#[cfg(test)]
pub(crate) fn test_ledger_config() -> LedgerConfig {
    LedgerConfig {
        ca_url: "http://localhost:7054".into(),
        admin_name: "admin".into(),
        admin_secret: "adminpw".into(),
        organization: "org1".into(),
        msp_id: "Org1MSP".into(),
        affiliation: "org1".into(),
        chaincode: DEFAULT_CHAINCODE.into(),
        topology: ChannelTopology {
            channel: "mychannel".into(),
            peer: Endpoint::peer("peer0.org1.example.com", "grpc://localhost:7051"),
            orderer: Endpoint::orderer("orderer.example.com", "grpc://localhost:7050"),
            event_hub: Endpoint::event_hub("peer0.org1.example.com", "grpc://localhost:7053"),
        },
        transport: TransportKind::Memory,
        commit_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(1),
        rebuild_cooldown: Duration::from_millis(200),
    }
}
