// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Channel handle: identity, registered endpoints and initialization state.

use url::Url;

use super::error::BootstrapError;
use super::transport::FabricTransport;
use super::types::{Endpoint, EndpointRole, Identity};

/// URL schemes accepted for peer, orderer and event-hub endpoints.
const ENDPOINT_SCHEMES: [&str; 4] = ["grpc", "grpcs", "http", "https"];

/// Roles that must be registered before the channel can be initialized.
const REQUIRED_ROLES: [EndpointRole; 3] = [
    EndpointRole::Peer,
    EndpointRole::Orderer,
    EndpointRole::EventHub,
];

/// A channel bound to one enrolled identity.
///
/// Usable only once every required role is registered and
/// [`initialize`](Channel::initialize) has succeeded. A second
/// `initialize` is an error.
#[derive(Debug)]
pub struct Channel {
    name: String,
    identity: Identity,
    endpoints: Vec<Endpoint>,
    initialized: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, identity: Identity) -> Self {
        Self {
            name: name.into(),
            identity,
            endpoints: Vec::new(),
            initialized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn endpoint(&self, role: EndpointRole) -> Option<&Endpoint> {
        self.endpoints.iter().find(|endpoint| endpoint.role == role)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Register an endpoint after validating its URL and probing it.
    pub async fn add_endpoint(
        &mut self,
        transport: &dyn FabricTransport,
        endpoint: Endpoint,
    ) -> Result<(), BootstrapError> {
        let registration_error = |reason: String| BootstrapError::Registration {
            role: endpoint.role,
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            reason,
        };

        if self.initialized {
            return Err(registration_error(format!(
                "channel `{}` is already initialized",
                self.name
            )));
        }
        if endpoint.name.trim().is_empty() {
            return Err(registration_error("endpoint name is empty".to_string()));
        }
        validate_endpoint_url(&endpoint.url).map_err(registration_error)?;
        if self.endpoint(endpoint.role).is_some() {
            return Err(registration_error(format!(
                "a {} is already registered on channel `{}`",
                endpoint.role, self.name
            )));
        }

        transport
            .probe(&endpoint)
            .await
            .map_err(|e| registration_error(e.to_string()))?;

        tracing::debug!(
            channel = %self.name,
            role = %endpoint.role,
            name = %endpoint.name,
            url = %endpoint.url,
            "Registered channel endpoint"
        );
        self.endpoints.push(endpoint);
        Ok(())
    }

    /// Run the channel handshake.
    pub async fn initialize(&mut self, transport: &dyn FabricTransport) -> Result<(), BootstrapError> {
        if self.initialized {
            return Err(BootstrapError::AlreadyInitialized {
                channel: self.name.clone(),
            });
        }

        for role in REQUIRED_ROLES {
            if self.endpoint(role).is_none() {
                return Err(BootstrapError::ChannelInitialize {
                    channel: self.name.clone(),
                    reason: format!("no {role} registered"),
                });
            }
        }

        transport
            .initialize_channel(self)
            .await
            .map_err(|e| BootstrapError::ChannelInitialize {
                channel: self.name.clone(),
                reason: e.to_string(),
            })?;

        self.initialized = true;
        tracing::info!(channel = %self.name, "Channel initialized");
        Ok(())
    }
}

fn validate_endpoint_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL: {e}"))?;
    if !ENDPOINT_SCHEMES.contains(&url.scheme()) {
        return Err(format!("unsupported URL scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("URL has no host".to_string());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::InMemoryNetwork;
    use crate::ledger::types::Enrollment;

    fn identity() -> Identity {
        Identity {
            name: "admin".into(),
            affiliation: "org1".into(),
            msp_id: "Org1MSP".into(),
            enrollment: Enrollment {
                certificate_pem: String::new(),
                key_handle: String::new(),
            },
        }
    }

    #[test]
    fn endpoint_urls_are_validated() {
        assert!(validate_endpoint_url("grpc://localhost:7051").is_ok());
        assert!(validate_endpoint_url("https://peer0.org1.example.com").is_ok());
        assert!(validate_endpoint_url("ftp://localhost:7051").is_err());
        assert!(validate_endpoint_url("not a url").is_err());
    }

    #[tokio::test]
    async fn initialize_requires_all_roles_and_runs_once() {
        let network = InMemoryNetwork::new("mychannel");
        let mut channel = Channel::new("mychannel", identity());

        channel
            .add_endpoint(&network, Endpoint::peer("peer0", "grpc://localhost:7051"))
            .await
            .unwrap();
        let err = channel.initialize(&network).await.unwrap_err();
        assert!(matches!(err, BootstrapError::ChannelInitialize { .. }));
        assert!(!channel.is_initialized());

        channel
            .add_endpoint(&network, Endpoint::event_hub("peer0", "grpc://localhost:7053"))
            .await
            .unwrap();
        channel
            .add_endpoint(&network, Endpoint::orderer("orderer", "grpc://localhost:7050"))
            .await
            .unwrap();
        channel.initialize(&network).await.unwrap();
        assert!(channel.is_initialized());

        let again = channel.initialize(&network).await.unwrap_err();
        assert!(matches!(again, BootstrapError::AlreadyInitialized { .. }));
    }

    #[tokio::test]
    async fn duplicate_and_unreachable_endpoints_are_rejected() {
        let network = InMemoryNetwork::new("mychannel");
        let mut channel = Channel::new("mychannel", identity());

        channel
            .add_endpoint(&network, Endpoint::peer("peer0", "grpc://localhost:7051"))
            .await
            .unwrap();
        let duplicate = channel
            .add_endpoint(&network, Endpoint::peer("peer1", "grpc://localhost:8051"))
            .await
            .unwrap_err();
        assert!(matches!(duplicate, BootstrapError::Registration { .. }));

        network.set_unreachable(EndpointRole::Orderer, true);
        let unreachable = channel
            .add_endpoint(&network, Endpoint::orderer("orderer", "grpc://localhost:7050"))
            .await
            .unwrap_err();
        match unreachable {
            BootstrapError::Registration { role, url, .. } => {
                assert_eq!(role, EndpointRole::Orderer);
                assert_eq!(url, "grpc://localhost:7050");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn wrong_channel_name_fails_initialize() {
        let network = InMemoryNetwork::new("mychannel");
        let mut channel = Channel::new("otherchannel", identity());
        for endpoint in [
            Endpoint::peer("peer0", "grpc://localhost:7051"),
            Endpoint::event_hub("peer0", "grpc://localhost:7053"),
            Endpoint::orderer("orderer", "grpc://localhost:7050"),
        ] {
            channel.add_endpoint(&network, endpoint).await.unwrap();
        }
        let err = channel.initialize(&network).await.unwrap_err();
        assert!(matches!(err, BootstrapError::ChannelInitialize { .. }));
    }
}
