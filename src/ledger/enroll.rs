// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin enrollment with the certificate authority.

use std::sync::Arc;

use tracing::{info, warn};

use super::error::{EnrollmentError, NetworkError};
use super::transport::FabricTransport;
use super::types::{EnrollmentRequest, Identity};

/// PEM label the certificate authority must issue.
const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Obtains admin identities from one certificate authority.
pub struct IdentityEnroller {
    transport: Arc<dyn FabricTransport>,
    ca_url: String,
}

impl IdentityEnroller {
    pub fn new(transport: Arc<dyn FabricTransport>, ca_url: impl Into<String>) -> Self {
        Self {
            transport,
            ca_url: ca_url.into(),
        }
    }

    pub fn ca_url(&self) -> &str {
        &self.ca_url
    }

    /// Enroll `admin_name` for `organization`.
    ///
    /// The admin is affiliated with the organization itself; use
    /// [`enroll`](Self::enroll) for a different affiliation.
    pub async fn enroll_admin(
        &self,
        organization: &str,
        msp_id: &str,
        admin_name: &str,
        admin_secret: &str,
    ) -> Result<Identity, EnrollmentError> {
        self.enroll(EnrollmentRequest {
            enrollment_id: admin_name.to_string(),
            secret: admin_secret.to_string(),
            affiliation: organization.to_string(),
            msp_id: msp_id.to_string(),
        })
        .await
    }

    pub async fn enroll(&self, request: EnrollmentRequest) -> Result<Identity, EnrollmentError> {
        for (field, value) in [
            ("enrollment id", &request.enrollment_id),
            ("secret", &request.secret),
            ("affiliation", &request.affiliation),
            ("msp id", &request.msp_id),
        ] {
            if value.trim().is_empty() {
                return Err(EnrollmentError::InvalidRequest(format!("{field} is empty")));
            }
        }

        let enrollment = self
            .transport
            .enroll(&self.ca_url, &request)
            .await
            .map_err(|err| {
                warn!(
                    ca_url = %self.ca_url,
                    enrollment_id = %request.enrollment_id,
                    error = %err,
                    "Enrollment request failed"
                );
                match err {
                    NetworkError::Rejected(reason) => {
                        EnrollmentError::Rejected {
                            ca_url: self.ca_url.clone(),
                            reason,
                        }
                    }
                    other => EnrollmentError::Unreachable {
                        ca_url: self.ca_url.clone(),
                        reason: other.to_string(),
                    },
                }
            })?;

        let certificate = pem::parse(&enrollment.certificate_pem)
            .map_err(|e| EnrollmentError::InvalidCertificate(e.to_string()))?;
        if certificate.tag() != CERTIFICATE_TAG {
            return Err(EnrollmentError::InvalidCertificate(format!(
                "expected a {CERTIFICATE_TAG} block, got {}",
                certificate.tag()
            )));
        }
        if certificate.contents().is_empty() {
            return Err(EnrollmentError::InvalidCertificate(
                "certificate body is empty".to_string(),
            ));
        }

        info!(
            ca_url = %self.ca_url,
            enrollment_id = %request.enrollment_id,
            msp_id = %request.msp_id,
            "Enrolled identity"
        );

        Ok(Identity {
            name: request.enrollment_id,
            affiliation: request.affiliation,
            msp_id: request.msp_id,
            enrollment,
        })
    }
}
