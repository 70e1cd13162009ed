// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ledger::error::{ErrorClass, GatewayError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// Missing ledger input, answered the way the chaincode routes always have.
    pub fn expectation_failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::EXPECTATION_FAILED, code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

/// Ledger failures: business rejections are client errors, transport faults
/// are server errors.
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = match err.classification() {
            ErrorClass::Validation => StatusCode::EXPECTATION_FAILED,
            ErrorClass::Ledger => StatusCode::NOT_ACCEPTABLE,
            ErrorClass::Transport => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorClass::Timeout => StatusCode::GATEWAY_TIMEOUT,
        };
        Self::new(status, err.error_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code,
        });
        (self.status, body).into_response()
    }
}
