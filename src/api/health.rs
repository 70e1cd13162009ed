// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::ledger::SessionStatus;
use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// State of the shared ledger session.
    pub ledger: SessionStatus,
    /// Receipt database availability (if attached).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipts: Option<String>,
    /// Receipts still waiting for a final status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_receipts: Option<u64>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

async fn check(state: &AppState) -> (bool, ReadyResponse) {
    let ledger = state.ledger.session_status().await;

    let (receipts, pending_receipts) = match &state.receipts {
        Some(db) => match db.pending_count() {
            Ok(count) => (Some("ok".to_string()), Some(count)),
            Err(_) => (Some("unavailable".to_string()), None),
        },
        None => (None, None),
    };

    let ledger_ok = matches!(ledger, SessionStatus::Ready { .. });
    let receipts_ok = receipts.as_deref().map(|s| s == "ok").unwrap_or(true);
    let all_ok = ledger_ok && receipts_ok;

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            ledger,
            receipts,
            pending_receipts,
        },
    };
    (all_ok, response)
}

fn respond((ok, response): (bool, ReadyResponse)) -> (StatusCode, Json<ReadyResponse>) {
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Health check endpoint handler.
///
/// Reports the current state without establishing a ledger session.
/// Returns 200 if all checks pass, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    respond(check(&state).await)
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Establishes the ledger session when none exists yet, then reports.
/// Returns 200 only when the session is ready.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    if let Err(e) = state.ledger.warm_up().await {
        tracing::debug!(error = %e, "Readiness: ledger session unavailable");
    }
    respond(check(&state).await)
}
