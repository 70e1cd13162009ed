// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Direct chaincode access.
//!
//! Development routes that run a single ledger operation on an arbitrary
//! key, without touching the relational store. Mounted only when
//! `CHAINCODE_API_ENABLED` is set.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::{
    error::ApiError,
    ledger::{types::NOT_FOUND_SENTINEL, GatewayError, TransactionOutcome},
    models::{
        ChaincodeValueRequest, EntityStateResponse, PendingTransactionResponse,
        TransactionResponse,
    },
    state::AppState,
};

fn require_entity(entity: &str) -> Result<(), ApiError> {
    if entity.trim().is_empty() {
        return Err(ApiError::expectation_failed(
            "EMPTY_ENTITY_NAME",
            "entity name must not be empty",
        ));
    }
    Ok(())
}

fn require_value(value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::expectation_failed(
            "EMPTY_VALUE",
            "value must not be empty",
        ));
    }
    Ok(())
}

/// Render the result of a mutating chaincode call.
fn write_response(entity: &str, result: Result<TransactionOutcome, GatewayError>) -> Response {
    match result {
        Ok(TransactionOutcome::Committed { transaction_id }) => Json(TransactionResponse {
            transaction_id: transaction_id.to_string(),
        })
        .into_response(),
        Err(GatewayError::TimedOut {
            transaction_id: Some(transaction_id),
            ..
        }) => (
            StatusCode::ACCEPTED,
            Json(PendingTransactionResponse {
                transaction_id: transaction_id.to_string(),
                status: "pending".to_string(),
            }),
        )
            .into_response(),
        Ok(other) => {
            warn!(entity, outcome = ?other, "Unexpected outcome for a chaincode write");
            ApiError::internal("unexpected ledger outcome").into_response()
        }
        Err(err) => {
            warn!(entity, error = %err, "Chaincode write failed");
            ApiError::from(err).into_response()
        }
    }
}

/// Read the current ledger state of an entity.
#[utoipa::path(
    get,
    path = "/api/blogs/{id}/chaincode",
    params(("id" = String, Path, description = "Ledger key of the entity")),
    tag = "Chaincode",
    responses(
        (status = 200, body = EntityStateResponse, description = "State, or `NOT_FOUND`"),
        (status = 417, description = "Empty entity name"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn get_entity(
    Path(entity): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<EntityStateResponse>, ApiError> {
    require_entity(&entity)?;
    let entity_state = match state.ledger.get(&entity).await? {
        TransactionOutcome::QueryResult { state } => state,
        TransactionOutcome::NotFound => NOT_FOUND_SENTINEL.to_string(),
        TransactionOutcome::Committed { .. } => {
            return Err(ApiError::internal("unexpected ledger outcome"));
        }
    };
    Ok(Json(EntityStateResponse { entity_state }))
}

/// Add a new entity to the ledger.
#[utoipa::path(
    put,
    path = "/api/blogs/{id}/chaincode",
    params(("id" = String, Path, description = "Ledger key of the entity")),
    request_body = ChaincodeValueRequest,
    tag = "Chaincode",
    responses(
        (status = 200, body = TransactionResponse),
        (status = 202, body = PendingTransactionResponse, description = "Ordered, commit not yet confirmed"),
        (status = 406, description = "Ledger rejected the add"),
        (status = 417, description = "Empty entity name or value"),
        (status = 500, description = "Ledger unreachable"),
        (status = 504, description = "No transaction id was assigned in time")
    )
)]
pub async fn add_entity(
    Path(entity): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ChaincodeValueRequest>,
) -> Result<Response, ApiError> {
    require_entity(&entity)?;
    require_value(&request.value)?;
    let result = state.ledger.add(&entity, &request.value).await;
    Ok(write_response(&entity, result))
}

/// Create or overwrite an entity on the ledger.
#[utoipa::path(
    post,
    path = "/api/blogs/{id}/chaincode",
    params(("id" = String, Path, description = "Ledger key of the entity")),
    request_body = ChaincodeValueRequest,
    tag = "Chaincode",
    responses(
        (status = 200, body = TransactionResponse),
        (status = 202, body = PendingTransactionResponse, description = "Ordered, commit not yet confirmed"),
        (status = 406, description = "Ledger rejected the set"),
        (status = 417, description = "Empty entity name or value"),
        (status = 500, description = "Ledger unreachable"),
        (status = 504, description = "No transaction id was assigned in time")
    )
)]
pub async fn set_entity(
    Path(entity): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ChaincodeValueRequest>,
) -> Result<Response, ApiError> {
    require_entity(&entity)?;
    require_value(&request.value)?;
    let result = state.ledger.set(&entity, &request.value).await;
    Ok(write_response(&entity, result))
}

/// Remove an entity from the ledger.
#[utoipa::path(
    delete,
    path = "/api/blogs/{id}/chaincode",
    params(("id" = String, Path, description = "Ledger key of the entity")),
    tag = "Chaincode",
    responses(
        (status = 200, body = TransactionResponse),
        (status = 202, body = PendingTransactionResponse, description = "Ordered, commit not yet confirmed"),
        (status = 406, description = "Entity does not exist on the ledger"),
        (status = 417, description = "Empty entity name"),
        (status = 500, description = "Ledger unreachable"),
        (status = 504, description = "No transaction id was assigned in time")
    )
)]
pub async fn delete_entity(
    Path(entity): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    require_entity(&entity)?;
    let result = state.ledger.delete(&entity).await;
    Ok(write_response(&entity, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_inputs_are_expectation_failures() {
        let err = require_entity(" ").unwrap_err();
        assert_eq!(err.status, StatusCode::EXPECTATION_FAILED);
        assert_eq!(err.code, "EMPTY_ENTITY_NAME");

        let err = require_value("").unwrap_err();
        assert_eq!(err.code, "EMPTY_VALUE");

        assert!(require_entity("blog:1").is_ok());
    }
}
