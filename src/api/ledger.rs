// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Out-of-band transaction status lookups.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    ledger::{TransactionId, TransactionStatus},
    state::AppState,
    storage::receipts::LedgerReceipt,
};

/// Where a reported status came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// The local receipt log already held a final status.
    Receipt,
    /// The status was looked up on the live ledger.
    Ledger,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionStatusResponse {
    pub transaction_id: TransactionId,
    #[serde(flatten)]
    pub status: TransactionStatus,
    pub source: StatusSource,
    /// Receipt recorded when this gateway submitted the transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<LedgerReceipt>,
}

/// Look up the status of a transaction.
///
/// Final receipts are answered locally. Otherwise the ledger is queried
/// and, when the answer is final, the pending receipt is resolved.
#[utoipa::path(
    get,
    path = "/api/ledger/transactions/{tx_id}",
    params(("tx_id" = String, Path, description = "Transaction id")),
    tag = "Ledger",
    responses(
        (status = 200, body = TransactionStatusResponse),
        (status = 404, description = "Transaction unknown to the ledger and the receipt log"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn get_transaction_status(
    Path(tx_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TransactionStatusResponse>, ApiError> {
    let transaction_id = TransactionId::new(tx_id);

    let receipt = match &state.receipts {
        Some(receipts) => receipts.get(&transaction_id).unwrap_or_else(|e| {
            warn!(tx_id = %transaction_id, error = %e, "Failed to read ledger receipt");
            None
        }),
        None => None,
    };

    if let Some(receipt) = receipt.as_ref().filter(|r| !r.is_pending()) {
        return Ok(Json(TransactionStatusResponse {
            transaction_id,
            status: receipt.status.clone(),
            source: StatusSource::Receipt,
            receipt: Some(receipt.clone()),
        }));
    }

    let status = state.ledger.reconcile(&transaction_id).await?;
    if status == TransactionStatus::Unknown && receipt.is_none() {
        return Err(ApiError::not_found(format!(
            "transaction {transaction_id} not found"
        )));
    }

    // Re-read so a receipt resolved just now is reported in its final form.
    let receipt = match (&state.receipts, receipt) {
        (Some(receipts), Some(stale)) => receipts
            .get(&transaction_id)
            .ok()
            .flatten()
            .or(Some(stale)),
        (_, receipt) => receipt,
    };

    Ok(Json(TransactionStatusResponse {
        transaction_id,
        status,
        source: StatusSource::Ledger,
        receipt,
    }))
}
