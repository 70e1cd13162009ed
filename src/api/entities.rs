// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared CRUD flow for ledger-mirrored entities.
//!
//! Each write hits the relational store first and is then submitted to the
//! ledger under `<entity>:<id>`. The two writes are sequential: when the
//! ledger step fails the relational change stays in place and the error is
//! returned to the caller.

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    Json,
};
use tracing::{info, warn};

use crate::{
    error::ApiError,
    ledger::{GatewayError, TransactionOutcome},
    models::LedgerEntity,
    state::AppState,
    store::{HasTable, InMemoryStore},
};

pub const LEDGER_STATUS_HEADER: HeaderName = HeaderName::from_static("x-ledger-status");
pub const LEDGER_TRANSACTION_HEADER: HeaderName = HeaderName::from_static("x-ledger-transaction-id");

/// Headers describing how the ledger write ended.
///
/// A commit that was ordered but not confirmed in time is still reported as
/// a success with status `pending`; the receipt reconciler settles it later.
pub fn ledger_headers(
    result: Result<TransactionOutcome, GatewayError>,
) -> Result<HeaderMap, ApiError> {
    let (status, transaction_id) = match result {
        Ok(TransactionOutcome::Committed { transaction_id }) => ("committed", transaction_id),
        Err(GatewayError::TimedOut {
            transaction_id: Some(transaction_id),
            ..
        }) => ("pending", transaction_id),
        Ok(_) => return Ok(HeaderMap::new()),
        Err(err) => return Err(err.into()),
    };

    let mut headers = HeaderMap::new();
    headers.insert(LEDGER_STATUS_HEADER, HeaderValue::from_static(status));
    if let Ok(value) = HeaderValue::from_str(transaction_id.as_str()) {
        headers.insert(LEDGER_TRANSACTION_HEADER, value);
    }
    Ok(headers)
}

fn log_ledger_failure<T: LedgerEntity>(action: &str, id: i64, err: &GatewayError) {
    warn!(
        entity = T::ENTITY_NAME,
        id,
        action,
        error = %err,
        error_class = ?err.classification(),
        "Ledger write failed after relational write"
    );
}

pub async fn list<T>(state: &AppState) -> Vec<T>
where
    T: LedgerEntity,
    InMemoryStore: HasTable<T>,
{
    let store = state.store.read().await;
    HasTable::<T>::table(&*store).list()
}

pub async fn get<T>(state: &AppState, id: i64) -> Result<T, ApiError>
where
    T: LedgerEntity,
    InMemoryStore: HasTable<T>,
{
    let store = state.store.read().await;
    HasTable::<T>::table(&*store)
        .get(id)
        .ok_or_else(|| ApiError::not_found(format!("{} {id} not found", T::ENTITY_NAME)))
}

pub async fn create<T>(
    state: &AppState,
    base_path: &str,
    entity: T,
) -> Result<(StatusCode, HeaderMap, Json<T>), ApiError>
where
    T: LedgerEntity,
    InMemoryStore: HasTable<T>,
{
    if entity.id().is_some() {
        return Err(ApiError::bad_request(
            "idexists",
            format!("A new {} cannot already have an ID", T::ENTITY_NAME),
        ));
    }
    entity.validate()?;

    let created = {
        let mut store = state.store.write().await;
        HasTable::<T>::table_mut(&mut *store).insert(entity)
    };
    let id = created.id().ok_or_else(|| ApiError::internal("store did not assign an id"))?;

    let result = state
        .ledger
        .add(&T::ledger_key(id), &created.ledger_value()?)
        .await;
    if let Err(err) = &result {
        log_ledger_failure::<T>("create", id, err);
    }
    let mut headers = ledger_headers(result)?;
    if let Ok(location) = HeaderValue::from_str(&format!("{base_path}/{id}")) {
        headers.insert(header::LOCATION, location);
    }

    info!(entity = T::ENTITY_NAME, id, "Entity created");
    Ok((StatusCode::CREATED, headers, Json(created)))
}

pub async fn update<T>(state: &AppState, entity: T) -> Result<(HeaderMap, Json<T>), ApiError>
where
    T: LedgerEntity,
    InMemoryStore: HasTable<T>,
{
    let id = entity
        .id()
        .ok_or_else(|| ApiError::bad_request("idnull", "Invalid id"))?;
    entity.validate()?;

    let updated = {
        let mut store = state.store.write().await;
        HasTable::<T>::table_mut(&mut *store).update(entity)?
    };

    let result = state
        .ledger
        .set(&T::ledger_key(id), &updated.ledger_value()?)
        .await;
    if let Err(err) = &result {
        log_ledger_failure::<T>("update", id, err);
    }
    let headers = ledger_headers(result)?;

    info!(entity = T::ENTITY_NAME, id, "Entity updated");
    Ok((headers, Json(updated)))
}

pub async fn delete<T>(state: &AppState, id: i64) -> Result<(StatusCode, HeaderMap), ApiError>
where
    T: LedgerEntity,
    InMemoryStore: HasTable<T>,
{
    {
        let mut store = state.store.write().await;
        HasTable::<T>::table_mut(&mut *store)
            .remove(id)
            .ok_or_else(|| ApiError::not_found(format!("{} {id} not found", T::ENTITY_NAME)))?;
    }

    let result = state.ledger.delete(&T::ledger_key(id)).await;
    if let Err(err) = &result {
        log_ledger_failure::<T>("delete", id, err);
    }
    let headers = ledger_headers(result)?;

    info!(entity = T::ENTITY_NAME, id, "Entity deleted");
    Ok((StatusCode::OK, headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::ledger::{types::OperationKind, TransactionId};

    #[test]
    fn committed_outcome_sets_both_headers() {
        let headers = ledger_headers(Ok(TransactionOutcome::Committed {
            transaction_id: TransactionId::new("tx-001"),
        }))
        .unwrap();
        assert_eq!(headers[&LEDGER_STATUS_HEADER], "committed");
        assert_eq!(headers[&LEDGER_TRANSACTION_HEADER], "tx-001");
    }

    #[test]
    fn unconfirmed_commit_is_pending() {
        let headers = ledger_headers(Err(GatewayError::TimedOut {
            transaction_id: Some(TransactionId::new("tx-009")),
            waited: Duration::from_secs(30),
        }))
        .unwrap();
        assert_eq!(headers[&LEDGER_STATUS_HEADER], "pending");
        assert_eq!(headers[&LEDGER_TRANSACTION_HEADER], "tx-009");
    }

    #[test]
    fn failures_become_api_errors() {
        let err = ledger_headers(Err(GatewayError::Ledger {
            operation: OperationKind::Delete,
            key: "tag:1".into(),
            reason: "entity tag:1 does not exist".into(),
            transaction_id: None,
        }))
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_ACCEPTABLE);

        let err = ledger_headers(Err(GatewayError::TimedOut {
            transaction_id: None,
            waited: Duration::from_secs(1),
        }))
        .unwrap_err();
        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
    }
}
