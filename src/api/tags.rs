// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::entities;
use crate::{error::ApiError, models::Tag, state::AppState};

pub const BASE_PATH: &str = "/api/tags";

#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "Tags",
    responses((status = 200, body = [Tag]))
)]
pub async fn list_tags(State(state): State<AppState>) -> Json<Vec<Tag>> {
    Json(entities::list(&state).await)
}

#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    params(("id" = i64, Path, description = "Tag id")),
    tag = "Tags",
    responses(
        (status = 200, body = Tag),
        (status = 404, description = "Tag not found")
    )
)]
pub async fn get_tag(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Tag>, ApiError> {
    entities::get(&state, id).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/api/tags",
    request_body = Tag,
    tag = "Tags",
    responses(
        (status = 201, body = Tag, description = "Created; ledger outcome in `x-ledger-status`"),
        (status = 400, description = "Request carries an id or a blank field"),
        (status = 406, description = "Ledger rejected the add"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<Tag>,
) -> Result<(StatusCode, HeaderMap, Json<Tag>), ApiError> {
    entities::create(&state, BASE_PATH, request).await
}

#[utoipa::path(
    put,
    path = "/api/tags",
    request_body = Tag,
    tag = "Tags",
    responses(
        (status = 200, body = Tag, description = "Updated; ledger outcome in `x-ledger-status`"),
        (status = 400, description = "Missing id or blank field"),
        (status = 404, description = "Tag not found"),
        (status = 406, description = "Ledger rejected the update"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn update_tag(
    State(state): State<AppState>,
    Json(request): Json<Tag>,
) -> Result<(HeaderMap, Json<Tag>), ApiError> {
    entities::update(&state, request).await
}

#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    params(("id" = i64, Path, description = "Tag id")),
    tag = "Tags",
    responses(
        (status = 200, description = "Deleted; ledger outcome in `x-ledger-status`"),
        (status = 404, description = "Tag not found"),
        (status = 406, description = "Ledger rejected the delete"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn delete_tag(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    entities::delete::<Tag>(&state, id).await
}
