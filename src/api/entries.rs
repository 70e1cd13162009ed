// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blog entry endpoints. Entries reference their blog by id only; the
//! reference is not checked against the blogs table.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::entities;
use crate::{error::ApiError, models::BlogEntry, state::AppState};

pub const BASE_PATH: &str = "/api/blog-entries";

#[utoipa::path(
    get,
    path = "/api/blog-entries",
    tag = "Blog Entries",
    responses((status = 200, body = [BlogEntry]))
)]
pub async fn list_blog_entries(State(state): State<AppState>) -> Json<Vec<BlogEntry>> {
    Json(entities::list(&state).await)
}

#[utoipa::path(
    get,
    path = "/api/blog-entries/{id}",
    params(("id" = i64, Path, description = "Blog entry id")),
    tag = "Blog Entries",
    responses(
        (status = 200, body = BlogEntry),
        (status = 404, description = "Blog entry not found")
    )
)]
pub async fn get_blog_entry(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<BlogEntry>, ApiError> {
    entities::get(&state, id).await.map(Json)
}

/// Create a blog entry and add it to the ledger.
#[utoipa::path(
    post,
    path = "/api/blog-entries",
    request_body = BlogEntry,
    tag = "Blog Entries",
    responses(
        (status = 201, body = BlogEntry, description = "Created; ledger outcome in `x-ledger-status`"),
        (status = 400, description = "Request carries an id or a blank field"),
        (status = 406, description = "Ledger rejected the add"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn create_blog_entry(
    State(state): State<AppState>,
    Json(request): Json<BlogEntry>,
) -> Result<(StatusCode, HeaderMap, Json<BlogEntry>), ApiError> {
    entities::create(&state, BASE_PATH, request).await
}

/// Update a blog entry and set its ledger state.
#[utoipa::path(
    put,
    path = "/api/blog-entries",
    request_body = BlogEntry,
    tag = "Blog Entries",
    responses(
        (status = 200, body = BlogEntry, description = "Updated; ledger outcome in `x-ledger-status`"),
        (status = 400, description = "Missing id or blank field"),
        (status = 404, description = "Blog entry not found"),
        (status = 406, description = "Ledger rejected the update"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn update_blog_entry(
    State(state): State<AppState>,
    Json(request): Json<BlogEntry>,
) -> Result<(HeaderMap, Json<BlogEntry>), ApiError> {
    entities::update(&state, request).await
}

#[utoipa::path(
    delete,
    path = "/api/blog-entries/{id}",
    params(("id" = i64, Path, description = "Blog entry id")),
    tag = "Blog Entries",
    responses(
        (status = 200, description = "Deleted; ledger outcome in `x-ledger-status`"),
        (status = 404, description = "Blog entry not found"),
        (status = 406, description = "Ledger rejected the delete"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn delete_blog_entry(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    entities::delete::<BlogEntry>(&state, id).await
}
