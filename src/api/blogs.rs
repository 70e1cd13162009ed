// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blog endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::entities;
use crate::{error::ApiError, models::Blog, state::AppState};

pub const BASE_PATH: &str = "/api/blogs";

#[utoipa::path(
    get,
    path = "/api/blogs",
    tag = "Blogs",
    responses((status = 200, body = [Blog]))
)]
pub async fn list_blogs(State(state): State<AppState>) -> Json<Vec<Blog>> {
    Json(entities::list(&state).await)
}

#[utoipa::path(
    get,
    path = "/api/blogs/{id}",
    params(("id" = i64, Path, description = "Blog id")),
    tag = "Blogs",
    responses(
        (status = 200, body = Blog),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn get_blog(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Blog>, ApiError> {
    entities::get(&state, id).await.map(Json)
}

/// Create a blog and add it to the ledger.
#[utoipa::path(
    post,
    path = "/api/blogs",
    request_body = Blog,
    tag = "Blogs",
    responses(
        (status = 201, body = Blog, description = "Created; ledger outcome in `x-ledger-status`"),
        (status = 400, description = "Request carries an id or a blank field"),
        (status = 406, description = "Ledger rejected the add"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn create_blog(
    State(state): State<AppState>,
    Json(request): Json<Blog>,
) -> Result<(StatusCode, HeaderMap, Json<Blog>), ApiError> {
    entities::create(&state, BASE_PATH, request).await
}

/// Update a blog and set its ledger state.
#[utoipa::path(
    put,
    path = "/api/blogs",
    request_body = Blog,
    tag = "Blogs",
    responses(
        (status = 200, body = Blog, description = "Updated; ledger outcome in `x-ledger-status`"),
        (status = 400, description = "Missing id or blank field"),
        (status = 404, description = "Blog not found"),
        (status = 406, description = "Ledger rejected the update"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn update_blog(
    State(state): State<AppState>,
    Json(request): Json<Blog>,
) -> Result<(HeaderMap, Json<Blog>), ApiError> {
    entities::update(&state, request).await
}

#[utoipa::path(
    delete,
    path = "/api/blogs/{id}",
    params(("id" = i64, Path, description = "Blog id")),
    tag = "Blogs",
    responses(
        (status = 200, description = "Deleted; ledger outcome in `x-ledger-status`"),
        (status = 404, description = "Blog not found"),
        (status = 406, description = "Ledger rejected the delete"),
        (status = 500, description = "Ledger unreachable")
    )
)]
pub async fn delete_blog(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    entities::delete::<Blog>(&state, id).await
}
