// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    ledger::{types::OperationKind, SessionStatus, TransactionId, TransactionStatus},
    models::{
        Blog, BlogEntry, ChaincodeValueRequest, EntityStateResponse, PendingTransactionResponse,
        Tag, TransactionResponse,
    },
    state::AppState,
    storage::receipts::LedgerReceipt,
};

pub mod blogs;
pub mod chaincode;
pub mod entities;
pub mod entries;
pub mod health;
pub mod ledger;
pub mod tags;

pub fn router(state: AppState) -> Router {
    let mut api_routes = Router::new()
        .route(
            "/blogs",
            get(blogs::list_blogs)
                .post(blogs::create_blog)
                .put(blogs::update_blog),
        )
        .route(
            "/blogs/{id}",
            get(blogs::get_blog).delete(blogs::delete_blog),
        )
        .route(
            "/blog-entries",
            get(entries::list_blog_entries)
                .post(entries::create_blog_entry)
                .put(entries::update_blog_entry),
        )
        .route(
            "/blog-entries/{id}",
            get(entries::get_blog_entry).delete(entries::delete_blog_entry),
        )
        .route(
            "/tags",
            get(tags::list_tags).post(tags::create_tag).put(tags::update_tag),
        )
        .route("/tags/{id}", get(tags::get_tag).delete(tags::delete_tag))
        .route(
            "/ledger/transactions/{tx_id}",
            get(ledger::get_transaction_status),
        );

    if state.chaincode_api_enabled {
        api_routes = api_routes.route(
            "/blogs/{id}/chaincode",
            get(chaincode::get_entity)
                .put(chaincode::add_entity)
                .post(chaincode::set_entity)
                .delete(chaincode::delete_entity),
        );
    }

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        blogs::list_blogs,
        blogs::get_blog,
        blogs::create_blog,
        blogs::update_blog,
        blogs::delete_blog,
        entries::list_blog_entries,
        entries::get_blog_entry,
        entries::create_blog_entry,
        entries::update_blog_entry,
        entries::delete_blog_entry,
        tags::list_tags,
        tags::get_tag,
        tags::create_tag,
        tags::update_tag,
        tags::delete_tag,
        chaincode::get_entity,
        chaincode::add_entity,
        chaincode::set_entity,
        chaincode::delete_entity,
        ledger::get_transaction_status,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Blog,
            BlogEntry,
            Tag,
            ChaincodeValueRequest,
            TransactionResponse,
            PendingTransactionResponse,
            EntityStateResponse,
            TransactionId,
            TransactionStatus,
            OperationKind,
            LedgerReceipt,
            SessionStatus,
            ledger::StatusSource,
            ledger::TransactionStatusResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Blogs", description = "Blog management, mirrored on the ledger"),
        (name = "Blog Entries", description = "Blog entry management, mirrored on the ledger"),
        (name = "Tags", description = "Tag management, mirrored on the ledger"),
        (name = "Chaincode", description = "Direct chaincode access (development)"),
        (name = "Ledger", description = "Transaction status lookups"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
