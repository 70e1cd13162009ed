// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger Blog Server - blog CRUD mirrored onto a permissioned ledger
//!
//! Blogs, blog entries and tags live in a relational store; every write is
//! also submitted as a chaincode transaction on a Hyperledger Fabric style
//! channel and the outcome is relayed to the caller.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `ledger` - Transaction gateway (enrollment, session, operations)
//! - `reconciler` - Background resolution of unconfirmed commits
//! - `storage` - Ledger receipt log (redb)
//! - `store` - In-memory relational copy of the entities

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod reconciler;
pub mod state;
pub mod storage;
pub mod store;
