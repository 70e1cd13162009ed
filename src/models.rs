// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures used by the REST API. All types derive
//! `Serialize`, `Deserialize`, and `ToSchema` for JSON handling and OpenAPI
//! documentation.
//!
//! ## Ledger Representation
//!
//! Every stored entity is mirrored on the ledger under the key
//! `<entity>:<id>` (for example `blog:42`). The value is the entity's
//! canonical JSON: the serde rendering of the struct, fields in declaration
//! order.

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;

/// An entity that lives in the relational store and is mirrored on the ledger.
pub trait LedgerEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Singular name used in ledger keys, messages and alerts.
    const ENTITY_NAME: &'static str;

    fn id(&self) -> Option<i64>;

    fn with_id(self, id: i64) -> Self;

    /// Field-level checks run before anything is written.
    fn validate(&self) -> Result<(), ApiError>;

    fn ledger_key(id: i64) -> String {
        format!("{}:{id}", Self::ENTITY_NAME)
    }

    fn ledger_value(&self) -> Result<String, ApiError> {
        serde_json::to_string(self).map_err(|e| {
            ApiError::internal(format!("failed to render {} for the ledger: {e}", Self::ENTITY_NAME))
        })
    }
}

fn require(entity: &str, field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::bad_request(
            "fieldempty",
            format!("{entity} {field} must not be empty"),
        ))
    } else {
        Ok(())
    }
}

// =============================================================================
// Blog
// =============================================================================

/// A blog owned by one author handle.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Blog {
    /// Assigned by the server on create.
    pub id: Option<i64>,
    pub name: String,
    pub handle: String,
}

impl LedgerEntity for Blog {
    const ENTITY_NAME: &'static str = "blog";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    fn validate(&self) -> Result<(), ApiError> {
        require(Self::ENTITY_NAME, "name", &self.name)?;
        require(Self::ENTITY_NAME, "handle", &self.handle)
    }
}

// =============================================================================
// Blog Entry
// =============================================================================

/// A post within a blog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BlogEntry {
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    /// Publication date (`YYYY-MM-DD`).
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    /// Owning blog, if any.
    pub blog_id: Option<i64>,
}

impl LedgerEntity for BlogEntry {
    const ENTITY_NAME: &'static str = "blog_entry";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    fn validate(&self) -> Result<(), ApiError> {
        require(Self::ENTITY_NAME, "title", &self.title)?;
        require(Self::ENTITY_NAME, "content", &self.content)
    }
}

// =============================================================================
// Tag
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Tag {
    pub id: Option<i64>,
    pub name: String,
}

impl LedgerEntity for Tag {
    const ENTITY_NAME: &'static str = "tag";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    fn validate(&self) -> Result<(), ApiError> {
        require(Self::ENTITY_NAME, "name", &self.name)
    }
}

// =============================================================================
// Chaincode Models
// =============================================================================

/// Body of the direct chaincode write routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChaincodeValueRequest {
    #[serde(default)]
    pub value: String,
}

/// Transaction id of a committed chaincode write.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TransactionResponse {
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
}

/// Write accepted by the orderer whose commit was not confirmed in time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PendingTransactionResponse {
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    pub status: String,
}

/// Current ledger state of an entity, or `NOT_FOUND`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EntityStateResponse {
    #[serde(rename = "entityState")]
    pub entity_state: String,
}
