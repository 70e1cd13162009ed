// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory relational store.
//!
//! One table per entity with sequential `i64` ids, standing in for the
//! row store the blog entities live in. The ledger copy is written after
//! the store; the two are not updated atomically.

use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::models::{Blog, BlogEntry, LedgerEntity, Tag};

/// Rows of one entity type, ordered by id.
pub struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: LedgerEntity> Table<T> {
    /// Assign the next id and store the row.
    pub fn insert(&mut self, entity: T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let entity = entity.with_id(id);
        self.rows.insert(id, entity.clone());
        entity
    }

    /// Replace an existing row.
    pub fn update(&mut self, entity: T) -> Result<T, ApiError> {
        let id = entity
            .id()
            .ok_or_else(|| ApiError::bad_request("idnull", "Invalid id"))?;
        match self.rows.get_mut(&id) {
            Some(row) => {
                *row = entity.clone();
                Ok(entity)
            }
            None => Err(ApiError::not_found(format!("{} {id} not found", T::ENTITY_NAME))),
        }
    }

    pub fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn list(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        self.rows.remove(&id)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    blogs: Table<Blog>,
    entries: Table<BlogEntry>,
    tags: Table<Tag>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blogs(&self) -> &Table<Blog> {
        &self.blogs
    }

    pub fn entries(&self) -> &Table<BlogEntry> {
        &self.entries
    }

    pub fn tags(&self) -> &Table<Tag> {
        &self.tags
    }
}

/// Access to the table holding `T`, so handlers can stay generic.
pub trait HasTable<T> {
    fn table(&self) -> &Table<T>;
    fn table_mut(&mut self) -> &mut Table<T>;
}

impl HasTable<Blog> for InMemoryStore {
    fn table(&self) -> &Table<Blog> {
        &self.blogs
    }

    fn table_mut(&mut self) -> &mut Table<Blog> {
        &mut self.blogs
    }
}

impl HasTable<BlogEntry> for InMemoryStore {
    fn table(&self) -> &Table<BlogEntry> {
        &self.entries
    }

    fn table_mut(&mut self) -> &mut Table<BlogEntry> {
        &mut self.entries
    }
}

impl HasTable<Tag> for InMemoryStore {
    fn table(&self) -> &Table<Tag> {
        &self.tags
    }

    fn table_mut(&mut self) -> &mut Table<Tag> {
        &mut self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag {
            id: None,
            name: name.into(),
        }
    }

    #[test]
    fn ids_are_sequential_per_table() {
        let mut store = InMemoryStore::new();
        let first = HasTable::<Tag>::table_mut(&mut store).insert(tag("rust"));
        let second = HasTable::<Tag>::table_mut(&mut store).insert(tag("ledger"));
        let blog = HasTable::<Blog>::table_mut(&mut store).insert(Blog {
            id: None,
            name: "b".into(),
            handle: "h".into(),
        });

        assert_eq!(first.id, Some(1));
        assert_eq!(second.id, Some(2));
        assert_eq!(blog.id, Some(1));
        assert_eq!(store.tags().list().len(), 2);
    }

    #[test]
    fn update_requires_existing_row() {
        let mut store = InMemoryStore::new();
        let table = HasTable::<Tag>::table_mut(&mut store);

        let err = table.update(tag("x")).unwrap_err();
        assert_eq!(err.code, "idnull");

        let err = table
            .update(Tag {
                id: Some(9),
                name: "x".into(),
            })
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);

        let stored = table.insert(tag("old"));
        let updated = table
            .update(Tag {
                id: stored.id,
                name: "new".into(),
            })
            .unwrap();
        assert_eq!(table.get(1), Some(updated));
    }

    #[test]
    fn remove_returns_row() {
        let mut store = InMemoryStore::new();
        let table = HasTable::<Tag>::table_mut(&mut store);
        table.insert(tag("gone"));
        assert!(table.remove(1).is_some());
        assert!(!table.contains(1));
        assert!(table.remove(1).is_none());
    }
}
