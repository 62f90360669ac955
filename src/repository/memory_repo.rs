//! In-Memory Store
//!
//! Reference implementation of the store contract. Used by the engine
//! tests and useful for embedding without a database file.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{DomainError, DomainResult, Item};

use super::traits::{ItemStore, Stored};

/// Keyed by (owner_id, id): the owner partition comes first so the key
/// itself enforces scoping.
type Partitioned = HashMap<(String, String), Stored>;

#[derive(Default)]
pub struct MemoryItemStore {
    items: RwLock<Partitioned>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(item: &Item) -> (String, String) {
    (item.owner_id.clone(), item.id.clone())
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn get(&self, id: &str, owner_id: &str) -> DomainResult<Option<Stored>> {
        let items = self.items.read().await;
        Ok(items.get(&(owner_id.to_string(), id.to_string())).cloned())
    }

    async fn create(&self, item: &Item) -> DomainResult<Item> {
        if item.id.trim().is_empty() || item.owner_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "id and owner_id are required".to_string(),
            ));
        }
        let mut items = self.items.write().await;
        let k = key(item);
        if items.contains_key(&k) {
            return Err(DomainError::AlreadyExists(format!("item {}", item.id)));
        }
        items.insert(
            k,
            Stored {
                item: item.clone(),
                version: 1,
            },
        );
        Ok(item.clone())
    }

    async fn replace(&self, item: &Item, expected_version: u64) -> DomainResult<Item> {
        let mut items = self.items.write().await;
        let k = key(item);
        let stored = items
            .get_mut(&k)
            .ok_or_else(|| DomainError::NotFound(format!("item {}", item.id)))?;
        if stored.version != expected_version {
            return Err(DomainError::Conflict(format!(
                "item {} version {} != expected {}",
                item.id, stored.version, expected_version
            )));
        }
        stored.item = item.clone();
        stored.version += 1;
        Ok(item.clone())
    }

    async fn delete(&self, id: &str, owner_id: &str) -> DomainResult<bool> {
        let mut items = self.items.write().await;
        Ok(items
            .remove(&(owner_id.to_string(), id.to_string()))
            .is_some())
    }

    async fn list_by_owner(&self, owner_id: &str) -> DomainResult<Vec<Item>> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|((owner, _), _)| owner.as_str() == owner_id)
            .map(|(_, stored)| stored.item.clone())
            .collect())
    }

    async fn changed_since(&self, owner_id: &str, since: DateTime<Utc>) -> DomainResult<Vec<Item>> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|((owner, _), stored)| {
                owner.as_str() == owner_id && stored.item.updated_at > since
            })
            .map(|(_, stored)| stored.item.clone())
            .collect())
    }
}
