//! Repository Layer - Store Adapter Contract
//!
//! The narrow contract the sync engine consumes. Every operation is
//! scoped to an owner partition; cross-owner access is structurally
//! impossible through this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DomainResult, Item};

/// A stored document together with its store-managed version counter.
///
/// The version is bumped on every write and acts as the etag for the
/// optimistic check on `replace`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored {
    pub item: Item,
    pub version: u64,
}

/// Store adapter contract
///
/// All operations are async to support various backends. Implementations
/// must be safe to share across tasks.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch a document by id within an owner partition.
    async fn get(&self, id: &str, owner_id: &str) -> DomainResult<Option<Stored>>;

    /// Insert a new document. Fails with `AlreadyExists` if the
    /// (id, owner) pair is taken.
    async fn create(&self, item: &Item) -> DomainResult<Item>;

    /// Replace a document wholesale. Fails with `NotFound` if absent and
    /// with `Conflict` if the stored version no longer matches
    /// `expected_version`.
    async fn replace(&self, item: &Item, expected_version: u64) -> DomainResult<Item>;

    /// Delete a document. Returns whether anything was removed; deleting
    /// an absent id is not an error.
    async fn delete(&self, id: &str, owner_id: &str) -> DomainResult<bool>;

    /// All documents in an owner partition, in no particular order.
    async fn list_by_owner(&self, owner_id: &str) -> DomainResult<Vec<Item>>;

    /// Documents in an owner partition with `updated_at` strictly after
    /// the watermark.
    async fn changed_since(&self, owner_id: &str, since: DateTime<Utc>) -> DomainResult<Vec<Item>>;
}
