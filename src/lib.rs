//! Life Manager Sync Core
//!
//! Layered architecture:
//! - domain: Core entities, error taxonomy and id generation
//! - repository: Store adapter contract and implementations
//! - sync: Reconciliation engine, recurrence rules and wire mapping
//!
//! The crate is transport-agnostic: HTTP routing, authentication and
//! request validation live in the embedding application. Everything here
//! is scoped to an owner id the caller has already established.

pub mod domain;
pub mod repository;
pub mod sync;

pub use domain::{
    generate_id, CompletionEntry, DomainError, DomainResult, Item, ItemType, PriorityLabel,
    Status,
};
pub use repository::{ItemStore, MemoryItemStore, SqliteItemStore, Stored};
pub use sync::{
    BulkUpdate, ChangeItem, FieldMapper, Operation, SyncEngine, SyncFailure, SyncRequest,
    SyncResponse, UserData, MAX_BULK_UPDATES,
};
