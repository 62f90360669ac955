//! Repository Layer
//!
//! The store adapter contract and its implementations. The sync engine
//! only ever talks to `ItemStore`; backends can be swapped freely.

mod db;
mod memory_repo;
mod sqlite_repo;
mod traits;

#[cfg(test)]
mod tests;

pub use memory_repo::MemoryItemStore;
pub use sqlite_repo::SqliteItemStore;
pub use traits::{ItemStore, Stored};
