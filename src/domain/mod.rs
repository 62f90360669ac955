//! Domain Layer
//!
//! Contains the item entity, the error taxonomy and id generation.
//! This layer has NO I/O dependencies (serde/chrono for representation only).

mod entity;
mod item;
mod item_id;

pub use entity::{DomainError, DomainResult};
pub use item::{utc_now_secs, CompletionEntry, Item, ItemType, PriorityLabel, Status};
pub use item_id::generate_id;
