//! Sync Layer
//!
//! The reconciliation engine and everything that exists only for the
//! sync protocol: the change envelope types, the recurrence rollover and
//! the wire-casing field mapper.

mod change;
mod engine;
mod recurrence;
mod wire;


pub use change::{BulkUpdate, ChangeItem, Operation, SyncFailure, SyncRequest, SyncResponse, UserData};
pub use engine::{SyncEngine, MAX_BULK_UPDATES};
pub use recurrence::{apply_status_change, StatusResolution};
pub use wire::FieldMapper;
