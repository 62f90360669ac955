//! Sync Protocol Types
//!
//! The change envelope exchanged with clients. Envelope keys are
//! camelCase on the wire (serde renames); the casing of the `data`
//! payload itself is handled by the field mapper on ingress/egress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{DomainError, ItemType};

/// Mutation kind carried by a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// One client- or server-originated mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeItem {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub operation: Operation,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Inbound sync call: ordered changes plus the client watermark.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub changes: Vec<ChangeItem>,
    pub client_last_sync: String,
}

/// Outbound delta plus the new watermark the client should adopt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub server_changes: Vec<ChangeItem>,
    pub synced_at: DateTime<Utc>,
}

/// A failed sync call: the batch aborted at the first bad change.
///
/// `server_changes` holds whatever was applied and echoed before the
/// failure, so the client can reconcile partial progress instead of
/// silently losing acknowledged writes.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub error: DomainError,
    pub server_changes: Vec<ChangeItem>,
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sync aborted after {} applied changes: {}",
            self.server_changes.len(),
            self.error
        )
    }
}

impl std::error::Error for SyncFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// One entry of the bulk-update endpoint: the target id plus the fields
/// to merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdate {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Full-state snapshot for one owner, grouped by item type. Payloads are
/// in wire (camelCase) form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub tasks: Vec<Value>,
    pub goals: Vec<Value>,
    pub categories: Vec<Value>,
    pub dashboard: Option<Value>,
    pub last_synced_at: DateTime<Utc>,
}
