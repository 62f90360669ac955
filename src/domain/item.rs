//! Item Entity
//!
//! The single polymorphic document tracked by the sync engine. `task` and
//! `goal` carry the modeled fields below; `category` and `dashboard`
//! documents ride along through the flattened `extra` map, which also
//! preserves any client field the engine does not model (notes,
//! category_id, goal_ids, layout blobs, ...).

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity::{DomainError, DomainResult};

/// Current UTC time truncated to whole seconds, the precision items are
/// stamped with.
pub fn utc_now_secs() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Item type determines id format and grouping; immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Task,
    Goal,
    Category,
    Dashboard,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Task => "task",
            ItemType::Goal => "goal",
            ItemType::Category => "category",
            ItemType::Dashboard => "dashboard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "task" => Some(ItemType::Task),
            "goal" => Some(ItemType::Goal),
            "category" => Some(ItemType::Category),
            "dashboard" => Some(ItemType::Dashboard),
            _ => None,
        }
    }

    /// One-character prefix used in generated ids. Only tasks and goals
    /// get generated ids.
    pub fn id_tag(&self) -> Option<char> {
        match self {
            ItemType::Task => Some('t'),
            ItemType::Goal => Some('g'),
            _ => None,
        }
    }
}

/// Workflow status. For a recurring task `Complete` is transient: the
/// engine rolls the item forward and never persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    WorkingOnIt,
    Complete,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::WorkingOnIt => "working_on_it",
            Status::Complete => "complete",
        }
    }

    /// Parse the storage form ("working_on_it").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Status::NotStarted),
            "working_on_it" => Some(Status::WorkingOnIt),
            "complete" => Some(Status::Complete),
            _ => None,
        }
    }

    /// Parse the display form used by the bulk-update payloads
    /// ("Working On It").
    pub fn from_display(s: &str) -> Option<Self> {
        match s {
            "Not Started" => Some(Status::NotStarted),
            "Working On It" => Some(Status::WorkingOnIt),
            "Complete" => Some(Status::Complete),
            _ => None,
        }
    }
}

/// Discrete priority labels mapped onto the 0-100 scale at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityLabel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl PriorityLabel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Very High" => Some(PriorityLabel::VeryHigh),
            "High" => Some(PriorityLabel::High),
            "Medium" => Some(PriorityLabel::Medium),
            "Low" => Some(PriorityLabel::Low),
            "Very Low" => Some(PriorityLabel::VeryLow),
            _ => None,
        }
    }

    pub fn score(&self) -> u8 {
        match self {
            PriorityLabel::VeryHigh => 90,
            PriorityLabel::High => 70,
            PriorityLabel::Medium => 50,
            PriorityLabel::Low => 30,
            PriorityLabel::VeryLow => 10,
        }
    }
}

/// One recurrence completion. The history is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A task/goal/category/dashboard document.
///
/// `updated_at` is the sync watermark: it is rewritten on every accepted
/// mutation and is monotonically non-decreasing for a given item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub owner_id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub dynamic_priority: u8,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub frequency_in_days: Option<i64>,
    #[serde(default)]
    pub completion_history: Vec<CompletionEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Fields the engine does not model, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// Create a bare item with default fields, stamped at `now`.
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        item_type: ItemType,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            item_type,
            title: title.into(),
            status: Status::default(),
            priority: PriorityLabel::Medium.score(),
            dynamic_priority: PriorityLabel::Medium.score(),
            due_date: None,
            is_recurring: false,
            frequency_in_days: None,
            completion_history: Vec::new(),
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }

    /// Deserialize an item from a merged document, surfacing schema
    /// problems as validation errors.
    pub fn from_document(doc: Value) -> DomainResult<Self> {
        serde_json::from_value(doc).map_err(|e| DomainError::Validation(format!("bad item document: {}", e)))
    }

    /// Serialize to the internal (snake_case) document form.
    pub fn to_document(&self) -> DomainResult<Value> {
        serde_json::to_value(self).map_err(|e| DomainError::Internal(format!("serialize item: {}", e)))
    }
}
