//! Recurrence Rollover
//!
//! A recurring task never rests at `complete`: completing it appends to
//! its history and resets it for the next cycle. Everything else is a
//! plain field update handled by the engine's merge path.

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::domain::{CompletionEntry, Item, Status};

/// Outcome of a requested status transition against an existing item.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusResolution {
    /// Ordinary update; the engine merges the payload as-is.
    Plain,
    /// Recurrence rollover. The resolved item replaces the stored one
    /// wholesale and supersedes the rest of the update payload.
    RolledOver(Item),
}

/// Decide how a status transition applies to `existing`.
///
/// Completing a recurring task rolls it forward: history grows by one
/// entry stamped `now`, status resets to `not_started`, and if the item
/// has a positive `frequency_in_days` the due date advances to
/// `now + frequency` (not `old_due + frequency` — a late completion
/// schedules from today).
pub fn apply_status_change(
    existing: &Item,
    requested: Option<Status>,
    now: DateTime<Utc>,
) -> StatusResolution {
    if !existing.is_recurring || requested != Some(Status::Complete) {
        return StatusResolution::Plain;
    }

    let mut rolled = existing.clone();
    // A frequency too large for the datetime to hold behaves like no
    // frequency at all: the history still grows, the due date stays.
    let next_due = match rolled.frequency_in_days {
        Some(freq) if freq > 0 => {
            Duration::try_days(freq).and_then(|d| now.checked_add_signed(d))
        }
        _ => None,
    };
    rolled.completion_history.push(CompletionEntry {
        completed_at: now,
        next_due_date: next_due,
        notes: None,
    });
    rolled.status = Status::NotStarted;
    if let Some(due) = next_due {
        rolled.due_date = Some(due);
    }
    rolled.updated_at = now;
    debug!(
        "rolled recurring item {} forward, next due {:?}",
        rolled.id, next_due
    );
    StatusResolution::RolledOver(rolled)
}
