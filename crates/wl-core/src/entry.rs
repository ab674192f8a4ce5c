//! Time-entry and break records, and the interval math on top of them.
//!
//! Open intervals (a running entry, an active pause) have no stored end;
//! every duration computation takes an explicit `as_of` instant to close
//! them, so the math stays deterministic and testable.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BreakId, BreakReason, EntryId, UserId};

/// A single tracked work session.
///
/// An entry with `end_time = None` is the user's running timer. Entries are
/// mutated only through the timer and reconciliation operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
    /// True for back-filled entries created without a running timer.
    pub is_manual: bool,
    pub subtask_id: Option<String>,
    /// Associated task IDs, kept sorted and deduplicated.
    pub task_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeEntry {
    /// Whether the entry is still running.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// The end of the entry's interval, closing open entries at `as_of`.
    #[must_use]
    pub fn effective_end(&self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        self.end_time.unwrap_or(as_of)
    }

    /// Wall-clock span of the entry, breaks included. Never negative.
    #[must_use]
    pub fn gross_duration(&self, as_of: DateTime<Utc>) -> Duration {
        (self.effective_end(as_of) - self.start_time).max(Duration::zero())
    }

    /// Worked time net of breaks: `(end - start) - sum(break durations)`,
    /// clamped to zero.
    #[must_use]
    pub fn net_duration(&self, breaks: &[TimeBreak], as_of: DateTime<Utc>) -> Duration {
        let gross = self.gross_duration(as_of);
        let paused = breaks
            .iter()
            .filter(|b| b.entry_id == self.id)
            .fold(Duration::zero(), |acc, b| acc + b.duration(as_of));
        (gross - paused).max(Duration::zero())
    }
}

/// A pause within a time entry.
///
/// A break with `end_time = None` is the active pause of a running entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBreak {
    pub id: BreakId,
    pub entry_id: EntryId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub reason: Option<BreakReason>,
}

impl TimeBreak {
    /// Whether the break is the active pause.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Length of the break, closing an open break at `as_of`. Never negative.
    #[must_use]
    pub fn duration(&self, as_of: DateTime<Utc>) -> Duration {
        (self.end_time.unwrap_or(as_of) - self.start_time).max(Duration::zero())
    }
}

/// The reconciliation matching key of an entry.
///
/// Two same-day completed entries merge when their contexts are equal:
/// same sorted task-id set, same optional subtask, and same trimmed
/// description (where blank and absent both count as "no description").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionContext {
    task_ids: Vec<String>,
    subtask_id: Option<String>,
    description: Option<String>,
}

impl SessionContext {
    /// Extracts the matching key from an entry.
    #[must_use]
    pub fn of(entry: &TimeEntry) -> Self {
        let mut task_ids = entry.task_ids.clone();
        task_ids.sort_unstable();
        task_ids.dedup();
        Self {
            task_ids,
            subtask_id: entry.subtask_id.clone(),
            description: normalize_description(entry.description.as_deref()),
        }
    }
}

/// Trims a description, mapping blank and absent to `None`.
#[must_use]
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Sorts and deduplicates a task-id set for storage.
#[must_use]
pub fn normalize_task_ids(mut task_ids: Vec<String>) -> Vec<String> {
    task_ids.sort_unstable();
    task_ids.dedup();
    task_ids
}

/// UTC bounds of a calendar day as a half-open interval `[start, end)`.
#[must_use]
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
    (start, start + Duration::days(1))
}
