//! Storage and collaborator seams.
//!
//! The core never talks to a database directly; it goes through [`Ledger`]
//! for entry/break/snapshot persistence and [`Collaborators`] for the
//! out-of-scope surfaces (task management, user accounts) it consumes data
//! from. This keeps the timer, reconciliation, and analytics logic pure and
//! testable against in-memory fixtures.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::entry::{TimeBreak, TimeEntry};
use crate::snapshot::AnalyticsSnapshot;
use crate::types::{EntryId, UserId};

/// Errors surfaced by a [`Ledger`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is temporarily unreachable (busy, locked, timed out).
    /// Safe to retry the whole operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An insert raced against the single-open-timer constraint.
    #[error("an open timer already exists for user {user}")]
    OpenTimerConflict { user: UserId },

    /// Any other backend failure. Not retryable.
    #[error("storage error: {0}")]
    Backend(String),
}

/// Persistence operations over time entries, breaks, and snapshots.
///
/// Implementations must enforce the single-open-entry-per-user invariant at
/// the store level (a partial unique index in SQLite) and report violations
/// as [`StoreError::OpenTimerConflict`] so check-then-act races in the timer
/// collapse to a clean `AlreadyRunning`.
pub trait Ledger {
    /// The user's open entry, if a timer is running.
    fn open_entry(&self, user: &UserId) -> Result<Option<TimeEntry>, StoreError>;

    /// Fetches a single entry by ID.
    fn entry(&self, id: &EntryId) -> Result<Option<TimeEntry>, StoreError>;

    /// Entries whose `start_time` lies in `[start, end)`, ordered by start
    /// time then ID.
    fn entries_in_range(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>, StoreError>;

    /// The most recent `limit` entries by start time, newest first.
    fn recent_entries(&self, user: &UserId, limit: usize) -> Result<Vec<TimeEntry>, StoreError>;

    /// All breaks belonging to one entry, ordered by start time.
    fn breaks_for_entry(&self, entry: &EntryId) -> Result<Vec<TimeBreak>, StoreError>;

    /// All breaks belonging to any of the given entries.
    fn breaks_for_entries(&self, entries: &[EntryId]) -> Result<Vec<TimeBreak>, StoreError>;

    /// The entry's open break, if it is paused.
    fn open_break(&self, entry: &EntryId) -> Result<Option<TimeBreak>, StoreError>;

    fn insert_entry(&mut self, entry: &TimeEntry) -> Result<(), StoreError>;

    fn update_entry(&mut self, entry: &TimeEntry) -> Result<(), StoreError>;

    /// Deletes an entry and its breaks. Returns false if the ID is unknown.
    fn delete_entry(&mut self, id: &EntryId) -> Result<bool, StoreError>;

    fn insert_break(&mut self, brk: &TimeBreak) -> Result<(), StoreError>;

    fn update_break(&mut self, brk: &TimeBreak) -> Result<(), StoreError>;

    /// Applies a reconciliation merge atomically: persists the updated
    /// survivor, re-parents the absorbed entry's breaks onto it, records the
    /// synthesized gap break if any, and deletes the absorbed entry.
    fn apply_merge(
        &mut self,
        survivor: &TimeEntry,
        absorbed: &EntryId,
        gap_break: Option<&TimeBreak>,
    ) -> Result<(), StoreError>;

    /// Creates or overwrites the snapshot keyed by `(user_id, date)`.
    fn upsert_snapshot(&mut self, snapshot: &AnalyticsSnapshot) -> Result<(), StoreError>;

    /// Fetches one snapshot row.
    fn snapshot(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<AnalyticsSnapshot>, StoreError>;

    /// Snapshots with `date` in `[from, to]`, ordered by date ascending.
    fn snapshots_in_range(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AnalyticsSnapshot>, StoreError>;
}

/// Data the core consumes from out-of-scope surfaces.
///
/// Task management supplies completion counts, the account surface supplies
/// the per-user daily target and the batch scope. The core treats all of it
/// as opaque input.
pub trait Collaborators {
    /// The user's daily target in hours. Implementations fall back to
    /// [`DEFAULT_DAILY_TARGET_HOURS`] when no target is configured.
    fn daily_target_hours(&self, user: &UserId) -> Result<f64, StoreError>;

    /// Number of tasks the user completed in `[start, end)`.
    fn tasks_completed_in_range(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32, StoreError>;

    /// Users in scope for batch snapshot generation.
    fn active_users(&self) -> Result<Vec<UserId>, StoreError>;
}

/// Fallback daily target when the account surface has none configured.
pub const DEFAULT_DAILY_TARGET_HOURS: f64 = 8.0;

/// Convenience: the IDs of a slice of entries, for break lookups.
#[must_use]
pub fn entry_ids(entries: &[TimeEntry]) -> Vec<EntryId> {
    entries.iter().map(|e| e.id.clone()).collect()
}

/// Convenience: collects the breaks of `entries` from the ledger.
pub fn breaks_of<L: Ledger + ?Sized>(
    ledger: &L,
    entries: &[TimeEntry],
) -> Result<Vec<TimeBreak>, StoreError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    ledger.breaks_for_entries(&entry_ids(entries))
}
