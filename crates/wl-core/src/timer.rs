//! Timer state machine and entry maintenance.
//!
//! Per user the machine moves Idle → Running → (Paused ⇄ Running) → Idle.
//! "Running" is an open entry with no open break; "Paused" is an open entry
//! with an open break. The store-level partial unique index backstops the
//! check-then-act in [`start`]: a racing insert surfaces as
//! [`StoreError::OpenTimerConflict`] and maps to [`TimerError::AlreadyRunning`].

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::entry::{TimeBreak, TimeEntry, normalize_task_ids};
use crate::ledger::{Ledger, StoreError};
use crate::reconcile::{ReconcileOutcome, reconcile};
use crate::types::{BreakId, BreakReason, EntryId, UserId};

/// Timer and entry-maintenance errors.
///
/// The state-conflict variants are user-correctable and surfaced verbatim.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("timer already running")]
    AlreadyRunning,

    #[error("no active timer")]
    NoActiveTimer,

    #[error("timer already paused")]
    AlreadyPaused,

    #[error("timer is not paused")]
    NotPaused,

    #[error("invalid time range: end {end} is not after start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("entry not found: {id}")]
    NotFound { id: EntryId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Optional fields for a new entry.
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    pub description: Option<String>,
    pub task_ids: Vec<String>,
    pub subtask_id: Option<String>,
}

/// Field-level patch for [`update_entry`]. `Some` replaces the field.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub description: Option<String>,
    pub task_ids: Option<Vec<String>>,
    pub subtask_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Starts a new timer for the user.
pub fn start<L: Ledger>(
    ledger: &mut L,
    user: &UserId,
    options: EntryOptions,
    now: DateTime<Utc>,
) -> Result<TimeEntry, TimerError> {
    if ledger.open_entry(user)?.is_some() {
        return Err(TimerError::AlreadyRunning);
    }

    let entry = TimeEntry {
        id: EntryId::generate(),
        user_id: user.clone(),
        start_time: now,
        end_time: None,
        description: options.description,
        is_manual: false,
        subtask_id: options.subtask_id,
        task_ids: normalize_task_ids(options.task_ids),
        created_at: now,
        updated_at: now,
    };

    match ledger.insert_entry(&entry) {
        Ok(()) => {}
        // Lost the race against a concurrent start(); same outcome as the
        // check above.
        Err(StoreError::OpenTimerConflict { .. }) => return Err(TimerError::AlreadyRunning),
        Err(e) => return Err(e.into()),
    }

    tracing::debug!(user = %user, entry = %entry.id, "timer started");
    Ok(entry)
}

/// Pauses the user's running timer by opening a break.
pub fn pause<L: Ledger>(
    ledger: &mut L,
    user: &UserId,
    now: DateTime<Utc>,
) -> Result<TimeBreak, TimerError> {
    let entry = ledger.open_entry(user)?.ok_or(TimerError::NoActiveTimer)?;
    if ledger.open_break(&entry.id)?.is_some() {
        return Err(TimerError::AlreadyPaused);
    }

    let brk = TimeBreak {
        id: BreakId::generate(),
        entry_id: entry.id.clone(),
        start_time: now,
        end_time: None,
        reason: Some(BreakReason::Pause),
    };
    ledger.insert_break(&brk)?;

    tracing::debug!(user = %user, entry = %entry.id, "timer paused");
    Ok(brk)
}

/// Resumes a paused timer by closing the open break.
pub fn resume<L: Ledger>(
    ledger: &mut L,
    user: &UserId,
    now: DateTime<Utc>,
) -> Result<TimeBreak, TimerError> {
    let entry = ledger.open_entry(user)?.ok_or(TimerError::NoActiveTimer)?;
    let mut brk = ledger.open_break(&entry.id)?.ok_or(TimerError::NotPaused)?;

    brk.end_time = Some(now);
    ledger.update_break(&brk)?;

    tracing::debug!(user = %user, entry = %entry.id, "timer resumed");
    Ok(brk)
}

/// Stops the user's running timer.
///
/// Closes any open break, completes the entry at `now`, then runs the entry
/// through reconciliation; the result may be a merge into an earlier
/// same-day session.
pub fn stop<L: Ledger>(
    ledger: &mut L,
    user: &UserId,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome, TimerError> {
    let mut entry = ledger.open_entry(user)?.ok_or(TimerError::NoActiveTimer)?;

    if let Some(mut brk) = ledger.open_break(&entry.id)? {
        brk.end_time = Some(now);
        ledger.update_break(&brk)?;
    }

    entry.end_time = Some(now);
    entry.updated_at = now;
    ledger.update_entry(&entry)?;

    tracing::debug!(user = %user, entry = %entry.id, "timer stopped");
    Ok(reconcile(ledger, &entry, now)?)
}

/// Creates a completed back-fill entry and reconciles it.
///
/// Funnels through the same merge path as [`stop`], so a back-filled
/// session fragments the day no more than a restarted timer would.
pub fn create_manual_entry<L: Ledger>(
    ledger: &mut L,
    user: &UserId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    options: EntryOptions,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome, TimerError> {
    if end_time <= start_time {
        return Err(TimerError::InvalidRange {
            start: start_time,
            end: end_time,
        });
    }

    let entry = TimeEntry {
        id: EntryId::generate(),
        user_id: user.clone(),
        start_time,
        end_time: Some(end_time),
        description: options.description,
        is_manual: true,
        subtask_id: options.subtask_id,
        task_ids: normalize_task_ids(options.task_ids),
        created_at: now,
        updated_at: now,
    };
    ledger.insert_entry(&entry)?;

    tracing::debug!(user = %user, entry = %entry.id, "manual entry created");
    Ok(reconcile(ledger, &entry, now)?)
}

/// Applies a patch to an existing entry.
pub fn update_entry<L: Ledger>(
    ledger: &mut L,
    id: &EntryId,
    patch: EntryPatch,
    now: DateTime<Utc>,
) -> Result<TimeEntry, TimerError> {
    let mut entry = ledger
        .entry(id)?
        .ok_or_else(|| TimerError::NotFound { id: id.clone() })?;

    if let Some(description) = patch.description {
        entry.description = Some(description);
    }
    if let Some(task_ids) = patch.task_ids {
        entry.task_ids = normalize_task_ids(task_ids);
    }
    if let Some(subtask_id) = patch.subtask_id {
        entry.subtask_id = Some(subtask_id);
    }
    if let Some(start_time) = patch.start_time {
        entry.start_time = start_time;
    }
    if let Some(end_time) = patch.end_time {
        entry.end_time = Some(end_time);
    }

    if let Some(end) = entry.end_time {
        if end <= entry.start_time {
            return Err(TimerError::InvalidRange {
                start: entry.start_time,
                end,
            });
        }
    }

    entry.updated_at = now;
    ledger.update_entry(&entry)?;
    Ok(entry)
}

/// Deletes an entry and its breaks.
pub fn delete_entry<L: Ledger>(ledger: &mut L, id: &EntryId) -> Result<(), TimerError> {
    if ledger.delete_entry(id)? {
        Ok(())
    } else {
        Err(TimerError::NotFound { id: id.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryLedger;
    use chrono::Duration;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn start_twice_is_already_running() {
        let mut ledger = MemoryLedger::default();
        start(
            &mut ledger,
            &user(),
            EntryOptions::default(),
            ts("2025-03-03T09:00:00Z"),
        )
        .unwrap();
        let err = start(
            &mut ledger,
            &user(),
            EntryOptions::default(),
            ts("2025-03-03T09:05:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, TimerError::AlreadyRunning));
    }

    #[test]
    fn start_does_not_affect_other_users() {
        let mut ledger = MemoryLedger::default();
        start(
            &mut ledger,
            &user(),
            EntryOptions::default(),
            ts("2025-03-03T09:00:00Z"),
        )
        .unwrap();
        let other = UserId::new("user-2").unwrap();
        assert!(
            start(
                &mut ledger,
                &other,
                EntryOptions::default(),
                ts("2025-03-03T09:00:00Z"),
            )
            .is_ok()
        );
    }

    #[test]
    fn pause_without_timer_is_no_active_timer() {
        let mut ledger = MemoryLedger::default();
        let err = pause(&mut ledger, &user(), ts("2025-03-03T09:00:00Z")).unwrap_err();
        assert!(matches!(err, TimerError::NoActiveTimer));
    }

    #[test]
    fn pause_twice_is_already_paused() {
        let mut ledger = MemoryLedger::default();
        start(
            &mut ledger,
            &user(),
            EntryOptions::default(),
            ts("2025-03-03T09:00:00Z"),
        )
        .unwrap();
        pause(&mut ledger, &user(), ts("2025-03-03T09:30:00Z")).unwrap();
        let err = pause(&mut ledger, &user(), ts("2025-03-03T09:31:00Z")).unwrap_err();
        assert!(matches!(err, TimerError::AlreadyPaused));
    }

    #[test]
    fn resume_without_pause_is_not_paused() {
        let mut ledger = MemoryLedger::default();
        start(
            &mut ledger,
            &user(),
            EntryOptions::default(),
            ts("2025-03-03T09:00:00Z"),
        )
        .unwrap();
        let err = resume(&mut ledger, &user(), ts("2025-03-03T09:30:00Z")).unwrap_err();
        assert!(matches!(err, TimerError::NotPaused));
    }

    #[test]
    fn pause_resume_stop_yields_net_duration() {
        let mut ledger = MemoryLedger::default();
        let u = user();
        // 2h span with a 15-minute pause: 105 net minutes.
        start(
            &mut ledger,
            &u,
            EntryOptions::default(),
            ts("2025-03-03T09:00:00Z"),
        )
        .unwrap();
        pause(&mut ledger, &u, ts("2025-03-03T10:00:00Z")).unwrap();
        resume(&mut ledger, &u, ts("2025-03-03T10:15:00Z")).unwrap();
        let outcome = stop(&mut ledger, &u, ts("2025-03-03T11:00:00Z")).unwrap();
        assert!(!outcome.merged);

        let breaks = ledger.breaks_for_entry(&outcome.entry.id).unwrap();
        let net = outcome
            .entry
            .net_duration(&breaks, ts("2025-03-03T11:00:00Z"));
        assert_eq!(net, Duration::minutes(105));
    }

    #[test]
    fn stop_closes_open_break() {
        let mut ledger = MemoryLedger::default();
        let u = user();
        start(
            &mut ledger,
            &u,
            EntryOptions::default(),
            ts("2025-03-03T09:00:00Z"),
        )
        .unwrap();
        pause(&mut ledger, &u, ts("2025-03-03T09:30:00Z")).unwrap();
        let outcome = stop(&mut ledger, &u, ts("2025-03-03T10:00:00Z")).unwrap();

        let breaks = ledger.breaks_for_entry(&outcome.entry.id).unwrap();
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].end_time, Some(ts("2025-03-03T10:00:00Z")));
    }

    #[test]
    fn stop_merges_with_earlier_same_context_session() {
        let mut ledger = MemoryLedger::default();
        let u = user();
        let options = || EntryOptions {
            description: Some("api work".into()),
            task_ids: vec!["task-1".into()],
            subtask_id: None,
        };

        start(&mut ledger, &u, options(), ts("2025-03-03T09:00:00Z")).unwrap();
        stop(&mut ledger, &u, ts("2025-03-03T10:00:00Z")).unwrap();

        start(&mut ledger, &u, options(), ts("2025-03-03T10:30:00Z")).unwrap();
        let outcome = stop(&mut ledger, &u, ts("2025-03-03T11:00:00Z")).unwrap();

        assert!(outcome.merged);
        assert_eq!(outcome.entry.start_time, ts("2025-03-03T09:00:00Z"));
        assert_eq!(outcome.entry.end_time, Some(ts("2025-03-03T11:00:00Z")));
        let breaks = ledger.breaks_for_entry(&outcome.entry.id).unwrap();
        let net = outcome
            .entry
            .net_duration(&breaks, ts("2025-03-03T11:00:00Z"));
        assert_eq!(net, Duration::minutes(90));
    }

    #[test]
    fn manual_entry_rejects_inverted_range() {
        let mut ledger = MemoryLedger::default();
        let err = create_manual_entry(
            &mut ledger,
            &user(),
            ts("2025-03-03T10:00:00Z"),
            ts("2025-03-03T09:00:00Z"),
            EntryOptions::default(),
            ts("2025-03-03T12:00:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, TimerError::InvalidRange { .. }));
        assert!(
            ledger
                .entries_in_range(
                    &user(),
                    ts("2025-03-03T00:00:00Z"),
                    ts("2025-03-04T00:00:00Z"),
                )
                .unwrap()
                .is_empty(),
            "nothing may be persisted on validation failure"
        );
    }

    #[test]
    fn manual_entry_merges_like_stop() {
        let mut ledger = MemoryLedger::default();
        let u = user();
        create_manual_entry(
            &mut ledger,
            &u,
            ts("2025-03-03T09:00:00Z"),
            ts("2025-03-03T10:00:00Z"),
            EntryOptions::default(),
            ts("2025-03-03T12:00:00Z"),
        )
        .unwrap();
        let outcome = create_manual_entry(
            &mut ledger,
            &u,
            ts("2025-03-03T10:30:00Z"),
            ts("2025-03-03T11:00:00Z"),
            EntryOptions::default(),
            ts("2025-03-03T12:05:00Z"),
        )
        .unwrap();
        assert!(outcome.merged);
        assert_eq!(outcome.entry.start_time, ts("2025-03-03T09:00:00Z"));
        assert_eq!(outcome.entry.end_time, Some(ts("2025-03-03T11:00:00Z")));
    }

    #[test]
    fn update_entry_rejects_inverted_range() {
        let mut ledger = MemoryLedger::default();
        let u = user();
        let outcome = create_manual_entry(
            &mut ledger,
            &u,
            ts("2025-03-03T09:00:00Z"),
            ts("2025-03-03T10:00:00Z"),
            EntryOptions::default(),
            ts("2025-03-03T12:00:00Z"),
        )
        .unwrap();
        let err = update_entry(
            &mut ledger,
            &outcome.entry.id,
            EntryPatch {
                end_time: Some(ts("2025-03-03T08:00:00Z")),
                ..EntryPatch::default()
            },
            ts("2025-03-03T13:00:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, TimerError::InvalidRange { .. }));
    }

    #[test]
    fn update_unknown_entry_is_not_found() {
        let mut ledger = MemoryLedger::default();
        let id = EntryId::new("missing").unwrap();
        let err = update_entry(
            &mut ledger,
            &id,
            EntryPatch::default(),
            ts("2025-03-03T12:00:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, TimerError::NotFound { .. }));
    }

    #[test]
    fn delete_unknown_entry_is_not_found() {
        let mut ledger = MemoryLedger::default();
        let id = EntryId::new("missing").unwrap();
        assert!(matches!(
            delete_entry(&mut ledger, &id).unwrap_err(),
            TimerError::NotFound { .. }
        ));
    }

    #[test]
    fn at_most_one_open_entry_per_user() {
        let mut ledger = MemoryLedger::default();
        let u = user();
        start(
            &mut ledger,
            &u,
            EntryOptions::default(),
            ts("2025-03-03T09:00:00Z"),
        )
        .unwrap();
        let _ = start(
            &mut ledger,
            &u,
            EntryOptions::default(),
            ts("2025-03-03T09:01:00Z"),
        );
        let open: Vec<_> = ledger
            .entries_in_range(&u, ts("2025-03-03T00:00:00Z"), ts("2025-03-04T00:00:00Z"))
            .unwrap()
            .into_iter()
            .filter(TimeEntry::is_open)
            .collect();
        assert_eq!(open.len(), 1);
    }
}
