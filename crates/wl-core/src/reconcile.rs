//! Session reconciliation: merging fragmented same-day sessions.
//!
//! A user who stops and restarts a timer for the same work, or back-fills a
//! manual entry for it, would otherwise fragment one session into several
//! ledger rows. Reconciliation finds a completed same-day entry with an
//! equal [`SessionContext`] and merges the candidate into it, synthesizing a
//! `gap_between_sessions` break for any idle time between the two intervals
//! so the net-duration math never counts the gap as work.

use chrono::{DateTime, Utc};

use crate::entry::{SessionContext, TimeBreak, TimeEntry, day_bounds};
use crate::ledger::{Ledger, StoreError};
use crate::types::BreakId;
use crate::types::BreakReason;

/// Result of reconciling a candidate entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The surviving entry: either the merged entry or the candidate itself.
    pub entry: TimeEntry,
    /// Whether a merge occurred.
    pub merged: bool,
}

/// Reconciles an already-persisted completed candidate against the same-day
/// completed entries sharing its [`SessionContext`].
///
/// Both the `stop()` path and manual back-fill creation call this with the
/// candidate already in the store; on a merge the survivor is updated and
/// the absorbed row deleted in one transactional
/// [`Ledger::apply_merge`] call.
pub fn reconcile<L: Ledger>(
    ledger: &mut L,
    candidate: &TimeEntry,
    as_of: DateTime<Utc>,
) -> Result<ReconcileOutcome, StoreError> {
    let Some(matched) = find_match(ledger, candidate)? else {
        return Ok(ReconcileOutcome {
            entry: candidate.clone(),
            merged: false,
        });
    };

    tracing::debug!(
        candidate = %candidate.id,
        matched = %matched.id,
        "merging same-day sessions"
    );

    let (survivor, absorbed) = pick_survivor(candidate.clone(), matched);
    let gap_break = gap_between(&survivor, &absorbed).map(|(gap_start, gap_end)| TimeBreak {
        id: BreakId::generate(),
        entry_id: survivor.id.clone(),
        start_time: gap_start,
        end_time: Some(gap_end),
        reason: Some(BreakReason::GapBetweenSessions),
    });

    let mut merged = survivor;
    merged.start_time = merged.start_time.min(absorbed.start_time);
    // Matching is restricted to completed entries, so both ends are present
    // here; an absent end would mean a still-open entry and must survive.
    merged.end_time = match (merged.end_time, absorbed.end_time) {
        (Some(a), Some(b)) => Some(a.max(b)),
        _ => None,
    };
    merged.updated_at = as_of;

    ledger.apply_merge(&merged, &absorbed.id, gap_break.as_ref())?;

    Ok(ReconcileOutcome {
        entry: merged,
        merged: true,
    })
}

/// Finds the completed same-day entry with an equal context, if any.
///
/// Multiple matches should not exist when merging is applied consistently,
/// but the pick must be deterministic regardless: lowest start time, then
/// lowest ID.
fn find_match<L: Ledger>(
    ledger: &L,
    candidate: &TimeEntry,
) -> Result<Option<TimeEntry>, StoreError> {
    let (day_start, day_end) = day_bounds(candidate.start_time.date_naive());
    let context = SessionContext::of(candidate);

    let mut matches: Vec<TimeEntry> = ledger
        .entries_in_range(&candidate.user_id, day_start, day_end)?
        .into_iter()
        .filter(|e| e.id != candidate.id && !e.is_open())
        .filter(|e| SessionContext::of(e) == context)
        .collect();
    matches.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
    Ok(matches.into_iter().next())
}

/// Keeps the entry clients are more likely to already reference: the one
/// created first (ties broken by lower ID).
fn pick_survivor(candidate: TimeEntry, matched: TimeEntry) -> (TimeEntry, TimeEntry) {
    let candidate_first = (candidate.created_at, &candidate.id) < (matched.created_at, &matched.id);
    if candidate_first {
        (candidate, matched)
    } else {
        (matched, candidate)
    }
}

/// The idle gap between two non-overlapping intervals, if any.
///
/// Open entries are never merged, so a missing end is treated as touching
/// (no gap to synthesize).
fn gap_between(a: &TimeEntry, b: &TimeEntry) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (earlier, later) = if a.start_time <= b.start_time {
        (a, b)
    } else {
        (b, a)
    };
    let earlier_end = earlier.end_time?;
    (earlier_end < later.start_time).then_some((earlier_end, later.start_time))
}
