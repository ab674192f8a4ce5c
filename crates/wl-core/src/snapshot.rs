//! Daily analytics snapshots.
//!
//! One row per user per calendar day, recomputed from the entry/break
//! history and upserted. With an unchanged ledger, regenerating a day
//! produces identical field values; the row never carries anything derived
//! from the wall clock.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::burnout::{self, RiskLevel};
use crate::entry::{TimeBreak, TimeEntry, day_bounds};
use crate::ledger::{Collaborators, Ledger, StoreError, breaks_of};
use crate::productivity::{self, PeakHoursConfig};
use crate::types::{Score, UserId};

/// Trailing window feeding the peak-hour fields of a snapshot, in days.
pub const PEAK_WINDOW_DAYS: i64 = 30;

/// The per-day aggregate row, keyed by `(user_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub user_id: UserId,
    pub date: NaiveDate,
    /// Gross span hours (breaks included).
    pub total_hours: f64,
    /// Net worked hours (breaks subtracted, clamped).
    pub productive_hours: f64,
    pub tasks_completed: u32,
    pub breaks_taken: u32,
    pub focus_score: Score,
    pub efficiency_score: Score,
    pub balance_score: Score,
    pub peak_hour_start: Option<u32>,
    pub peak_hour_end: Option<u32>,
    pub longest_session_minutes: i64,
    pub average_session_minutes: f64,
    pub burnout_risk: bool,
    pub overtime_hours: f64,
    pub late_work_hours: f64,
    pub weekend_work_hours: f64,
    pub consecutive_days: u32,
}

/// Recomputes the snapshot for `(user, date)` and upserts it.
///
/// `as_of` only closes open intervals (today's running entry); for fully
/// completed days the result does not depend on it, which is what makes
/// regeneration idempotent.
pub fn generate_daily_snapshot<S: Ledger + Collaborators + ?Sized>(
    store: &mut S,
    user: &UserId,
    date: NaiveDate,
    as_of: DateTime<Utc>,
) -> Result<AnalyticsSnapshot, StoreError> {
    let (day_start, day_end) = day_bounds(date);
    let entries = store.entries_in_range(user, day_start, day_end)?;
    let breaks = breaks_of(store, &entries)?;
    // Open intervals close at as_of, but never beyond the day's end.
    let close_at = as_of.min(day_end);

    let total_hours = sum_hours(&entries, close_at, |e, at| e.gross_duration(at));
    let productive_hours = sum_hours(&entries, close_at, |e, at| e.net_duration(&breaks, at));

    let tasks_completed = store.tasks_completed_in_range(user, day_start, day_end)?;
    let focus_score = productivity::focus_score(&entries, &breaks, close_at);
    let efficiency_score = productivity::efficiency_score(tasks_completed, productive_hours);

    let peak_entries =
        store.entries_in_range(user, day_end - Duration::days(PEAK_WINDOW_DAYS), day_end)?;
    let peak = productivity::peak_hours(&peak_entries, &PeakHoursConfig::default(), close_at);
    let (peak_hour_start, peak_hour_end) = if peak_entries.is_empty() {
        (None, None)
    } else {
        (Some(peak.start_hour), Some(peak.end_hour))
    };

    let session_minutes: Vec<i64> = entries
        .iter()
        .map(|e| e.net_duration(&breaks, close_at).num_minutes())
        .collect();
    let longest_session_minutes = session_minutes.iter().copied().max().unwrap_or(0);
    let average_session_minutes = if session_minutes.is_empty() {
        0.0
    } else {
        session_minutes.iter().sum::<i64>() as f64 / session_minutes.len() as f64
    };

    let inputs = burnout::gather_inputs(store, user, date, close_at)?;
    let assessment = burnout::assess(&inputs);

    let snapshot = AnalyticsSnapshot {
        user_id: user.clone(),
        date,
        total_hours,
        productive_hours,
        tasks_completed,
        breaks_taken: u32::try_from(breaks.len()).unwrap_or(u32::MAX),
        focus_score,
        efficiency_score,
        balance_score: Score::clamped(100 - i64::from(assessment.score)),
        peak_hour_start,
        peak_hour_end,
        longest_session_minutes,
        average_session_minutes,
        burnout_risk: assessment.level >= RiskLevel::Medium,
        overtime_hours: inputs.overtime_hours_today,
        late_work_hours: late_hours(&entries, &breaks, close_at),
        weekend_work_hours: if is_weekend(date) { productive_hours } else { 0.0 },
        consecutive_days: inputs.consecutive_days,
    };

    store.upsert_snapshot(&snapshot)?;
    tracing::debug!(user = %user, %date, "snapshot generated");
    Ok(snapshot)
}

fn sum_hours(
    entries: &[TimeEntry],
    as_of: DateTime<Utc>,
    measure: impl Fn(&TimeEntry, DateTime<Utc>) -> Duration,
) -> f64 {
    entries
        .iter()
        .map(|e| measure(e, as_of).num_seconds() as f64 / 3600.0)
        .sum()
}

/// Net hours of the day's sessions starting in the late-night band.
fn late_hours(entries: &[TimeEntry], breaks: &[TimeBreak], as_of: DateTime<Utc>) -> f64 {
    use chrono::Timelike;
    entries
        .iter()
        .filter(|e| {
            let hour = e.start_time.hour();
            hour >= 20 || hour < 6
        })
        .map(|e| e.net_duration(breaks, as_of).num_seconds() as f64 / 3600.0)
        .sum()
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
