//! Productivity calculators: peak hours, focus, efficiency, work patterns.
//!
//! All functions are pure over slices of entries/breaks with an explicit
//! `as_of` close for open intervals; callers fetch the window from the
//! ledger and pass it in.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::Serialize;

use crate::entry::{TimeBreak, TimeEntry};
use crate::types::{Confidence, Score};

/// Tuning for peak-hour detection.
#[derive(Debug, Clone)]
pub struct PeakHoursConfig {
    /// Width of the contiguous peak window, in hours.
    pub window_hours: usize,

    /// Multiplier applied to `peak_sum / total_sum` before capping the
    /// confidence at 1.0. Inherited tuning constant with no derivation;
    /// kept overridable rather than inlined.
    pub confidence_boost: f64,
}

impl Default for PeakHoursConfig {
    fn default() -> Self {
        Self {
            window_hours: 3,
            confidence_boost: 2.0,
        }
    }
}

/// Neutral fallback window when there is no data: 09:00–12:00.
pub const NEUTRAL_PEAK_START: u32 = 9;

/// The user's peak working hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakHours {
    /// Start hour of day, 0–23.
    pub start_hour: u32,
    /// End hour of day (exclusive), 1–24.
    pub end_hour: u32,
    pub confidence: Confidence,
}

/// Detects the contiguous hours of day where the most work happens.
///
/// Entry intervals are sliced at hour boundaries with minute precision, so
/// a session spanning several hours contributes fractionally to each. The
/// best window is chosen without wraparound; ties keep the earliest start.
#[must_use]
pub fn peak_hours(
    entries: &[TimeEntry],
    config: &PeakHoursConfig,
    as_of: DateTime<Utc>,
) -> PeakHours {
    let buckets = hour_buckets(entries, as_of);
    let total: f64 = buckets.iter().sum();
    if total <= 0.0 {
        return PeakHours {
            start_hour: NEUTRAL_PEAK_START,
            end_hour: NEUTRAL_PEAK_START + u32::try_from(config.window_hours).unwrap_or(3),
            confidence: Confidence::MIN,
        };
    }

    let window = config.window_hours.clamp(1, 24);
    let mut best_start = 0usize;
    let mut best_sum = f64::MIN;
    for start in 0..=(24 - window) {
        let sum: f64 = buckets[start..start + window].iter().sum();
        if sum > best_sum {
            best_sum = sum;
            best_start = start;
        }
    }

    let confidence = Confidence::clamped(config.confidence_boost * best_sum / total);
    PeakHours {
        start_hour: u32::try_from(best_start).unwrap_or(0),
        end_hour: u32::try_from(best_start + window).unwrap_or(24),
        confidence,
    }
}

/// Minutes of work per hour of day, summed over all entries.
fn hour_buckets(entries: &[TimeEntry], as_of: DateTime<Utc>) -> [f64; 24] {
    let mut buckets = [0.0f64; 24];
    for entry in entries {
        let end = entry.effective_end(as_of);
        let mut cursor = entry.start_time;
        while cursor < end {
            let next_hour = cursor
                .with_minute(0)
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(cursor)
                + Duration::hours(1);
            let segment_end = end.min(next_hour);
            let minutes = (segment_end - cursor).num_seconds() as f64 / 60.0;
            buckets[cursor.hour() as usize] += minutes;
            cursor = segment_end;
        }
    }
    buckets
}

/// Scores how well a day's sessions support sustained focus, 0–100.
///
/// Starts at 100 and adjusts per session length (fragmented sub-30-minute
/// sessions and 4-hour-plus marathons both cost points, 1–2-hour sessions
/// earn them) and per break cadence relative to hours worked.
#[must_use]
pub fn focus_score(entries: &[TimeEntry], breaks: &[TimeBreak], as_of: DateTime<Utc>) -> Score {
    let mut score: i64 = 100;

    let mut worked = Duration::zero();
    for entry in entries {
        let net = entry.net_duration(breaks, as_of);
        worked = worked + net;

        let minutes = net.num_minutes();
        if minutes < 30 {
            score -= 5;
        } else if (60..=120).contains(&minutes) {
            score += 3;
        }
        if minutes > 240 {
            score -= 10;
        }
    }

    let worked_hours = worked.num_seconds() as f64 / 3600.0;
    if worked_hours > 0.0 {
        let ratio = breaks.len() as f64 / worked_hours;
        if ratio < 0.5 && worked_hours > 4.0 {
            score -= 15;
        } else if ratio > 2.0 {
            score -= 10;
        } else if (0.5..=1.0).contains(&ratio) {
            score += 5;
        }
    }

    Score::clamped(score)
}

/// Tasks completed per hour worked, scaled to 0–100.
#[must_use]
pub fn efficiency_score(tasks_completed: u32, hours_worked: f64) -> Score {
    if hours_worked <= 0.0 {
        return Score::MIN;
    }
    Score::from_f64(f64::from(tasks_completed) / hours_worked * 100.0)
}

/// Aggregated working habits over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkPatterns {
    /// Weekday with the most net hours, `None` with no data.
    pub most_productive_day: Option<String>,
    /// Weekday with the fewest net hours among weekdays with any work.
    pub least_productive_day: Option<String>,
    pub average_session_minutes: f64,
    pub longest_session_minutes: i64,
    pub average_breaks_per_day: f64,
}

/// Fixed weekday order used for deterministic tie-breaking.
const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Names the most and least productive weekdays and summarizes session
/// length and break cadence over the window.
#[must_use]
pub fn analyze_work_patterns(
    entries: &[TimeEntry],
    breaks: &[TimeBreak],
    as_of: DateTime<Utc>,
) -> WorkPatterns {
    let mut weekday_hours = [0.0f64; 7];
    let mut session_minutes: Vec<i64> = Vec::with_capacity(entries.len());
    let mut active_days = std::collections::BTreeSet::new();

    for entry in entries {
        let net = entry.net_duration(breaks, as_of);
        let weekday = entry.start_time.weekday();
        weekday_hours[weekday.num_days_from_monday() as usize] +=
            net.num_seconds() as f64 / 3600.0;
        session_minutes.push(net.num_minutes());
        active_days.insert(entry.start_time.date_naive());
    }

    let mut most: Option<Weekday> = None;
    let mut least: Option<Weekday> = None;
    for day in WEEKDAY_ORDER {
        let hours = weekday_hours[day.num_days_from_monday() as usize];
        if hours <= 0.0 {
            continue;
        }
        // Strict comparisons keep the first weekday in the fixed order on ties.
        if most.is_none_or(|d| hours > weekday_hours[d.num_days_from_monday() as usize]) {
            most = Some(day);
        }
        if least.is_none_or(|d| hours < weekday_hours[d.num_days_from_monday() as usize]) {
            least = Some(day);
        }
    }

    let longest_session_minutes = session_minutes.iter().copied().max().unwrap_or(0);
    let average_session_minutes = if session_minutes.is_empty() {
        0.0
    } else {
        session_minutes.iter().sum::<i64>() as f64 / session_minutes.len() as f64
    };
    let average_breaks_per_day = if active_days.is_empty() {
        0.0
    } else {
        breaks.len() as f64 / active_days.len() as f64
    };

    WorkPatterns {
        most_productive_day: most.map(|d| weekday_name(d).to_string()),
        least_productive_day: least.map(|d| weekday_name(d).to_string()),
        average_session_minutes,
        longest_session_minutes,
        average_breaks_per_day,
    }
}
