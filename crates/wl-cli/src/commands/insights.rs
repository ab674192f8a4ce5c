//! Productivity insights: peak hours and working habits over a trailing
//! window.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use wl_core::ledger::breaks_of;
use wl_core::productivity::{self, PeakHours, PeakHoursConfig, WorkPatterns};
use wl_core::{Ledger, UserId};
use wl_db::Database;

use super::util::format_minutes;

#[derive(Debug, Serialize)]
struct Insights {
    window_days: u32,
    peak_hours: PeakHours,
    patterns: WorkPatterns,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &UserId,
    window_days: u32,
    json: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let window_start = now - Duration::days(i64::from(window_days));
    let entries = db.entries_in_range(user, window_start, now)?;
    let breaks = breaks_of(db, &entries)?;

    let insights = Insights {
        window_days,
        peak_hours: productivity::peak_hours(&entries, &PeakHoursConfig::default(), now),
        patterns: productivity::analyze_work_patterns(&entries, &breaks, now),
    };

    if json {
        serde_json::to_writer_pretty(&mut *writer, &insights)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "Insights for {user} (last {window_days} days)")?;
    writeln!(
        writer,
        "Peak hours: {:02}:00 - {:02}:00 (confidence {:.2})",
        insights.peak_hours.start_hour,
        insights.peak_hours.end_hour,
        insights.peak_hours.confidence.value()
    )?;
    match (
        &insights.patterns.most_productive_day,
        &insights.patterns.least_productive_day,
    ) {
        (Some(most), Some(least)) => {
            writeln!(writer, "Most productive day: {most}")?;
            writeln!(writer, "Least productive day: {least}")?;
        }
        _ => writeln!(writer, "Not enough data for day-of-week patterns.")?,
    }
    writeln!(
        writer,
        "Sessions: longest {}, average {}",
        format_minutes(insights.patterns.longest_session_minutes),
        format_minutes(insights.patterns.average_session_minutes.round() as i64)
    )?;
    writeln!(
        writer,
        "Breaks per day: {:.1}",
        insights.patterns.average_breaks_per_day
    )?;
    Ok(())
}
