//! Timer commands: start, pause, resume, stop, status.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use wl_core::timer::{self, EntryOptions};
use wl_core::{Ledger, UserId};
use wl_db::Database;

use super::util::{format_minutes, format_timestamp};

pub fn start<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &UserId,
    options: EntryOptions,
    now: DateTime<Utc>,
) -> Result<()> {
    let entry = timer::start(db, user, options, now)?;
    writeln!(
        writer,
        "Timer started at {} (entry {})",
        format_timestamp(entry.start_time),
        entry.id
    )?;
    Ok(())
}

pub fn pause<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &UserId,
    now: DateTime<Utc>,
) -> Result<()> {
    let brk = timer::pause(db, user, now)?;
    writeln!(writer, "Timer paused at {}", format_timestamp(brk.start_time))?;
    Ok(())
}

pub fn resume<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &UserId,
    now: DateTime<Utc>,
) -> Result<()> {
    let brk = timer::resume(db, user, now)?;
    writeln!(
        writer,
        "Timer resumed after a {} break",
        format_minutes(brk.duration(now).num_minutes())
    )?;
    Ok(())
}

pub fn stop<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &UserId,
    now: DateTime<Utc>,
) -> Result<()> {
    let outcome = timer::stop(db, user, now)?;
    let breaks = db.breaks_for_entry(&outcome.entry.id)?;
    let worked = outcome.entry.net_duration(&breaks, now);
    writeln!(
        writer,
        "Timer stopped: {} worked",
        format_minutes(worked.num_minutes())
    )?;
    if outcome.merged {
        writeln!(
            writer,
            "Merged into same-day session {} ({} - {})",
            outcome.entry.id,
            format_timestamp(outcome.entry.start_time),
            format_timestamp(outcome.entry.effective_end(now)),
        )?;
    }
    Ok(())
}

pub fn status<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &UserId,
    now: DateTime<Utc>,
) -> Result<()> {
    let Some(entry) = db.open_entry(user)? else {
        writeln!(writer, "No active timer.")?;
        return Ok(());
    };

    let breaks = db.breaks_for_entry(&entry.id)?;
    let paused = breaks.iter().any(wl_core::TimeBreak::is_open);
    let state = if paused { "paused" } else { "running" };
    let worked = entry.net_duration(&breaks, now);

    writeln!(writer, "Timer {state} (entry {})", entry.id)?;
    writeln!(writer, "Started: {}", format_timestamp(entry.start_time))?;
    writeln!(writer, "Worked: {}", format_minutes(worked.num_minutes()))?;
    if let Some(description) = &entry.description {
        writeln!(writer, "Description: {description}")?;
    }
    if !entry.task_ids.is_empty() {
        writeln!(writer, "Tasks: {}", entry.task_ids.join(", "))?;
    }
    Ok(())
}
