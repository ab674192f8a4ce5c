//! Entry commands: back-fill, edit, delete, list.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

use wl_core::entry::day_bounds;
use wl_core::timer::{self, EntryOptions, EntryPatch};
use wl_core::{EntryId, Ledger, TimeEntry, UserId};
use wl_db::Database;

use super::util::{format_minutes, format_timestamp};

pub fn add<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &UserId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    options: EntryOptions,
    now: DateTime<Utc>,
) -> Result<()> {
    let outcome = timer::create_manual_entry(db, user, start, end, options, now)?;
    if outcome.merged {
        writeln!(
            writer,
            "Entry merged into same-day session {} ({} - {})",
            outcome.entry.id,
            format_timestamp(outcome.entry.start_time),
            format_timestamp(outcome.entry.effective_end(now)),
        )?;
    } else {
        writeln!(writer, "Entry {} created", outcome.entry.id)?;
    }
    Ok(())
}

pub fn edit<W: Write>(
    writer: &mut W,
    db: &mut Database,
    id: &EntryId,
    patch: EntryPatch,
    now: DateTime<Utc>,
) -> Result<()> {
    let entry = timer::update_entry(db, id, patch, now)?;
    writeln!(writer, "Entry {} updated", entry.id)?;
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, db: &mut Database, id: &EntryId) -> Result<()> {
    timer::delete_entry(db, id)?;
    writeln!(writer, "Entry {id} deleted")?;
    Ok(())
}

pub fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &UserId,
    date: Option<NaiveDate>,
    limit: usize,
    json: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let entries = match date {
        Some(date) => {
            let (day_start, day_end) = day_bounds(date);
            let mut entries = db.entries_in_range(user, day_start, day_end)?;
            entries.truncate(limit);
            entries
        }
        None => db.recent_entries(user, limit)?,
    };

    if json {
        serde_json::to_writer_pretty(&mut *writer, &entries)?;
        writeln!(writer)?;
        return Ok(());
    }

    if entries.is_empty() {
        writeln!(writer, "No entries.")?;
        return Ok(());
    }

    for entry in &entries {
        write_entry_line(writer, db, entry, now)?;
    }
    Ok(())
}

fn write_entry_line<W: Write>(
    writer: &mut W,
    db: &Database,
    entry: &TimeEntry,
    now: DateTime<Utc>,
) -> Result<()> {
    let breaks = db.breaks_for_entry(&entry.id)?;
    let net = entry.net_duration(&breaks, now);
    let end = if entry.is_open() {
        "running".to_string()
    } else {
        format_timestamp(entry.effective_end(now))
    };
    let description = entry.description.as_deref().unwrap_or("-");
    writeln!(
        writer,
        "{}  {} - {}  {}  {}",
        entry.id,
        format_timestamp(entry.start_time),
        end,
        format_minutes(net.num_minutes()),
        description,
    )?;
    Ok(())
}
