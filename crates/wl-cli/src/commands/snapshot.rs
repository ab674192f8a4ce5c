//! Snapshot commands: generate, batch, show.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;

use wl_core::{AnalyticsSnapshot, Collaborators, Ledger, UserId, generate_daily_snapshot};
use wl_db::Database;

use super::util::format_minutes;

pub fn generate<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &UserId,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    let snapshot = generate_daily_snapshot(db, user, date, now)?;
    writeln!(writer, "Snapshot for {user} on {date} stored")?;
    write_summary(writer, &snapshot)?;
    Ok(())
}

/// Recomputes the day's snapshot for every active user, fanning out over a
/// thread pool. Each worker opens its own connection; the snapshot upsert
/// keyed by `(user_id, date)` makes re-runs safe.
pub fn batch<W: Write>(
    writer: &mut W,
    db_path: &Path,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<()> {
    let users = {
        let db = Database::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        db.active_users()?
    };

    let results: Vec<(UserId, Result<AnalyticsSnapshot>)> = users
        .par_iter()
        .map(|user| {
            let result = Database::open(db_path)
                .map_err(anyhow::Error::from)
                .and_then(|mut db| {
                    generate_daily_snapshot(&mut db, user, date, now).map_err(anyhow::Error::from)
                });
            (user.clone(), result)
        })
        .collect();

    let mut failures = 0usize;
    for (user, result) in &results {
        match result {
            Ok(snapshot) => {
                writeln!(
                    writer,
                    "{user}: {:.1}h worked, focus {}",
                    snapshot.productive_hours,
                    i64::from(snapshot.focus_score)
                )?;
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(user = %user, error = %e, "snapshot generation failed");
                writeln!(writer, "{user}: failed ({e})")?;
            }
        }
    }
    writeln!(
        writer,
        "Generated {} snapshot(s) for {date}, {failures} failure(s)",
        results.len() - failures
    )?;
    anyhow::ensure!(failures == 0, "{failures} snapshot(s) failed");
    Ok(())
}

/// Recomputes snapshots for one user over the trailing `days` window ending
/// at `end` (inclusive). Days run oldest first, in order, because a day's
/// trend factors read the snapshots of the days before it.
pub fn backfill<W: Write>(
    writer: &mut W,
    db_path: &Path,
    user: &UserId,
    end: NaiveDate,
    days: u32,
    now: DateTime<Utc>,
) -> Result<()> {
    anyhow::ensure!(days > 0, "days must be at least 1");
    let dates: Vec<NaiveDate> = (0..days)
        .rev()
        .filter_map(|offset| end.checked_sub_days(chrono::Days::new(u64::from(offset))))
        .collect();

    let mut db = Database::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let mut failures = 0usize;
    for date in &dates {
        match generate_daily_snapshot(&mut db, user, *date, now) {
            Ok(snapshot) => {
                writeln!(
                    writer,
                    "{date}: {:.1}h worked, focus {}",
                    snapshot.productive_hours,
                    i64::from(snapshot.focus_score)
                )?;
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(user = %user, %date, error = %e, "snapshot generation failed");
                writeln!(writer, "{date}: failed ({e})")?;
            }
        }
    }
    writeln!(
        writer,
        "Backfilled {} snapshot(s) for {user}, {failures} failure(s)",
        dates.len() - failures
    )?;
    anyhow::ensure!(failures == 0, "{failures} snapshot(s) failed");
    Ok(())
}

pub fn show<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &UserId,
    date: NaiveDate,
    json: bool,
) -> Result<()> {
    let Some(snapshot) = db.snapshot(user, date)? else {
        writeln!(writer, "No snapshot for {user} on {date}.")?;
        return Ok(());
    };

    if json {
        serde_json::to_writer_pretty(&mut *writer, &snapshot)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "Snapshot for {user} on {date}")?;
    write_summary(writer, &snapshot)?;
    Ok(())
}

fn write_summary<W: Write>(writer: &mut W, snapshot: &AnalyticsSnapshot) -> Result<()> {
    writeln!(
        writer,
        "Hours: {:.2} total, {:.2} productive ({:.2} overtime)",
        snapshot.total_hours, snapshot.productive_hours, snapshot.overtime_hours
    )?;
    writeln!(
        writer,
        "Scores: focus {}, efficiency {}, balance {}",
        i64::from(snapshot.focus_score),
        i64::from(snapshot.efficiency_score),
        i64::from(snapshot.balance_score)
    )?;
    writeln!(
        writer,
        "Tasks completed: {}, breaks: {}",
        snapshot.tasks_completed, snapshot.breaks_taken
    )?;
    if let (Some(start), Some(end)) = (snapshot.peak_hour_start, snapshot.peak_hour_end) {
        writeln!(writer, "Peak hours: {start:02}:00 - {end:02}:00")?;
    }
    writeln!(
        writer,
        "Sessions: longest {}, average {}",
        format_minutes(snapshot.longest_session_minutes),
        format_minutes(snapshot.average_session_minutes.round() as i64)
    )?;
    if snapshot.burnout_risk {
        writeln!(
            writer,
            "Burnout risk flagged ({} consecutive work days)",
            snapshot.consecutive_days
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use wl_core::timer::{self, EntryOptions};

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn user() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn seed_entry(db: &mut Database, start: &str, end: &str) {
        timer::create_manual_entry(
            db,
            &user(),
            ts(start),
            ts(end),
            EntryOptions::default(),
            ts(end),
        )
        .unwrap();
    }

    #[test]
    fn generate_then_show_round_trips() {
        let mut db = Database::open_in_memory().unwrap();
        seed_entry(&mut db, "2025-03-03T09:00:00Z", "2025-03-03T12:00:00Z");

        let date: NaiveDate = "2025-03-03".parse().unwrap();
        generate(&mut Vec::new(), &mut db, &user(), date, ts("2025-03-04T00:00:00Z")).unwrap();

        let mut output = Vec::new();
        show(&mut output, &db, &user(), date, false).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Hours: 3.00 total, 3.00 productive"));
    }

    #[test]
    fn show_missing_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        show(&mut output, &db, &user(), "2025-03-03".parse().unwrap(), false).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_eq!(output, "No snapshot for alice on 2025-03-03.\n");
    }

    #[test]
    fn show_json_contains_scores() {
        let mut db = Database::open_in_memory().unwrap();
        seed_entry(&mut db, "2025-03-03T09:00:00Z", "2025-03-03T10:30:00Z");
        let date: NaiveDate = "2025-03-03".parse().unwrap();
        generate(&mut Vec::new(), &mut db, &user(), date, ts("2025-03-04T00:00:00Z")).unwrap();

        let mut output = Vec::new();
        show(&mut output, &db, &user(), date, true).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed["user_id"], "alice");
        assert!(parsed["focus_score"].is_number());
    }

    #[test]
    fn batch_covers_all_active_users() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("wl.db");
        {
            let mut db = Database::open(&db_path).unwrap();
            let now = ts("2025-03-03T08:00:00Z");
            for id in ["alice", "bob", "carol"] {
                db.register_user(&UserId::new(id).unwrap(), None, now).unwrap();
            }
            db.set_user_active(&UserId::new("carol").unwrap(), false).unwrap();

            timer::create_manual_entry(
                &mut db,
                &UserId::new("alice").unwrap(),
                ts("2025-03-03T09:00:00Z"),
                ts("2025-03-03T12:00:00Z"),
                EntryOptions::default(),
                ts("2025-03-03T12:00:00Z"),
            )
            .unwrap();
        }

        let date: NaiveDate = "2025-03-03".parse().unwrap();
        let mut output = Vec::new();
        batch(&mut output, &db_path, date, ts("2025-03-04T00:00:00Z")).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Generated 2 snapshot(s)"));

        let db = Database::open(&db_path).unwrap();
        assert!(db.snapshot(&UserId::new("alice").unwrap(), date).unwrap().is_some());
        assert!(db.snapshot(&UserId::new("bob").unwrap(), date).unwrap().is_some());
        assert!(db.snapshot(&UserId::new("carol").unwrap(), date).unwrap().is_none());
    }

    #[test]
    fn backfill_covers_trailing_window() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("wl.db");
        {
            let mut db = Database::open(&db_path).unwrap();
            for day in ["2025-03-01", "2025-03-02", "2025-03-03"] {
                timer::create_manual_entry(
                    &mut db,
                    &user(),
                    ts(&format!("{day}T09:00:00Z")),
                    ts(&format!("{day}T12:00:00Z")),
                    EntryOptions::default(),
                    ts(&format!("{day}T12:00:00Z")),
                )
                .unwrap();
            }
        }

        let end: NaiveDate = "2025-03-03".parse().unwrap();
        let mut output = Vec::new();
        backfill(&mut output, &db_path, &user(), end, 3, ts("2025-03-04T00:00:00Z")).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Backfilled 3 snapshot(s) for alice"));

        let db = Database::open(&db_path).unwrap();
        for day in ["2025-03-01", "2025-03-02", "2025-03-03"] {
            let date: NaiveDate = day.parse().unwrap();
            let snapshot = db.snapshot(&user(), date).unwrap().unwrap();
            assert!((snapshot.total_hours - 3.0).abs() < 1e-9, "{day}");
        }
    }

    #[test]
    fn regenerating_is_idempotent() {
        let mut db = Database::open_in_memory().unwrap();
        seed_entry(&mut db, "2025-03-03T09:00:00Z", "2025-03-03T12:00:00Z");
        let date: NaiveDate = "2025-03-03".parse().unwrap();

        generate(&mut Vec::new(), &mut db, &user(), date, ts("2025-03-04T00:00:00Z")).unwrap();
        let first = db.snapshot(&user(), date).unwrap().unwrap();
        generate(&mut Vec::new(), &mut db, &user(), date, ts("2025-03-10T00:00:00Z")).unwrap();
        let second = db.snapshot(&user(), date).unwrap().unwrap();
        assert_eq!(first, second);
    }
}
