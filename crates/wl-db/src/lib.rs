//! Storage layer for the worklog ledger.
//!
//! Provides persistence for time entries, breaks, and analytics snapshots
//! using `rusqlite`, and implements the `wl-core` [`Ledger`] and
//! [`Collaborators`] traits on top of it.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization. Batch callers
//! open one `Database` per worker instead.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g.,
//! `2024-01-15T10:30:00.000Z`), so lexicographic ordering matches
//! chronological ordering and values stay human-readable. Snapshot dates are
//! `YYYY-MM-DD` TEXT. Task-id sets are stored as sorted JSON arrays.
//!
//! Two partial unique indexes enforce the ledger invariants at the store
//! level: at most one open entry per user, and at most one open break per
//! entry. A racing insert that violates the former surfaces as
//! [`StoreError::OpenTimerConflict`].

use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, Row, params, params_from_iter};
use thiserror::Error;

use wl_core::{
    AnalyticsSnapshot, BreakReason, Collaborators, DEFAULT_DAILY_TARGET_HOURS, EntryId, Ledger,
    Score, StoreError, TimeBreak, TimeEntry, UserId,
};

/// How long a statement may wait on a locked database before failing with a
/// retryable error.
const BUSY_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A registered user, as the account surface sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: UserId,
    pub daily_target_hours: f64,
    pub active: bool,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                daily_target_hours REAL NOT NULL DEFAULT 8.0,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Entries: one row per tracked session, end_time NULL = running
            CREATE TABLE IF NOT EXISTS time_entries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                description TEXT,
                is_manual INTEGER NOT NULL DEFAULT 0,
                subtask_id TEXT,
                task_ids TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entries_user_start
                ON time_entries(user_id, start_time);

            -- Invariant: at most one open entry per user
            CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_open_user
                ON time_entries(user_id) WHERE end_time IS NULL;

            CREATE TABLE IF NOT EXISTS time_breaks (
                id TEXT PRIMARY KEY,
                entry_id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                reason TEXT,
                FOREIGN KEY (entry_id) REFERENCES time_entries(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_breaks_entry ON time_breaks(entry_id);

            -- Invariant: at most one open break per entry
            CREATE UNIQUE INDEX IF NOT EXISTS idx_breaks_open_entry
                ON time_breaks(entry_id) WHERE end_time IS NULL;

            CREATE TABLE IF NOT EXISTS analytics_snapshots (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                total_hours REAL NOT NULL,
                productive_hours REAL NOT NULL,
                tasks_completed INTEGER NOT NULL,
                breaks_taken INTEGER NOT NULL,
                focus_score INTEGER NOT NULL,
                efficiency_score INTEGER NOT NULL,
                balance_score INTEGER NOT NULL,
                peak_hour_start INTEGER,
                peak_hour_end INTEGER,
                longest_session_minutes INTEGER NOT NULL,
                average_session_minutes REAL NOT NULL,
                burnout_risk INTEGER NOT NULL,
                overtime_hours REAL NOT NULL,
                late_work_hours REAL NOT NULL,
                weekend_work_hours REAL NOT NULL,
                consecutive_days INTEGER NOT NULL,
                PRIMARY KEY (user_id, date)
            );

            -- Completions mirrored from the task surface for the
            -- tasks-completed-in-range query
            CREATE TABLE IF NOT EXISTS task_completions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_completions_user_time
                ON task_completions(user_id, completed_at);
            ",
        )?;
        Ok(())
    }

    /// Registers a user, or updates the daily target of an existing one.
    pub fn register_user(
        &mut self,
        user: &UserId,
        daily_target_hours: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO users (id, daily_target_hours, active, created_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(id) DO UPDATE SET
                daily_target_hours = excluded.daily_target_hours,
                active = 1
            ",
            params![
                user,
                daily_target_hours.unwrap_or(DEFAULT_DAILY_TARGET_HOURS),
                format_timestamp(now),
            ],
        )?;
        Ok(())
    }

    /// Marks a user active or inactive for batch snapshot scope.
    pub fn set_user_active(&mut self, user: &UserId, active: bool) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE users SET active = ? WHERE id = ?",
            params![i32::from(active), user],
        )?;
        Ok(updated > 0)
    }

    /// Lists all registered users ordered by ID.
    pub fn list_users(&self) -> Result<Vec<UserRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, daily_target_hours, active FROM users ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                daily_target_hours: row.get(1)?,
                active: row.get::<_, i64>(2)? != 0,
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Records a task completion reported by the task surface.
    pub fn record_task_completion(
        &mut self,
        id: &str,
        user: &UserId,
        completed_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO task_completions (id, user_id, completed_at) VALUES (?, ?, ?)",
            params![id, user, format_timestamp(completed_at)],
        )?;
        Ok(())
    }
}

// ========== Row mapping ==========

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<TimeEntry> {
    let task_ids_json: String = row.get(7)?;
    let task_ids: Vec<String> = serde_json::from_str(&task_ids_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
    Ok(TimeEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        start_time: parse_timestamp_col(row, 2)?,
        end_time: parse_optional_timestamp_col(row, 3)?,
        description: row.get(4)?,
        is_manual: row.get::<_, i64>(5)? != 0,
        subtask_id: row.get(6)?,
        task_ids,
        created_at: parse_timestamp_col(row, 8)?,
        updated_at: parse_timestamp_col(row, 9)?,
    })
}

const ENTRY_COLUMNS: &str = "id, user_id, start_time, end_time, description, is_manual, \
                             subtask_id, task_ids, created_at, updated_at";

fn break_from_row(row: &Row<'_>) -> rusqlite::Result<TimeBreak> {
    let reason: Option<String> = row.get(4)?;
    let reason = reason
        .map(|s| {
            s.parse::<BreakReason>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
            })
        })
        .transpose()?;
    Ok(TimeBreak {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        start_time: parse_timestamp_col(row, 2)?,
        end_time: parse_optional_timestamp_col(row, 3)?,
        reason,
    })
}

const BREAK_COLUMNS: &str = "id, entry_id, start_time, end_time, reason";

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<AnalyticsSnapshot> {
    let date: String = row.get(1)?;
    let date = date
        .parse::<NaiveDate>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(AnalyticsSnapshot {
        user_id: row.get(0)?,
        date,
        total_hours: row.get(2)?,
        productive_hours: row.get(3)?,
        tasks_completed: row.get(4)?,
        breaks_taken: row.get(5)?,
        focus_score: Score::clamped(row.get(6)?),
        efficiency_score: Score::clamped(row.get(7)?),
        balance_score: Score::clamped(row.get(8)?),
        peak_hour_start: row.get(9)?,
        peak_hour_end: row.get(10)?,
        longest_session_minutes: row.get(11)?,
        average_session_minutes: row.get(12)?,
        burnout_risk: row.get::<_, i64>(13)? != 0,
        overtime_hours: row.get(14)?,
        late_work_hours: row.get(15)?,
        weekend_work_hours: row.get(16)?,
        consecutive_days: row.get(17)?,
    })
}

const SNAPSHOT_COLUMNS: &str = "user_id, date, total_hours, productive_hours, tasks_completed, \
                                breaks_taken, focus_score, efficiency_score, balance_score, \
                                peak_hour_start, peak_hour_end, longest_session_minutes, \
                                average_session_minutes, burnout_risk, overtime_hours, \
                                late_work_hours, weekend_work_hours, consecutive_days";

fn parse_timestamp_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_timestamp_col(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_optional_timestamp(timestamp: Option<DateTime<Utc>>) -> Option<String> {
    timestamp.map(format_timestamp)
}

fn task_ids_json(task_ids: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(task_ids).map_err(|e| StoreError::Backend(e.to_string()))
}

/// Maps a rusqlite error to the core taxonomy: busy/locked is retryable,
/// everything else is a plain backend failure.
fn map_store(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &e {
        if matches!(
            failure.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ) {
            return StoreError::Unavailable(e.to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
    )
}

// ========== Ledger implementation ==========

impl Ledger for Database {
    fn open_entry(&self, user: &UserId) -> Result<Option<TimeEntry>, StoreError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries WHERE user_id = ? AND end_time IS NULL"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(map_store)?;
        stmt.query_row(params![user], entry_from_row)
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(map_store(other)),
            })
    }

    fn entry(&self, id: &EntryId) -> Result<Option<TimeEntry>, StoreError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM time_entries WHERE id = ?");
        let mut stmt = self.conn.prepare(&sql).map_err(map_store)?;
        stmt.query_row(params![id], entry_from_row)
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(map_store(other)),
            })
    }

    fn entries_in_range(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let sql = format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM time_entries
            WHERE user_id = ? AND start_time >= ? AND start_time < ?
            ORDER BY start_time ASC, id ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql).map_err(map_store)?;
        let rows = stmt
            .query_map(
                params![user, format_timestamp(start), format_timestamp(end)],
                entry_from_row,
            )
            .map_err(map_store)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(map_store)?);
        }
        Ok(entries)
    }

    fn recent_entries(&self, user: &UserId, limit: usize) -> Result<Vec<TimeEntry>, StoreError> {
        let sql = format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM time_entries
            WHERE user_id = ?
            ORDER BY start_time DESC, id ASC
            LIMIT ?
            "
        );
        let mut stmt = self.conn.prepare(&sql).map_err(map_store)?;
        let rows = stmt
            .query_map(
                params![user, i64::try_from(limit).unwrap_or(i64::MAX)],
                entry_from_row,
            )
            .map_err(map_store)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(map_store)?);
        }
        Ok(entries)
    }

    fn breaks_for_entry(&self, entry: &EntryId) -> Result<Vec<TimeBreak>, StoreError> {
        let sql = format!(
            "
            SELECT {BREAK_COLUMNS}
            FROM time_breaks
            WHERE entry_id = ?
            ORDER BY start_time ASC, id ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql).map_err(map_store)?;
        let rows = stmt
            .query_map(params![entry], break_from_row)
            .map_err(map_store)?;
        let mut breaks = Vec::new();
        for row in rows {
            breaks.push(row.map_err(map_store)?);
        }
        Ok(breaks)
    }

    fn breaks_for_entries(&self, entries: &[EntryId]) -> Result<Vec<TimeBreak>, StoreError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; entries.len()].join(", ");
        let sql = format!(
            "
            SELECT {BREAK_COLUMNS}
            FROM time_breaks
            WHERE entry_id IN ({placeholders})
            ORDER BY start_time ASC, id ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql).map_err(map_store)?;
        let rows = stmt
            .query_map(
                params_from_iter(entries.iter().map(EntryId::as_str)),
                break_from_row,
            )
            .map_err(map_store)?;
        let mut breaks = Vec::new();
        for row in rows {
            breaks.push(row.map_err(map_store)?);
        }
        Ok(breaks)
    }

    fn open_break(&self, entry: &EntryId) -> Result<Option<TimeBreak>, StoreError> {
        let sql = format!(
            "SELECT {BREAK_COLUMNS} FROM time_breaks WHERE entry_id = ? AND end_time IS NULL"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(map_store)?;
        stmt.query_row(params![entry], break_from_row)
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(map_store(other)),
            })
    }

    fn insert_entry(&mut self, entry: &TimeEntry) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "
            INSERT INTO time_entries
            (id, user_id, start_time, end_time, description, is_manual, subtask_id, task_ids,
             created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                entry.id,
                entry.user_id,
                format_timestamp(entry.start_time),
                format_optional_timestamp(entry.end_time),
                entry.description,
                i32::from(entry.is_manual),
                entry.subtask_id,
                task_ids_json(&entry.task_ids)?,
                format_timestamp(entry.created_at),
                format_timestamp(entry.updated_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            // The partial unique index rejected a second open entry.
            Err(e) if entry.is_open() && is_constraint_violation(&e) => {
                Err(StoreError::OpenTimerConflict {
                    user: entry.user_id.clone(),
                })
            }
            Err(e) => Err(map_store(e)),
        }
    }

    fn update_entry(&mut self, entry: &TimeEntry) -> Result<(), StoreError> {
        self.conn
            .execute(
                "
                UPDATE time_entries
                SET start_time = ?, end_time = ?, description = ?, is_manual = ?,
                    subtask_id = ?, task_ids = ?, updated_at = ?
                WHERE id = ?
                ",
                params![
                    format_timestamp(entry.start_time),
                    format_optional_timestamp(entry.end_time),
                    entry.description,
                    i32::from(entry.is_manual),
                    entry.subtask_id,
                    task_ids_json(&entry.task_ids)?,
                    format_timestamp(entry.updated_at),
                    entry.id,
                ],
            )
            .map_err(map_store)?;
        Ok(())
    }

    fn delete_entry(&mut self, id: &EntryId) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM time_entries WHERE id = ?", params![id])
            .map_err(map_store)?;
        Ok(deleted > 0)
    }

    fn insert_break(&mut self, brk: &TimeBreak) -> Result<(), StoreError> {
        self.conn
            .execute(
                "
                INSERT INTO time_breaks (id, entry_id, start_time, end_time, reason)
                VALUES (?, ?, ?, ?, ?)
                ",
                params![
                    brk.id,
                    brk.entry_id,
                    format_timestamp(brk.start_time),
                    format_optional_timestamp(brk.end_time),
                    brk.reason.map(|r| r.as_str()),
                ],
            )
            .map_err(map_store)?;
        Ok(())
    }

    fn update_break(&mut self, brk: &TimeBreak) -> Result<(), StoreError> {
        self.conn
            .execute(
                "
                UPDATE time_breaks
                SET entry_id = ?, start_time = ?, end_time = ?, reason = ?
                WHERE id = ?
                ",
                params![
                    brk.entry_id,
                    format_timestamp(brk.start_time),
                    format_optional_timestamp(brk.end_time),
                    brk.reason.map(|r| r.as_str()),
                    brk.id,
                ],
            )
            .map_err(map_store)?;
        Ok(())
    }

    fn apply_merge(
        &mut self,
        survivor: &TimeEntry,
        absorbed: &EntryId,
        gap_break: Option<&TimeBreak>,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction().map_err(map_store)?;
        tx.execute(
            "
            UPDATE time_entries
            SET start_time = ?, end_time = ?, updated_at = ?
            WHERE id = ?
            ",
            params![
                format_timestamp(survivor.start_time),
                format_optional_timestamp(survivor.end_time),
                format_timestamp(survivor.updated_at),
                survivor.id,
            ],
        )
        .map_err(map_store)?;
        tx.execute(
            "UPDATE time_breaks SET entry_id = ? WHERE entry_id = ?",
            params![survivor.id, absorbed],
        )
        .map_err(map_store)?;
        if let Some(brk) = gap_break {
            tx.execute(
                "
                INSERT INTO time_breaks (id, entry_id, start_time, end_time, reason)
                VALUES (?, ?, ?, ?, ?)
                ",
                params![
                    brk.id,
                    brk.entry_id,
                    format_timestamp(brk.start_time),
                    format_optional_timestamp(brk.end_time),
                    brk.reason.map(|r| r.as_str()),
                ],
            )
            .map_err(map_store)?;
        }
        tx.execute("DELETE FROM time_entries WHERE id = ?", params![absorbed])
            .map_err(map_store)?;
        tx.commit().map_err(map_store)?;
        Ok(())
    }

    fn upsert_snapshot(&mut self, snapshot: &AnalyticsSnapshot) -> Result<(), StoreError> {
        self.conn
            .execute(
                "
                INSERT INTO analytics_snapshots
                (user_id, date, total_hours, productive_hours, tasks_completed, breaks_taken,
                 focus_score, efficiency_score, balance_score, peak_hour_start, peak_hour_end,
                 longest_session_minutes, average_session_minutes, burnout_risk, overtime_hours,
                 late_work_hours, weekend_work_hours, consecutive_days)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(user_id, date) DO UPDATE SET
                    total_hours = excluded.total_hours,
                    productive_hours = excluded.productive_hours,
                    tasks_completed = excluded.tasks_completed,
                    breaks_taken = excluded.breaks_taken,
                    focus_score = excluded.focus_score,
                    efficiency_score = excluded.efficiency_score,
                    balance_score = excluded.balance_score,
                    peak_hour_start = excluded.peak_hour_start,
                    peak_hour_end = excluded.peak_hour_end,
                    longest_session_minutes = excluded.longest_session_minutes,
                    average_session_minutes = excluded.average_session_minutes,
                    burnout_risk = excluded.burnout_risk,
                    overtime_hours = excluded.overtime_hours,
                    late_work_hours = excluded.late_work_hours,
                    weekend_work_hours = excluded.weekend_work_hours,
                    consecutive_days = excluded.consecutive_days
                ",
                params![
                    snapshot.user_id,
                    snapshot.date.to_string(),
                    snapshot.total_hours,
                    snapshot.productive_hours,
                    snapshot.tasks_completed,
                    snapshot.breaks_taken,
                    i64::from(snapshot.focus_score),
                    i64::from(snapshot.efficiency_score),
                    i64::from(snapshot.balance_score),
                    snapshot.peak_hour_start,
                    snapshot.peak_hour_end,
                    snapshot.longest_session_minutes,
                    snapshot.average_session_minutes,
                    i32::from(snapshot.burnout_risk),
                    snapshot.overtime_hours,
                    snapshot.late_work_hours,
                    snapshot.weekend_work_hours,
                    snapshot.consecutive_days,
                ],
            )
            .map_err(map_store)?;
        Ok(())
    }

    fn snapshot(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<AnalyticsSnapshot>, StoreError> {
        let sql =
            format!("SELECT {SNAPSHOT_COLUMNS} FROM analytics_snapshots WHERE user_id = ? AND date = ?");
        let mut stmt = self.conn.prepare(&sql).map_err(map_store)?;
        stmt.query_row(params![user, date.to_string()], snapshot_from_row)
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(map_store(other)),
            })
    }

    fn snapshots_in_range(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AnalyticsSnapshot>, StoreError> {
        let sql = format!(
            "
            SELECT {SNAPSHOT_COLUMNS}
            FROM analytics_snapshots
            WHERE user_id = ? AND date >= ? AND date <= ?
            ORDER BY date ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql).map_err(map_store)?;
        let rows = stmt
            .query_map(
                params![user, from.to_string(), to.to_string()],
                snapshot_from_row,
            )
            .map_err(map_store)?;
        let mut snapshots = Vec::new();
        for row in rows {
            snapshots.push(row.map_err(map_store)?);
        }
        Ok(snapshots)
    }
}

// ========== Collaborators implementation ==========

impl Collaborators for Database {
    fn daily_target_hours(&self, user: &UserId) -> Result<f64, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT daily_target_hours FROM users WHERE id = ?")
            .map_err(map_store)?;
        stmt.query_row(params![user], |row| row.get(0))
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(DEFAULT_DAILY_TARGET_HOURS),
                other => Err(map_store(other)),
            })
    }

    fn tasks_completed_in_range(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT COUNT(*) FROM task_completions
                WHERE user_id = ? AND completed_at >= ? AND completed_at < ?
                ",
            )
            .map_err(map_store)?;
        stmt.query_row(
            params![user, format_timestamp(start), format_timestamp(end)],
            |row| row.get(0),
        )
        .map_err(map_store)
    }

    fn active_users(&self) -> Result<Vec<UserId>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM users WHERE active = 1 ORDER BY id ASC")
            .map_err(map_store)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, UserId>(0))
            .map_err(map_store)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row.map_err(map_store)?);
        }
        Ok(users)
    }
}
