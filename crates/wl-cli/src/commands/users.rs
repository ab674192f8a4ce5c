//! User management commands.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use wl_core::UserId;
use wl_db::Database;

pub fn register<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &UserId,
    daily_target: Option<f64>,
    now: DateTime<Utc>,
) -> Result<()> {
    anyhow::ensure!(
        daily_target.is_none_or(|t| t > 0.0 && t <= 24.0),
        "daily target must be between 0 and 24 hours"
    );
    db.register_user(user, daily_target, now)?;
    writeln!(writer, "User {user} registered")?;
    Ok(())
}

pub fn deactivate<W: Write>(writer: &mut W, db: &mut Database, user: &UserId) -> Result<()> {
    anyhow::ensure!(db.set_user_active(user, false)?, "unknown user: {user}");
    writeln!(writer, "User {user} deactivated")?;
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let users = db.list_users()?;
    if users.is_empty() {
        writeln!(writer, "No registered users.")?;
        return Ok(());
    }
    for user in users {
        let state = if user.active { "active" } else { "inactive" };
        writeln!(
            writer,
            "{}  target {:.1}h/day  {state}",
            user.id, user.daily_target_hours
        )?;
    }
    Ok(())
}

pub fn task_done<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &UserId,
    task_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    anyhow::ensure!(!task_id.trim().is_empty(), "task ID must not be empty");
    db.record_task_completion(task_id, user, now)?;
    writeln!(writer, "Task {task_id} recorded as completed")?;
    Ok(())
}
