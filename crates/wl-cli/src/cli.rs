//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

/// Work-session ledger.
///
/// Tracks work sessions with a start/pause/resume/stop timer, merges
/// fragments of the same task back into one session, and derives daily
/// productivity and burnout analytics from the ledger.
#[derive(Debug, Parser)]
#[command(name = "wl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// User the command acts on (overrides the configured default).
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a timer.
    Start {
        /// What the session is about.
        #[arg(short, long)]
        description: Option<String>,

        /// Task worked on; repeatable.
        #[arg(short, long = "task")]
        tasks: Vec<String>,

        /// Subtask worked on.
        #[arg(short, long)]
        subtask: Option<String>,
    },

    /// Pause the running timer.
    Pause,

    /// Resume a paused timer.
    Resume,

    /// Stop the running timer.
    Stop,

    /// Show the current timer state.
    Status,

    /// Back-fill a completed entry.
    Add {
        /// Start of the session (RFC 3339, e.g. 2025-03-03T09:00:00Z).
        #[arg(long)]
        start: DateTime<Utc>,

        /// End of the session (RFC 3339).
        #[arg(long)]
        end: DateTime<Utc>,

        /// What the session was about.
        #[arg(short, long)]
        description: Option<String>,

        /// Task worked on; repeatable.
        #[arg(short, long = "task")]
        tasks: Vec<String>,

        /// Subtask worked on.
        #[arg(short, long)]
        subtask: Option<String>,
    },

    /// Edit an existing entry.
    Edit {
        /// ID of the entry to edit.
        id: String,

        #[arg(long)]
        start: Option<DateTime<Utc>>,

        #[arg(long)]
        end: Option<DateTime<Utc>>,

        #[arg(short, long)]
        description: Option<String>,

        /// Replaces the full task set when given.
        #[arg(short, long = "task")]
        tasks: Vec<String>,

        #[arg(short, long)]
        subtask: Option<String>,
    },

    /// Delete an entry and its breaks.
    Delete {
        /// ID of the entry to delete.
        id: String,
    },

    /// List recent entries.
    Entries {
        /// Only entries on this date (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Maximum number of entries to show.
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Daily analytics snapshots.
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Productivity insights: peak hours and working habits.
    Insights {
        /// Trailing window in days.
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Burnout risk assessment.
    Burnout {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage registered users.
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Record a completed task for efficiency scoring.
    TaskDone {
        /// ID of the completed task.
        task_id: String,
    },
}

/// Snapshot subcommands.
#[derive(Debug, Subcommand)]
pub enum SnapshotAction {
    /// Recompute and store the snapshot for one user and day.
    Generate {
        /// Day to snapshot (UTC); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Recompute snapshots for all active users in parallel.
    Batch {
        /// Day to snapshot (UTC); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Recompute snapshots for one user over a trailing range of days.
    Backfill {
        /// Number of days to recompute: exactly this many dates, ending at
        /// --date inclusive (so `--days 1` regenerates --date alone).
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Last day of the range (UTC); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show a stored snapshot.
    Show {
        /// Day to show (UTC); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// User-management subcommands.
#[derive(Debug, Subcommand)]
pub enum UsersAction {
    /// Register a user, or update an existing one's daily target.
    Register {
        /// User ID to register.
        id: String,

        /// Daily target hours for overtime detection.
        #[arg(long)]
        daily_target: Option<f64>,
    },

    /// Exclude a user from batch snapshot runs.
    Deactivate {
        /// User ID to deactivate.
        id: String,
    },

    /// List registered users.
    List,
}
