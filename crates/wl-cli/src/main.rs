use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wl_cli::commands::{burnout, entry, insights, snapshot, timer, users};
use wl_cli::{Cli, Commands, Config, SnapshotAction, UsersAction};
use wl_core::timer::{EntryOptions, EntryPatch};
use wl_core::{EntryId, UserId};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(wl_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = wl_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

/// Resolves the acting user from `--user` or the configured default.
fn resolve_user(cli_user: Option<&str>, config: &Config) -> Result<UserId> {
    let id = cli_user
        .or(config.default_user.as_deref())
        .context("no user given; pass --user or set default_user in the config")?;
    UserId::new(id).context("invalid user ID")
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let now = Utc::now();
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Some(Commands::Start {
            description,
            tasks,
            subtask,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            let options = EntryOptions {
                description,
                task_ids: tasks,
                subtask_id: subtask,
            };
            timer::start(&mut stdout, &mut db, &user, options, now)?;
        }
        Some(Commands::Pause) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            timer::pause(&mut stdout, &mut db, &user, now)?;
        }
        Some(Commands::Resume) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            timer::resume(&mut stdout, &mut db, &user, now)?;
        }
        Some(Commands::Stop) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            timer::stop(&mut stdout, &mut db, &user, now)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            timer::status(&mut stdout, &db, &user, now)?;
        }
        Some(Commands::Add {
            start,
            end,
            description,
            tasks,
            subtask,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            let options = EntryOptions {
                description,
                task_ids: tasks,
                subtask_id: subtask,
            };
            entry::add(&mut stdout, &mut db, &user, start, end, options, now)?;
        }
        Some(Commands::Edit {
            id,
            start,
            end,
            description,
            tasks,
            subtask,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let id = EntryId::new(&id).context("invalid entry ID")?;
            let patch = EntryPatch {
                description,
                // An empty --task list means "leave the task set alone"
                task_ids: if tasks.is_empty() { None } else { Some(tasks) },
                subtask_id: subtask,
                start_time: start,
                end_time: end,
            };
            entry::edit(&mut stdout, &mut db, &id, patch, now)?;
        }
        Some(Commands::Delete { id }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let id = EntryId::new(&id).context("invalid entry ID")?;
            entry::delete(&mut stdout, &mut db, &id)?;
        }
        Some(Commands::Entries { date, limit, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            entry::list(&mut stdout, &db, &user, date, limit, json, now)?;
        }
        Some(Commands::Snapshot { action }) => match action {
            SnapshotAction::Generate { date } => {
                let (mut db, config) = open_database(cli.config.as_deref())?;
                let user = resolve_user(cli.user.as_deref(), &config)?;
                let date = date.unwrap_or_else(|| now.date_naive());
                snapshot::generate(&mut stdout, &mut db, &user, date, now)?;
            }
            SnapshotAction::Batch { date } => {
                let config = Config::load_from(cli.config.as_deref())
                    .context("failed to load configuration")?;
                let date = date.unwrap_or_else(|| now.date_naive());
                snapshot::batch(&mut stdout, &config.database_path, date, now)?;
            }
            SnapshotAction::Backfill { days, date } => {
                let config = Config::load_from(cli.config.as_deref())
                    .context("failed to load configuration")?;
                let user = resolve_user(cli.user.as_deref(), &config)?;
                let end = date.unwrap_or_else(|| now.date_naive());
                snapshot::backfill(&mut stdout, &config.database_path, &user, end, days, now)?;
            }
            SnapshotAction::Show { date, json } => {
                let (db, config) = open_database(cli.config.as_deref())?;
                let user = resolve_user(cli.user.as_deref(), &config)?;
                let date = date.unwrap_or_else(|| now.date_naive());
                snapshot::show(&mut stdout, &db, &user, date, json)?;
            }
        },
        Some(Commands::Insights { days, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            insights::run(&mut stdout, &db, &user, days, json, now)?;
        }
        Some(Commands::Burnout { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            burnout::run(&mut stdout, &db, &user, json, now)?;
        }
        Some(Commands::Users { action }) => match action {
            UsersAction::Register { id, daily_target } => {
                let (mut db, _config) = open_database(cli.config.as_deref())?;
                let user = UserId::new(&id).context("invalid user ID")?;
                users::register(&mut stdout, &mut db, &user, daily_target, now)?;
            }
            UsersAction::Deactivate { id } => {
                let (mut db, _config) = open_database(cli.config.as_deref())?;
                let user = UserId::new(&id).context("invalid user ID")?;
                users::deactivate(&mut stdout, &mut db, &user)?;
            }
            UsersAction::List => {
                let (db, _config) = open_database(cli.config.as_deref())?;
                users::list(&mut stdout, &db)?;
            }
        },
        Some(Commands::TaskDone { task_id }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            users::task_done(&mut stdout, &mut db, &user, &task_id, now)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    stdout.flush()?;
    Ok(())
}
