//! Work-session ledger CLI library.
//!
//! This crate provides the CLI interface for the worklog ledger.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, SnapshotAction, UsersAction};
pub use config::Config;
