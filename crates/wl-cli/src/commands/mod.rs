//! CLI subcommand implementations.

pub mod burnout;
pub mod entry;
pub mod insights;
pub mod snapshot;
pub mod timer;
pub mod users;
pub mod util;
