//! Core domain logic for the worklog ledger.
//!
//! This crate contains the fundamental types and logic for:
//! - Timer state machine: start/pause/resume/stop, manual back-fill
//! - Reconciliation: merging fragmented same-day sessions
//! - Productivity: peak hours, focus/efficiency scores, work patterns
//! - Burnout: weighted risk factors and recommendations
//! - Snapshots: idempotent per-user per-day aggregates

pub mod burnout;
pub mod entry;
pub mod ledger;
pub mod productivity;
pub mod reconcile;
pub mod snapshot;
pub mod timer;
mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use entry::{SessionContext, TimeBreak, TimeEntry};
pub use ledger::{Collaborators, DEFAULT_DAILY_TARGET_HOURS, Ledger, StoreError};
pub use snapshot::{AnalyticsSnapshot, generate_daily_snapshot};
pub use timer::{EntryOptions, EntryPatch, TimerError};
pub use types::{BreakId, BreakReason, Confidence, EntryId, Score, UserId, ValidationError};
