//! In-memory [`Ledger`]/[`Collaborators`] fixture for unit tests.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};

use crate::entry::{TimeBreak, TimeEntry};
use crate::ledger::{Collaborators, DEFAULT_DAILY_TARGET_HOURS, Ledger, StoreError};
use crate::snapshot::AnalyticsSnapshot;
use crate::types::{BreakId, EntryId, UserId};

/// A deterministic in-memory ledger. Enforces the same single-open-timer
/// and single-open-break constraints the SQLite schema does.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: BTreeMap<EntryId, TimeEntry>,
    breaks: BTreeMap<BreakId, TimeBreak>,
    snapshots: BTreeMap<(UserId, NaiveDate), AnalyticsSnapshot>,
    pub targets: HashMap<UserId, f64>,
    /// Completion instants per user, queried by range.
    pub completed_tasks: Vec<(UserId, DateTime<Utc>)>,
    pub active: Vec<UserId>,
}

impl Ledger for MemoryLedger {
    fn open_entry(&self, user: &UserId) -> Result<Option<TimeEntry>, StoreError> {
        Ok(self
            .entries
            .values()
            .find(|e| &e.user_id == user && e.is_open())
            .cloned())
    }

    fn entry(&self, id: &EntryId) -> Result<Option<TimeEntry>, StoreError> {
        Ok(self.entries.get(id).cloned())
    }

    fn entries_in_range(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        let mut found: Vec<TimeEntry> = self
            .entries
            .values()
            .filter(|e| &e.user_id == user && e.start_time >= start && e.start_time < end)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    fn recent_entries(&self, user: &UserId, limit: usize) -> Result<Vec<TimeEntry>, StoreError> {
        let mut found: Vec<TimeEntry> = self
            .entries
            .values()
            .filter(|e| &e.user_id == user)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(a.id.cmp(&b.id)));
        found.truncate(limit);
        Ok(found)
    }

    fn breaks_for_entry(&self, entry: &EntryId) -> Result<Vec<TimeBreak>, StoreError> {
        let mut found: Vec<TimeBreak> = self
            .breaks
            .values()
            .filter(|b| &b.entry_id == entry)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(found)
    }

    fn breaks_for_entries(&self, entries: &[EntryId]) -> Result<Vec<TimeBreak>, StoreError> {
        let mut found: Vec<TimeBreak> = self
            .breaks
            .values()
            .filter(|b| entries.contains(&b.entry_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(found)
    }

    fn open_break(&self, entry: &EntryId) -> Result<Option<TimeBreak>, StoreError> {
        Ok(self
            .breaks
            .values()
            .find(|b| &b.entry_id == entry && b.is_open())
            .cloned())
    }

    fn insert_entry(&mut self, entry: &TimeEntry) -> Result<(), StoreError> {
        if entry.is_open() && self.open_entry(&entry.user_id)?.is_some() {
            return Err(StoreError::OpenTimerConflict {
                user: entry.user_id.clone(),
            });
        }
        self.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    fn update_entry(&mut self, entry: &TimeEntry) -> Result<(), StoreError> {
        self.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    fn delete_entry(&mut self, id: &EntryId) -> Result<bool, StoreError> {
        let removed = self.entries.remove(id).is_some();
        if removed {
            self.breaks.retain(|_, b| &b.entry_id != id);
        }
        Ok(removed)
    }

    fn insert_break(&mut self, brk: &TimeBreak) -> Result<(), StoreError> {
        self.breaks.insert(brk.id.clone(), brk.clone());
        Ok(())
    }

    fn update_break(&mut self, brk: &TimeBreak) -> Result<(), StoreError> {
        self.breaks.insert(brk.id.clone(), brk.clone());
        Ok(())
    }

    fn apply_merge(
        &mut self,
        survivor: &TimeEntry,
        absorbed: &EntryId,
        gap_break: Option<&TimeBreak>,
    ) -> Result<(), StoreError> {
        self.entries.insert(survivor.id.clone(), survivor.clone());
        for brk in self.breaks.values_mut() {
            if &brk.entry_id == absorbed {
                brk.entry_id = survivor.id.clone();
            }
        }
        if let Some(brk) = gap_break {
            self.breaks.insert(brk.id.clone(), brk.clone());
        }
        self.entries.remove(absorbed);
        Ok(())
    }

    fn upsert_snapshot(&mut self, snapshot: &AnalyticsSnapshot) -> Result<(), StoreError> {
        self.snapshots.insert(
            (snapshot.user_id.clone(), snapshot.date),
            snapshot.clone(),
        );
        Ok(())
    }

    fn snapshot(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<AnalyticsSnapshot>, StoreError> {
        Ok(self.snapshots.get(&(user.clone(), date)).cloned())
    }

    fn snapshots_in_range(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AnalyticsSnapshot>, StoreError> {
        Ok(self
            .snapshots
            .range((user.clone(), from)..=(user.clone(), to))
            .map(|(_, s)| s.clone())
            .collect())
    }
}

impl Collaborators for MemoryLedger {
    fn daily_target_hours(&self, user: &UserId) -> Result<f64, StoreError> {
        Ok(self
            .targets
            .get(user)
            .copied()
            .unwrap_or(DEFAULT_DAILY_TARGET_HOURS))
    }

    fn tasks_completed_in_range(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let count = self
            .completed_tasks
            .iter()
            .filter(|(u, at)| u == user && *at >= start && *at < end)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn active_users(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.active.clone())
    }
}
