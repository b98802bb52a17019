//! Per-channel guide table.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use pvr_api::EpgEntry;

/// Lifecycle of one guide table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideState {
    /// Nothing loaded yet.
    Uninitialized,
    /// Loading stored entries.
    Loading,
    /// A grab against the backend or scraper is in flight.
    Grabbing,
    /// Entries reflect the last completed load or grab.
    Ready,
}

/// The guide entries of one channel, sorted by start time.
///
/// Readers always see the last consistent snapshot: the engine prepares a
/// full replacement set outside the lock and swaps it in. The lock is
/// never held across a store or backend call.
#[derive(Debug)]
pub struct GuideTable {
    channel_id: i64,
    state: RwLock<GuideState>,
    entries: RwLock<Vec<EpgEntry>>,
}

impl GuideTable {
    pub fn new(channel_id: i64) -> Self {
        Self {
            channel_id,
            state: RwLock::new(GuideState::Uninitialized),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn channel_id(&self) -> i64 {
        self.channel_id
    }

    pub fn state(&self) -> GuideState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_state(&self, state: GuideState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Swap in a new entry set. Input is sorted before the swap.
    pub fn replace_entries(&self, mut entries: Vec<EpgEntry>) {
        entries.sort_by_key(|e| e.start_time);
        *self.entries.write().unwrap_or_else(|e| e.into_inner()) = entries;
    }

    pub fn entries(&self) -> Vec<EpgEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    /// Drop entries that ended before `cutoff`.
    pub fn trim_before(&self, cutoff: DateTime<Utc>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|e| e.end_time >= cutoff);
    }

    /// The entry airing at `now`, if any.
    pub fn get_now(&self, now: DateTime<Utc>) -> Option<EpgEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|e| e.start_time <= now && e.end_time > now)
            .cloned()
    }

    /// The first entry starting after `now`, if any.
    pub fn get_next(&self, now: DateTime<Utc>) -> Option<EpgEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|e| e.start_time > now)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::guide_entry;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap()
    }

    #[test]
    fn test_now_and_next() {
        let table = GuideTable::new(1);
        table.replace_entries(vec![
            guide_entry(2, t0() + Duration::minutes(30), 60, "Film"),
            guide_entry(1, t0(), 30, "News"),
        ]);

        let now = t0() + Duration::minutes(10);
        assert_eq!(table.get_now(now).unwrap().title, "News");
        assert_eq!(table.get_next(now).unwrap().title, "Film");

        // Past the last entry: nothing airing, nothing upcoming
        let after = t0() + Duration::minutes(95);
        assert!(table.get_now(after).is_none());
        assert!(table.get_next(after).is_none());
    }

    #[test]
    fn test_empty_table_has_no_now() {
        let table = GuideTable::new(1);
        assert_eq!(table.state(), GuideState::Uninitialized);
        assert!(table.get_now(t0()).is_none());
        assert!(table.get_next(t0()).is_none());
    }

    #[test]
    fn test_trim_before() {
        let table = GuideTable::new(1);
        table.replace_entries(vec![
            guide_entry(1, t0(), 30, "Old"),
            guide_entry(2, t0() + Duration::hours(2), 30, "Current"),
        ]);

        table.trim_before(t0() + Duration::hours(1));
        let entries = table.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Current");
    }
}
