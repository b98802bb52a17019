//! Guide engine: keeps per-channel guide tables filled and clean.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Duration, Utc};
use pvr_api::{ApiError, EpgEntry};
use thiserror::Error;

use crate::channels::{Channel, Grabber};
use crate::client::ClientMap;
use crate::epg::scraper::ScraperSet;
use crate::epg::table::{GuideState, GuideTable};
use crate::events::{EventBus, PvrEvent};
use crate::store::{Store, StoreError};

/// Guide engine error types.
#[derive(Error, Debug)]
pub enum EpgError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("client {0} is not available")]
    ClientUnavailable(i64),

    #[error("no scraper named '{0}' is registered")]
    UnknownScraper(String),

    #[error("guide grab failed: {0}")]
    Grab(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, EpgError>;

/// Owner of every channel's [`GuideTable`].
///
/// Table locks are per channel and never held across a store or backend
/// call; a grab prepares the full replacement set first and swaps it in.
pub struct EpgEngine {
    store: Arc<Mutex<Store>>,
    clients: Arc<ClientMap>,
    events: Arc<EventBus>,
    tables: RwLock<HashMap<i64, Arc<GuideTable>>>,
    scrapers: RwLock<ScraperSet>,
}

impl EpgEngine {
    pub fn new(store: Arc<Mutex<Store>>, clients: Arc<ClientMap>, events: Arc<EventBus>) -> Self {
        Self {
            store,
            clients,
            events,
            tables: RwLock::new(HashMap::new()),
            scrapers: RwLock::new(ScraperSet::new()),
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register_scraper(&self, scraper: Box<dyn crate::epg::Scraper>) {
        self.scrapers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .register(scraper);
    }

    /// The guide table for one channel, created on first use.
    pub fn table(&self, channel_id: i64) -> Arc<GuideTable> {
        if let Some(table) = self
            .tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&channel_id)
        {
            return Arc::clone(table);
        }
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            tables
                .entry(channel_id)
                .or_insert_with(|| Arc::new(GuideTable::new(channel_id))),
        )
    }

    /// Bring one channel's table up to date for the window `[start, end)`.
    ///
    /// A channel with grabbing disabled or no grabber configured is
    /// skipped. When stored entries already span the window, they are
    /// served without contacting the backend. Otherwise the configured
    /// grabber is asked, overlaps are fixed (the later-reported entry
    /// wins, the earlier one is trimmed or dropped), and the result is
    /// persisted with per-entry failures skipped.
    ///
    /// Returns whether a grab ran.
    pub fn update(
        &self,
        channel: &Channel,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        let table = self.table(channel.id);

        if !channel.grab_epg || channel.grabber == Grabber::None {
            log::debug!(
                "Channel '{}': guide grabbing disabled, skipping",
                channel.name
            );
            table.set_state(GuideState::Ready);
            return Ok(false);
        }

        table.set_state(GuideState::Loading);
        let covered = self.store().guide_window_covered(channel.id, start, end)?;
        if covered {
            let stored = self.store().get_guide_window(channel.id, start, end)?;
            table.replace_entries(stored);
            table.set_state(GuideState::Ready);
            return Ok(false);
        }

        table.set_state(GuideState::Grabbing);
        let fetched = match self.grab(channel, start, end) {
            Ok(entries) => entries,
            Err(e) => {
                table.set_state(GuideState::Ready);
                return Err(e);
            }
        };
        log::debug!(
            "Channel '{}': grabbed {} guide entries",
            channel.name,
            fetched.len()
        );

        // Stored entries come first so a fresh grab wins every conflict
        let stored = self.store().get_guide_window(channel.id, start, end)?;
        let (fixed, dropped) = fix_overlaps(stored.into_iter().chain(fetched).collect());

        {
            let store = self.store();
            for start_time in dropped {
                if let Err(e) = store.remove_guide_entry(channel.id, start_time) {
                    log::warn!(
                        "Channel '{}': failed to drop shadowed guide entry: {}",
                        channel.name,
                        e
                    );
                }
            }
            let persisted = store.save_guide_entries(channel.id, &fixed);
            if persisted.failed > 0 {
                log::warn!(
                    "Channel '{}': {} of {} guide entries failed to persist",
                    channel.name,
                    persisted.failed,
                    persisted.failed + persisted.saved
                );
            }
        }

        let refreshed = self.store().get_guide_window(channel.id, start, end)?;
        table.replace_entries(refreshed);
        table.set_state(GuideState::Ready);
        self.events.publish(PvrEvent::GuideUpdated {
            channel_id: channel.id,
        });
        Ok(true)
    }

    fn grab(
        &self,
        channel: &Channel,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EpgEntry>> {
        match &channel.grabber {
            Grabber::Client => {
                let adapter = self
                    .clients
                    .get(channel.client_id)
                    .ok_or(EpgError::ClientUnavailable(channel.client_id))?;
                Ok(adapter.get_epg_for_channel(channel.unique_id, start, end)?)
            }
            Grabber::Scraper(name) => {
                let scrapers = self.scrapers.read().unwrap_or_else(|e| e.into_inner());
                let scraper = scrapers
                    .get(name)
                    .ok_or_else(|| EpgError::UnknownScraper(name.clone()))?;
                Ok(scraper.fetch(channel, start, end)?)
            }
            Grabber::None => Ok(Vec::new()),
        }
    }

    /// Update every channel in `channels`; per-channel failures are
    /// logged and the rest continue. Returns how many grabs ran.
    pub fn update_all(
        &self,
        channels: &[Channel],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> usize {
        let mut grabbed = 0;
        for channel in channels {
            match self.update(channel, start, end) {
                Ok(true) => grabbed += 1,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Channel '{}': guide update failed: {}", channel.name, e);
                }
            }
        }
        grabbed
    }

    /// Purge entries that ended more than `linger` ago, from the store
    /// and from every in-memory table. Returns how many rows went.
    pub fn cleanup(&self, now: DateTime<Utc>, linger: Duration) -> Result<usize> {
        let cutoff = now - linger;
        let removed = self.store().purge_guide_before(cutoff)?;
        if removed > 0 {
            log::info!("Guide cleanup removed {} expired entries", removed);
        }
        for table in self
            .tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
        {
            table.trim_before(cutoff);
        }
        Ok(removed)
    }

    /// Erase a channel's guide data and mark its table for a fresh grab.
    pub fn force_update(&self, channel_id: i64) -> Result<()> {
        self.store().erase_guide_for_channel(channel_id)?;
        let table = self.table(channel_id);
        table.replace_entries(Vec::new());
        table.set_state(GuideState::Uninitialized);
        Ok(())
    }

    /// Drop the table of a deleted channel.
    pub fn forget(&self, channel_id: i64) {
        self.tables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&channel_id);
    }

    pub fn get_now(&self, channel_id: i64, now: DateTime<Utc>) -> Option<EpgEntry> {
        self.table(channel_id).get_now(now)
    }

    pub fn get_next(&self, channel_id: i64, now: DateTime<Utc>) -> Option<EpgEntry> {
        self.table(channel_id).get_next(now)
    }
}

impl std::fmt::Debug for EpgEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpgEngine").finish_non_exhaustive()
    }
}

/// Resolve overlaps in report order: a later-reported entry wins, the
/// earlier one is trimmed to end where the later starts, or dropped when
/// nothing of it remains. Returns the accepted entries sorted by start
/// time, plus the start keys of dropped entries.
fn fix_overlaps(entries: Vec<EpgEntry>) -> (Vec<EpgEntry>, Vec<DateTime<Utc>>) {
    let mut accepted: Vec<EpgEntry> = Vec::new();
    let mut dropped: Vec<DateTime<Utc>> = Vec::new();

    for new in entries {
        if new.end_time <= new.start_time {
            continue;
        }
        let mut kept = Vec::with_capacity(accepted.len() + 1);
        for mut old in accepted {
            if old.end_time <= new.start_time || old.start_time >= new.end_time {
                kept.push(old);
            } else if old.start_time < new.start_time {
                old.end_time = new.start_time;
                kept.push(old);
            } else {
                dropped.push(old.start_time);
            }
        }
        accepted = kept;
        accepted.push(new);
    }

    accepted.sort_by_key(|e| e.start_time);
    (accepted, dropped)
}
