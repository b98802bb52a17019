//! Timer scheduler: the authoritative timer list and its backend sync.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use pvr_api::{ApiError, EpgEntry};
use thiserror::Error;

use crate::client::ClientMap;
use crate::events::{EventBus, PvrEvent};
use crate::timers::Timer;

/// Scheduler error types.
#[derive(Error, Debug)]
pub enum TimerError {
    #[error("invalid timer: {0}")]
    Invalid(&'static str),

    #[error("client {0} is not available")]
    ClientUnavailable(i64),

    #[error("no timer with index {index} on client {client_id}")]
    NotFound { client_id: i64, index: i32 },

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, TimerError>;

/// Owner of every known timer.
///
/// Add/update/delete forward to the owning client adapter and the local
/// list only changes once the backend accepted; the backends stay the
/// source of truth and [`TimerScheduler::refresh`] re-reads them.
pub struct TimerScheduler {
    clients: Arc<ClientMap>,
    events: Arc<EventBus>,
    timers: RwLock<Vec<Timer>>,
}

impl TimerScheduler {
    pub fn new(clients: Arc<ClientMap>, events: Arc<EventBus>) -> Self {
        Self {
            clients,
            events,
            timers: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Timer>> {
        self.timers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Timer>> {
        self.timers.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-read the timer list from every ready timer-capable client.
    ///
    /// A timer seen transitioning into the recording state fires
    /// `TimerFired` and `RecordingStarted`; one seen leaving it fires
    /// `RecordingStopped`. Adapter failures are logged; the previous
    /// snapshot for that client is dropped rather than kept stale.
    pub fn refresh(&self) -> usize {
        let adapters = self.clients.ready_clients_supporting(|caps| caps.supports_timers);

        let mut fresh: Vec<Timer> = Vec::new();
        for adapter in &adapters {
            match adapter.get_timers() {
                Ok(entries) => {
                    fresh.extend(entries.iter().map(|e| Timer::from_entry(adapter.id(), e)));
                }
                Err(e) if e.is_notable() => {
                    log::warn!("Client {}: timer enumeration failed: {}", adapter.id(), e);
                }
                Err(_) => {}
            }
        }

        let (fired, stopped) = {
            let previous = self.read();
            let fired: Vec<(i64, i32, u32)> = fresh
                .iter()
                .filter(|t| t.recording)
                .filter(|t| {
                    !previous
                        .iter()
                        .any(|p| p.client_id == t.client_id && p.index == t.index && p.recording)
                })
                .map(|t| (t.client_id, t.index, t.channel_number))
                .collect();
            let stopped: Vec<(i64, u32)> = previous
                .iter()
                .filter(|p| p.recording)
                .filter(|p| {
                    !fresh
                        .iter()
                        .any(|t| t.client_id == p.client_id && t.index == p.index && t.recording)
                })
                .map(|p| (p.client_id, p.channel_number))
                .collect();
            (fired, stopped)
        };

        let count = fresh.len();
        *self.write() = fresh;

        for (client_id, index, channel_number) in fired {
            log::info!("Timer {} on client {} started recording", index, client_id);
            self.events.publish(PvrEvent::TimerFired { client_id, index });
            self.events.publish(PvrEvent::RecordingStarted {
                client_id,
                channel_number,
            });
        }
        for (client_id, channel_number) in stopped {
            self.events.publish(PvrEvent::RecordingStopped {
                client_id,
                channel_number,
            });
        }
        count
    }

    /// Snapshot of all timers.
    pub fn get_timers(&self) -> Vec<Timer> {
        self.read().clone()
    }

    pub fn get_timer(&self, client_id: i64, index: i32) -> Option<Timer> {
        self.read()
            .iter()
            .find(|t| t.client_id == client_id && t.index == index)
            .cloned()
    }

    pub fn has_timers(&self) -> bool {
        !self.read().is_empty()
    }

    /// Whether any timer is currently recording.
    pub fn is_recording(&self) -> bool {
        self.read().iter().any(|t| t.recording)
    }

    /// Timers targeting one channel.
    pub fn timers_for_channel(&self, client_id: i64, channel_number: u32) -> Vec<Timer> {
        self.read()
            .iter()
            .filter(|t| t.client_id == client_id && t.channel_number == channel_number)
            .cloned()
            .collect()
    }

    pub fn has_active_timer_on(&self, client_id: i64, channel_number: u32) -> bool {
        self.read()
            .iter()
            .any(|t| t.active && t.client_id == client_id && t.channel_number == channel_number)
    }

    /// Submit a new timer to its owning client. The local list only
    /// changes once the backend returned the accepted record.
    pub fn add(&self, timer: Timer) -> Result<Timer> {
        timer.validate().map_err(TimerError::Invalid)?;
        let adapter = self
            .clients
            .get(timer.client_id)
            .ok_or(TimerError::ClientUnavailable(timer.client_id))?;

        let accepted_entry = adapter.add_timer(&timer.to_entry())?;
        let accepted = Timer::from_entry(timer.client_id, &accepted_entry);
        log::info!(
            "Timer '{}' accepted by client {} as index {}",
            accepted.title,
            accepted.client_id,
            accepted.index
        );
        self.write().push(accepted.clone());
        self.events.publish(PvrEvent::TimerAdded {
            client_id: accepted.client_id,
            index: accepted.index,
        });
        Ok(accepted)
    }

    /// Replace a timer on its owning client.
    pub fn update(&self, timer: Timer) -> Result<()> {
        timer.validate().map_err(TimerError::Invalid)?;
        let adapter = self
            .clients
            .get(timer.client_id)
            .ok_or(TimerError::ClientUnavailable(timer.client_id))?;

        adapter.update_timer(&timer.to_entry())?;

        let mut timers = self.write();
        match timers
            .iter_mut()
            .find(|t| t.client_id == timer.client_id && t.index == timer.index)
        {
            Some(stored) => *stored = timer,
            None => timers.push(timer),
        }
        Ok(())
    }

    /// Delete a timer. A currently-recording timer is refused with
    /// `RecordingInProgress` unless `force` is set; the caller re-prompts
    /// and retries with force.
    pub fn delete(&self, client_id: i64, index: i32, force: bool) -> Result<()> {
        let adapter = self
            .clients
            .get(client_id)
            .ok_or(TimerError::ClientUnavailable(client_id))?;

        adapter.delete_timer(index, force)?;

        self.write()
            .retain(|t| !(t.client_id == client_id && t.index == index));
        self.events
            .publish(PvrEvent::TimerRemoved { client_id, index });
        Ok(())
    }

    /// Rename a timer in place.
    pub fn rename(&self, client_id: i64, index: i32, new_title: &str) -> Result<()> {
        let mut timer = self
            .get_timer(client_id, index)
            .ok_or(TimerError::NotFound { client_id, index })?;
        timer.title = new_title.to_string();
        self.update(timer)
    }

    /// Attach guide back-references: for every active timer, the guide
    /// entry containing the timer's midpoint becomes its broadcast.
    /// `entries_for` resolves a timer's channel to that channel's sorted
    /// entry set. Returns how many timers matched.
    pub fn match_to_guide(&self, entries_for: impl Fn(&Timer) -> Vec<EpgEntry>) -> usize {
        // Resolve outside the list lock; guide lookups may hit other locks
        let candidates: Vec<(i64, i32, Vec<EpgEntry>)> = self
            .read()
            .iter()
            .filter(|t| t.active && !t.repeating)
            .map(|t| (t.client_id, t.index, entries_for(t)))
            .collect();

        let mut matched = 0;
        let mut timers = self.write();
        for (client_id, index, entries) in candidates {
            if let Some(timer) = timers
                .iter_mut()
                .find(|t| t.client_id == client_id && t.index == index)
            {
                if let Some(entry) = timer.matched_entry(&entries) {
                    timer.broadcast_id = Some(entry.broadcast_id);
                    matched += 1;
                }
            }
        }
        matched
    }

    /// The active timer firing next: earliest upcoming start, ties broken
    /// by higher priority.
    pub fn next_active(&self, now: DateTime<Utc>) -> Option<Timer> {
        self.read()
            .iter()
            .filter_map(|t| t.next_occurrence(now).map(|(start, _)| (start, t)))
            .min_by_key(|(start, t)| (*start, std::cmp::Reverse(t.priority)))
            .map(|(_, t)| t.clone())
    }
}

impl std::fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerScheduler")
            .field("timers", &self.read().len())
            .finish_non_exhaustive()
    }
}
