//! The orchestrator: process-wide coordination of all DVR components.
//!
//! Owns the client adapters, the channel registry, the guide engine, the
//! timer scheduler and the store, and runs the background update loop.
//! Constructed explicitly and passed around by reference; there is no
//! ambient global state.

mod playback;
mod update_loop;

pub use playback::{OpenedStream, PlaybackState};

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use pvr_api::{ApiError, DriveSpace, EpgEntry, PvrBackend, RecordingEntry};
use thiserror::Error;

use crate::channels::{ChannelRegistry, RegistryError};
use crate::client::{ClientAdapter, ClientMap};
use crate::config::Config;
use crate::epg::{EpgEngine, EpgError};
use crate::events::{EventBus, PvrEvent};
use crate::store::{LastChannel, Store, StoreError};
use crate::timers::{Timer, TimerError, TimerScheduler};

use playback::Playback;

/// Orchestrator error types.
#[derive(Error, Debug)]
pub enum PvrError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Epg(#[from] EpgError),

    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error("backend call failed: {0}")]
    Api(#[from] ApiError),

    #[error("no channel with number {0}")]
    NoSuchChannel(u32),

    #[error("client {0} is not available")]
    ClientUnavailable(i64),

    #[error("no stream is open")]
    NotPlaying,
}

pub type Result<T> = std::result::Result<T, PvrError>;

/// Aggregated status snapshot for external consumers.
#[derive(Debug, Clone)]
pub struct PvrStatus {
    pub is_recording: bool,
    pub has_timers: bool,
    /// The next timer to fire, if any.
    pub next_recording: Option<Timer>,
    pub previous_channel: Option<LastChannel>,
    pub drive_space: Option<DriveSpace>,
    /// name/version strings of every registered backend.
    pub backends: Vec<String>,
}

struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

/// The process-wide coordinator.
pub struct Orchestrator {
    config: Config,
    store: Arc<Mutex<Store>>,
    clients: Arc<ClientMap>,
    registry: Arc<ChannelRegistry>,
    epg: Arc<EpgEngine>,
    timers: Arc<TimerScheduler>,
    events: Arc<EventBus>,
    playback: Mutex<Playback>,
    recordings: Mutex<Vec<(i64, RecordingEntry)>>,
    stop: Arc<StopSignal>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(config: Config, store: Store) -> Self {
        let store = Arc::new(Mutex::new(store));
        let events = Arc::new(EventBus::new());
        let clients = Arc::new(ClientMap::new());
        let registry = Arc::new(ChannelRegistry::new(
            Arc::clone(&store),
            Arc::clone(&clients),
            Arc::clone(&events),
        ));
        let epg = Arc::new(EpgEngine::new(
            Arc::clone(&store),
            Arc::clone(&clients),
            Arc::clone(&events),
        ));
        let timers = Arc::new(TimerScheduler::new(
            Arc::clone(&clients),
            Arc::clone(&events),
        ));

        Self {
            config,
            store,
            clients,
            registry,
            epg,
            timers,
            events,
            playback: Mutex::new(Playback::new()),
            recordings: Mutex::new(Vec::new()),
            stop: Arc::new(StopSignal {
                stopped: Mutex::new(false),
                condvar: Condvar::new(),
            }),
            loop_handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn epg(&self) -> &Arc<EpgEngine> {
        &self.epg
    }

    pub fn timers(&self) -> &Arc<TimerScheduler> {
        &self.timers
    }

    pub fn clients(&self) -> &Arc<ClientMap> {
        &self.clients
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Client registration -------------------------------------------------

    /// Register a backend under a stable (name, guid) identity and wrap
    /// it in an adapter. Returns the store-assigned client id.
    pub fn register_client(
        &self,
        name: &str,
        guid: &str,
        backend: Box<dyn PvrBackend>,
    ) -> Result<i64> {
        let client_id = self.store().get_or_create_client(name, guid)?;
        let adapter = Arc::new(ClientAdapter::new(client_id, backend));
        let state = adapter.connection_state();
        log::info!(
            "Registered client {} '{}' ({:?})",
            client_id,
            name,
            state
        );
        self.clients.insert(adapter);
        self.events
            .publish(PvrEvent::ClientStateChanged { client_id, state });
        Ok(client_id)
    }

    /// Drop a client's adapter. Its stored channels stay; a later scan
    /// from the re-registered client removes the ones it no longer
    /// reports.
    pub fn unregister_client(&self, client_id: i64) {
        if self.clients.remove(client_id).is_some() {
            log::info!("Unregistered client {}", client_id);
        }
    }

    // Startup / shutdown ----------------------------------------------------

    /// Load persisted state and populate from the registered clients.
    pub fn initialize(&self) -> Result<()> {
        self.registry.load_from_store(false)?;
        self.registry.load_from_store(true)?;
        self.registry.load_from_clients(false)?;
        self.registry.load_from_clients(true)?;
        self.timers.refresh();
        self.refresh_recordings();
        log::info!(
            "PVR initialized: {} TV / {} radio channels, {} timers",
            self.registry.channel_count(false),
            self.registry.channel_count(true),
            self.timers.get_timers().len()
        );
        Ok(())
    }

    /// Start the background update loop on its own thread.
    pub fn start(self: &Arc<Self>) {
        let orchestrator = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name("pvr-update".to_string())
            .spawn(move || update_loop::run(orchestrator))
            .unwrap_or_else(|e| panic!("failed to spawn update thread: {}", e));
        *self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stop the update loop and wait for it to finish.
    pub fn stop(&self) {
        {
            let mut stopped = self.stop.stopped.lock().unwrap_or_else(|e| e.into_inner());
            *stopped = true;
        }
        self.stop.condvar.notify_all();
        if let Some(handle) = self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            if handle.join().is_err() {
                log::error!("Update thread panicked during shutdown");
            }
        }
    }

    fn is_stopped(&self) -> bool {
        *self.stop.stopped.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Recordings -------------------------------------------------------------

    /// Re-read the recordings list from every recording-capable client.
    pub fn refresh_recordings(&self) -> usize {
        let adapters = self
            .clients
            .ready_clients_supporting(|caps| caps.supports_recordings);

        let mut fresh: Vec<(i64, RecordingEntry)> = Vec::new();
        for adapter in &adapters {
            match adapter.get_recordings() {
                Ok(records) => {
                    fresh.extend(records.into_iter().map(|r| (adapter.id(), r)));
                }
                Err(e) if e.is_notable() => {
                    log::warn!(
                        "Client {}: recordings enumeration failed: {}",
                        adapter.id(),
                        e
                    );
                }
                Err(_) => {}
            }
        }

        let count = fresh.len();
        *self
            .recordings
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = fresh;
        count
    }

    pub fn get_recordings(&self) -> Vec<(i64, RecordingEntry)> {
        self.recordings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn delete_recording(&self, client_id: i64, index: i32) -> Result<()> {
        let adapter = self
            .clients
            .get(client_id)
            .ok_or(PvrError::ClientUnavailable(client_id))?;
        adapter.delete_recording(index)?;
        self.recordings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(cid, r)| !(*cid == client_id && r.index == index));
        Ok(())
    }

    // Status -------------------------------------------------------------------

    /// Aggregated status snapshot.
    pub fn status(&self, now: DateTime<Utc>) -> PvrStatus {
        let drive_space = self
            .clients
            .ready_clients_supporting(|caps| caps.supports_drive_space)
            .iter()
            .filter_map(|c| c.get_drive_space().ok())
            .fold(None::<DriveSpace>, |acc, space| {
                Some(match acc {
                    Some(total) => DriveSpace {
                        total_kb: total.total_kb + space.total_kb,
                        used_kb: total.used_kb + space.used_kb,
                    },
                    None => space,
                })
            });

        let backends = self
            .clients
            .ready_clients()
            .iter()
            .map(|c| {
                let props = c.properties();
                format!("{} {}", props.name, props.version)
            })
            .collect();

        let previous_channel = self.store().get_last_channel().ok().flatten();

        PvrStatus {
            is_recording: self.timers.is_recording(),
            has_timers: self.timers.has_timers(),
            next_recording: self.timers.next_active(now),
            previous_channel,
            drive_space,
            backends,
        }
    }

    /// Seconds until the next scheduled recording starts, if any.
    pub fn time_until_next_recording(&self, now: DateTime<Utc>) -> Option<i64> {
        self.timers
            .next_active(now)
            .and_then(|t| t.next_occurrence(now))
            .map(|(start, _)| (start - now).num_seconds().max(0))
    }

    /// Whether hiding this channel must be refused because timers still
    /// target it, then forward to the registry.
    pub fn hide_channel(&self, radio: bool, number: u32) -> Result<()> {
        let channel = self
            .registry
            .get_channel_by_number(radio, number)
            .ok_or(PvrError::NoSuchChannel(number))?;
        let has_timers = self
            .timers
            .has_active_timer_on(channel.client_id, channel.client_number);
        self.registry.hide_channel(radio, number, has_timers)?;
        Ok(())
    }

    // Recording timers -----------------------------------------------------

    /// Schedule a one-shot recording of a guide entry, padding start and
    /// stop by the configured margins.
    pub fn record_from_guide(
        &self,
        radio: bool,
        number: u32,
        entry: &EpgEntry,
    ) -> Result<Timer> {
        let channel = self
            .registry
            .get_channel_by_number(radio, number)
            .ok_or(PvrError::NoSuchChannel(number))?;
        let timer = Timer::from_guide_entry(
            channel.client_id,
            channel.client_number,
            entry,
            self.config.timers.margins,
        );
        Ok(self.timers.add(timer)?)
    }

    /// Start recording a channel from `now` for the configured default
    /// duration.
    pub fn record_instant(&self, radio: bool, number: u32, now: DateTime<Utc>) -> Result<Timer> {
        let channel = self
            .registry
            .get_channel_by_number(radio, number)
            .ok_or(PvrError::NoSuchChannel(number))?;
        let timer = Timer::instant(
            channel.client_id,
            channel.client_number,
            &channel.name,
            now,
            self.config.timers.instant_duration,
        );
        Ok(self.timers.add(timer)?)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("clients", &self.clients.len())
            .finish_non_exhaustive()
    }
}
