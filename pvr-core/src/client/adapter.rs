//! Client adapter: the invoke-with-translation wrapper around a backend.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use pvr_api::{
    ApiError, ApiResult, BackendProperties, Capabilities, ChannelEntry, ConnectionState,
    DemuxPacket, DriveSpace, EpgEntry, PvrBackend, RecordingEntry, SignalStatus, StreamSeekFrom,
    TimerEntry,
};

/// Consecutive hard failures before an adapter is flagged ignored.
const IGNORE_AFTER_FAILURES: u32 = 3;

#[derive(Debug)]
struct AdapterState {
    connection: ConnectionState,
    ignored: bool,
    initialized: bool,
    consecutive_failures: u32,
}

/// Wrapper around one backend plugin instance.
///
/// Every backend-facing operation goes through [`ClientAdapter::invoke`]:
/// an operation against an undeclared capability returns `NotImplemented`
/// without touching the backend, a not-yet-initialized or ignored adapter
/// returns `NotReady`, and everything else is forwarded with the
/// backend's outcome translated into the shared taxonomy. Adapter-level
/// failures never propagate as fatal errors; a misbehaving backend is
/// flagged ignored and excluded from enumeration until recreated.
pub struct ClientAdapter {
    id: i64,
    backend: Mutex<Box<dyn PvrBackend>>,
    properties: BackendProperties,
    state: Mutex<AdapterState>,
}

impl ClientAdapter {
    /// Wrap a backend. Properties are fetched once here; a backend that
    /// cannot even report properties is created in a not-ready state.
    pub fn new(id: i64, backend: Box<dyn PvrBackend>) -> Self {
        let (properties, initialized, connection) = match backend.get_properties() {
            Ok(props) => (props, true, ConnectionState::Connected),
            Err(e) => {
                log::warn!("Client {}: failed to read backend properties: {}", id, e);
                (BackendProperties::default(), false, ConnectionState::Disconnected)
            }
        };

        Self {
            id,
            backend: Mutex::new(backend),
            properties,
            state: Mutex::new(AdapterState {
                connection,
                ignored: false,
                initialized,
                consecutive_failures: 0,
            }),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Cached backend identification and capability flags.
    pub fn properties(&self) -> &BackendProperties {
        &self.properties
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.properties.capabilities
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lock_state().connection
    }

    /// Ready adapters are initialized, not ignored, and connected.
    pub fn is_ready(&self) -> bool {
        let state = self.lock_state();
        state.initialized && !state.ignored && state.connection.is_connected()
    }

    pub fn is_ignored(&self) -> bool {
        self.lock_state().ignored
    }

    /// Flag the adapter ignored; it is excluded from enumeration until
    /// [`ClientAdapter::restore`] is called.
    pub fn mark_ignored(&self) {
        let mut state = self.lock_state();
        if !state.ignored {
            log::warn!("Client {}: flagged ignored after repeated failures", self.id);
            state.ignored = true;
        }
    }

    /// Clear the ignored flag, e.g. after the backend was recreated.
    pub fn restore(&self) {
        let mut state = self.lock_state();
        state.ignored = false;
        state.consecutive_failures = 0;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, AdapterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The single wrapper every backend call goes through.
    ///
    /// The backend lock is adapter-local; callers must not hold any
    /// shared component lock across this call, since the backend may
    /// block on I/O.
    fn invoke<T>(
        &self,
        supported: impl Fn(&Capabilities) -> bool,
        op: &str,
        f: impl FnOnce(&mut dyn PvrBackend) -> ApiResult<T>,
    ) -> ApiResult<T> {
        {
            let state = self.lock_state();
            if state.ignored || !state.initialized {
                return Err(ApiError::NotReady);
            }
        }

        if !supported(&self.properties.capabilities) {
            return Err(ApiError::NotImplemented);
        }

        let result = {
            let mut backend = self.backend.lock().unwrap_or_else(|e| e.into_inner());
            f(backend.as_mut())
        };

        self.track_outcome(op, &result);
        result
    }

    /// Update cached connection state from a call outcome, and flag the
    /// adapter ignored after too many hard failures in a row.
    fn track_outcome<T>(&self, op: &str, result: &ApiResult<T>) {
        let mut state = self.lock_state();
        match result {
            Ok(_) => {
                state.connection = ConnectionState::Connected;
                state.consecutive_failures = 0;
            }
            Err(ApiError::NotConnected) => {
                state.connection = ConnectionState::Disconnected;
            }
            Err(ApiError::ServerError | ApiError::ServerTimeout | ApiError::Unknown) => {
                state.connection = ConnectionState::ConnectedError;
                state.consecutive_failures += 1;
                if state.consecutive_failures >= IGNORE_AFTER_FAILURES {
                    log::warn!(
                        "Client {}: {} failed {} times in a row, ignoring adapter",
                        self.id,
                        op,
                        state.consecutive_failures
                    );
                    state.ignored = true;
                }
            }
            // Taxonomy outcomes that say nothing about the connection
            Err(_) => {}
        }
    }

    // Channel / guide / timer operations -------------------------------

    pub fn get_channels(&self, radio: bool) -> ApiResult<Vec<ChannelEntry>> {
        self.invoke(
            |caps| if radio { caps.supports_radio } else { caps.supports_tv },
            "get_channels",
            |b| b.get_channels(radio),
        )
    }

    pub fn get_epg_for_channel(
        &self,
        channel_unique_id: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<Vec<EpgEntry>> {
        self.invoke(
            |caps| caps.supports_epg,
            "get_epg_for_channel",
            |b| b.get_epg_for_channel(channel_unique_id, start, end),
        )
    }

    pub fn get_timers(&self) -> ApiResult<Vec<TimerEntry>> {
        self.invoke(|caps| caps.supports_timers, "get_timers", |b| b.get_timers())
    }

    pub fn add_timer(&self, timer: &TimerEntry) -> ApiResult<TimerEntry> {
        self.invoke(|caps| caps.supports_timers, "add_timer", |b| b.add_timer(timer))
    }

    pub fn delete_timer(&self, index: i32, force: bool) -> ApiResult<()> {
        self.invoke(
            |caps| caps.supports_timers,
            "delete_timer",
            |b| b.delete_timer(index, force),
        )
    }

    pub fn update_timer(&self, timer: &TimerEntry) -> ApiResult<()> {
        self.invoke(|caps| caps.supports_timers, "update_timer", |b| b.update_timer(timer))
    }

    pub fn get_recordings(&self) -> ApiResult<Vec<RecordingEntry>> {
        self.invoke(
            |caps| caps.supports_recordings,
            "get_recordings",
            |b| b.get_recordings(),
        )
    }

    pub fn delete_recording(&self, index: i32) -> ApiResult<()> {
        self.invoke(
            |caps| caps.supports_recordings,
            "delete_recording",
            |b| b.delete_recording(index),
        )
    }

    // Stream operations -------------------------------------------------

    pub fn open_live_stream(&self, channel_unique_id: u32) -> ApiResult<()> {
        self.invoke(
            |caps| caps.supports_tv || caps.supports_radio,
            "open_live_stream",
            |b| b.open_live_stream(channel_unique_id),
        )
    }

    pub fn close_live_stream(&self) -> ApiResult<()> {
        self.invoke(|_| true, "close_live_stream", |b| b.close_live_stream())
    }

    pub fn read_live_stream(&self, buf: &mut [u8]) -> ApiResult<usize> {
        self.invoke(|_| true, "read_live_stream", |b| b.read_live_stream(buf))
    }

    pub fn seek_live_stream(&self, pos: StreamSeekFrom) -> ApiResult<i64> {
        self.invoke(
            |caps| caps.supports_directseek,
            "seek_live_stream",
            |b| b.seek_live_stream(pos),
        )
    }

    pub fn position_live_stream(&self) -> ApiResult<i64> {
        self.invoke(|_| true, "position_live_stream", |b| b.position_live_stream())
    }

    pub fn length_live_stream(&self) -> ApiResult<i64> {
        self.invoke(|_| true, "length_live_stream", |b| b.length_live_stream())
    }

    pub fn switch_channel(&self, channel_unique_id: u32) -> ApiResult<()> {
        self.invoke(
            |caps| caps.supports_tv || caps.supports_radio,
            "switch_channel",
            |b| b.switch_channel(channel_unique_id),
        )
    }

    pub fn open_recorded_stream(&self, recording_index: i32) -> ApiResult<()> {
        self.invoke(
            |caps| caps.supports_recordings,
            "open_recorded_stream",
            |b| b.open_recorded_stream(recording_index),
        )
    }

    pub fn close_recorded_stream(&self) -> ApiResult<()> {
        self.invoke(|_| true, "close_recorded_stream", |b| b.close_recorded_stream())
    }

    pub fn read_recorded_stream(&self, buf: &mut [u8]) -> ApiResult<usize> {
        self.invoke(|_| true, "read_recorded_stream", |b| b.read_recorded_stream(buf))
    }

    pub fn seek_recorded_stream(&self, pos: StreamSeekFrom) -> ApiResult<i64> {
        self.invoke(
            |caps| caps.supports_directseek,
            "seek_recorded_stream",
            |b| b.seek_recorded_stream(pos),
        )
    }

    // Demuxing ------------------------------------------------------------

    pub fn demux_read(&self) -> ApiResult<Option<DemuxPacket>> {
        self.invoke(|caps| caps.handles_demuxing, "demux_read", |b| b.demux_read())
    }

    pub fn demux_reset(&self) -> ApiResult<()> {
        self.invoke(|caps| caps.handles_demuxing, "demux_reset", |b| b.demux_reset())
    }

    pub fn demux_abort(&self) -> ApiResult<()> {
        self.invoke(|caps| caps.handles_demuxing, "demux_abort", |b| b.demux_abort())
    }

    pub fn demux_flush(&self) -> ApiResult<()> {
        self.invoke(|caps| caps.handles_demuxing, "demux_flush", |b| b.demux_flush())
    }

    // Status -------------------------------------------------------------

    pub fn get_drive_space(&self) -> ApiResult<DriveSpace> {
        self.invoke(
            |caps| caps.supports_drive_space,
            "get_drive_space",
            |b| b.get_drive_space(),
        )
    }

    pub fn get_signal_quality(&self) -> ApiResult<SignalStatus> {
        self.invoke(
            |caps| caps.supports_signal_quality,
            "get_signal_quality",
            |b| b.get_signal_quality(),
        )
    }
}

impl std::fmt::Debug for ClientAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientAdapter")
            .field("id", &self.id)
            .field("backend", &self.properties.name)
            .finish_non_exhaustive()
    }
}
