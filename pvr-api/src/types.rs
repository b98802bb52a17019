//! Record and capability definitions for the backend boundary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Weekday bitmask covering every day (Monday = bit 0 .. Sunday = bit 6).
pub const WEEKDAY_ALL: u8 = 0x7F;

/// Capability flags a backend declares at registration.
///
/// The adapter wrapper consults these before forwarding a call; an
/// operation against an undeclared capability is answered with
/// [`crate::ApiError::NotImplemented`] without touching the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Backend provides TV channels.
    pub supports_tv: bool,
    /// Backend provides radio channels.
    pub supports_radio: bool,
    /// Backend can supply guide data per channel.
    pub supports_epg: bool,
    /// Backend manages recording timers.
    pub supports_timers: bool,
    /// Backend stores finished recordings.
    pub supports_recordings: bool,
    /// Live streams can be paused.
    pub supports_pause: bool,
    /// Streams support direct seeking.
    pub supports_directseek: bool,
    /// Backend ships its own demuxer for its streams.
    pub handles_demuxing: bool,
    /// Backend reports tuner signal quality.
    pub supports_signal_quality: bool,
    /// Backend reports recording drive space.
    pub supports_drive_space: bool,
}

/// Connection state of one backend client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Connected, but the last call reported a server-side failure.
    ConnectedError,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::ConnectedError)
    }
}

/// Static backend identification, fetched once at adapter creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendProperties {
    pub name: String,
    pub version: String,
    pub host: String,
    pub capabilities: Capabilities,
}

/// One channel as reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// Provider-unique channel identifier, stable across enumerations.
    pub unique_id: u32,
    /// Channel number as the provider counts it.
    pub number: u32,
    pub name: String,
    pub icon_path: String,
    /// Conditional-access system id; 0 means free-to-air.
    pub encryption_system: u16,
    pub radio: bool,
    pub hidden: bool,
    /// Direct stream URL for channels not tuned through the backend.
    pub stream_url: String,
    /// Declared container/input format for `stream_url` channels.
    pub input_format: String,
}

/// One broadcast within a channel's guide window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpgEntry {
    /// Provider-unique broadcast identifier.
    pub broadcast_id: u32,
    pub title: String,
    pub plot_outline: String,
    pub plot: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub genre_type: i32,
    pub genre_sub_type: i32,
    pub parental_rating: i32,
    /// 0..=10, 0 meaning unrated.
    pub star_rating: i32,
    pub series_number: i32,
    pub episode_number: i32,
    pub episode_part: i32,
    pub episode_name: String,
    pub first_aired: Option<NaiveDate>,
}

/// One recording instruction as the backend stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerEntry {
    /// Backend-assigned index; -1 until the backend has accepted it.
    pub index: i32,
    pub active: bool,
    /// Provider channel number the timer records from.
    pub channel_number: u32,
    pub title: String,
    /// Recording target directory, backend-interpreted.
    pub directory: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Tie-break when ranking concurrent timers; higher wins.
    pub priority: i32,
    /// Retention of the produced recording, in days.
    pub lifetime: i32,
    pub repeating: bool,
    /// First date a repeating timer may fire.
    pub first_day: Option<NaiveDate>,
    /// Weekday bitmask for repeating timers (Monday = bit 0).
    pub weekdays: u8,
    /// Set while the backend is recording this timer.
    pub recording: bool,
    /// Broadcast the timer was created from, if any.
    pub broadcast_id: Option<u32>,
}

impl Default for TimerEntry {
    fn default() -> Self {
        Self {
            index: -1,
            active: false,
            channel_number: 0,
            title: String::new(),
            directory: String::new(),
            start_time: DateTime::<Utc>::MIN_UTC,
            end_time: DateTime::<Utc>::MIN_UTC,
            priority: 0,
            lifetime: 0,
            repeating: false,
            first_day: None,
            weekdays: 0,
            recording: false,
            broadcast_id: None,
        }
    }
}

/// One finished recording as reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingEntry {
    pub index: i32,
    pub title: String,
    pub directory: String,
    pub plot: String,
    pub channel_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_secs: i64,
    pub priority: i32,
    pub lifetime: i32,
    pub stream_url: String,
}

/// One demuxed packet from a backend that ships its own demuxer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemuxPacket {
    /// Elementary stream the packet belongs to.
    pub stream_id: u32,
    /// Presentation timestamp in microseconds.
    pub pts: Option<i64>,
    /// Decode timestamp in microseconds.
    pub dts: Option<i64>,
    pub data: Vec<u8>,
}

/// Signal quality snapshot for the currently tuned channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStatus {
    pub adapter_name: String,
    pub adapter_status: String,
    /// Signal-to-noise ratio, 0..=0xFFFF.
    pub snr: u16,
    /// Signal strength, 0..=0xFFFF.
    pub signal: u16,
    /// Bit error rate counter.
    pub ber: u32,
    /// Uncorrected block counter.
    pub unc: u32,
}

/// Recording drive space, in kilobytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveSpace {
    pub total_kb: u64,
    pub used_kb: u64,
}

impl DriveSpace {
    pub fn free_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.used_kb)
    }
}
