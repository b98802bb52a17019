//! The backend plugin trait.

use chrono::{DateTime, Utc};

use crate::error::ApiResult;
use crate::types::{
    BackendProperties, ChannelEntry, DemuxPacket, DriveSpace, EpgEntry, RecordingEntry,
    SignalStatus, TimerEntry,
};

/// Seek origin for stream seeking, kept free of std::io so the boundary
/// stays a plain value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSeekFrom {
    Start(u64),
    End(i64),
    Current(i64),
}

/// The fixed operation set every backend plugin implements.
///
/// All methods are synchronous and may block on backend I/O; the core
/// never holds a shared lock across a call into this trait. Methods the
/// backend cannot serve should return
/// [`ApiError::NotImplemented`](crate::ApiError::NotImplemented). The
/// adapter wrapper already short-circuits operations against undeclared
/// capabilities, so a backend only sees calls it claimed to support.
///
/// Default implementations return `NotImplemented` so minimal backends
/// (a bare channel source, say) only implement what they have.
pub trait PvrBackend: Send {
    /// Identification and capability flags. Fetched once at adapter
    /// creation and cached.
    fn get_properties(&self) -> ApiResult<BackendProperties>;

    /// Enumerate TV (`radio == false`) or radio channels.
    fn get_channels(&self, radio: bool) -> ApiResult<Vec<ChannelEntry>>;

    /// Guide entries for one channel covering `[start, end)`.
    fn get_epg_for_channel(
        &self,
        channel_unique_id: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<Vec<EpgEntry>> {
        let _ = (channel_unique_id, start, end);
        Err(crate::ApiError::NotImplemented)
    }

    /// All timers known to the backend.
    fn get_timers(&self) -> ApiResult<Vec<TimerEntry>> {
        Err(crate::ApiError::NotImplemented)
    }

    /// Submit a new timer. Returns the accepted timer with its
    /// backend-assigned index filled in.
    fn add_timer(&mut self, timer: &TimerEntry) -> ApiResult<TimerEntry> {
        let _ = timer;
        Err(crate::ApiError::NotImplemented)
    }

    /// Delete a timer. A backend must refuse a timer that is currently
    /// recording with `RecordingInProgress` unless `force` is set.
    fn delete_timer(&mut self, index: i32, force: bool) -> ApiResult<()> {
        let _ = (index, force);
        Err(crate::ApiError::NotImplemented)
    }

    /// Replace the stored timer with the same index.
    fn update_timer(&mut self, timer: &TimerEntry) -> ApiResult<()> {
        let _ = timer;
        Err(crate::ApiError::NotImplemented)
    }

    /// All finished recordings.
    fn get_recordings(&self) -> ApiResult<Vec<RecordingEntry>> {
        Err(crate::ApiError::NotImplemented)
    }

    /// Delete a finished recording.
    fn delete_recording(&mut self, index: i32) -> ApiResult<()> {
        let _ = index;
        Err(crate::ApiError::NotImplemented)
    }

    // Live streams ------------------------------------------------------

    fn open_live_stream(&mut self, channel_unique_id: u32) -> ApiResult<()> {
        let _ = channel_unique_id;
        Err(crate::ApiError::NotImplemented)
    }

    fn close_live_stream(&mut self) -> ApiResult<()> {
        Err(crate::ApiError::NotImplemented)
    }

    /// Read stream data into `buf`; `Ok(0)` signals end of stream or an
    /// aborted (closed) stream.
    fn read_live_stream(&mut self, buf: &mut [u8]) -> ApiResult<usize> {
        let _ = buf;
        Err(crate::ApiError::NotImplemented)
    }

    fn seek_live_stream(&mut self, pos: StreamSeekFrom) -> ApiResult<i64> {
        let _ = pos;
        Err(crate::ApiError::NotImplemented)
    }

    fn position_live_stream(&self) -> ApiResult<i64> {
        Err(crate::ApiError::NotImplemented)
    }

    fn length_live_stream(&self) -> ApiResult<i64> {
        Err(crate::ApiError::NotImplemented)
    }

    /// Retune the already-open live stream to another channel.
    fn switch_channel(&mut self, channel_unique_id: u32) -> ApiResult<()> {
        let _ = channel_unique_id;
        Err(crate::ApiError::NotImplemented)
    }

    // Recorded streams --------------------------------------------------

    fn open_recorded_stream(&mut self, recording_index: i32) -> ApiResult<()> {
        let _ = recording_index;
        Err(crate::ApiError::NotImplemented)
    }

    fn close_recorded_stream(&mut self) -> ApiResult<()> {
        Err(crate::ApiError::NotImplemented)
    }

    fn read_recorded_stream(&mut self, buf: &mut [u8]) -> ApiResult<usize> {
        let _ = buf;
        Err(crate::ApiError::NotImplemented)
    }

    fn seek_recorded_stream(&mut self, pos: StreamSeekFrom) -> ApiResult<i64> {
        let _ = pos;
        Err(crate::ApiError::NotImplemented)
    }

    // Demuxing ------------------------------------------------------------
    // Only meaningful for backends declaring `handles_demuxing`.

    /// Read the next demuxed packet; `Ok(None)` when no packet is ready.
    fn demux_read(&mut self) -> ApiResult<Option<DemuxPacket>> {
        Err(crate::ApiError::NotImplemented)
    }

    /// Drop buffered packets and restart demuxing from the current
    /// stream position.
    fn demux_reset(&mut self) -> ApiResult<()> {
        Err(crate::ApiError::NotImplemented)
    }

    /// Abort demuxing; a blocked [`PvrBackend::demux_read`] must return.
    fn demux_abort(&mut self) -> ApiResult<()> {
        Err(crate::ApiError::NotImplemented)
    }

    /// Drop buffered packets without restarting.
    fn demux_flush(&mut self) -> ApiResult<()> {
        Err(crate::ApiError::NotImplemented)
    }

    // Status ------------------------------------------------------------

    fn get_drive_space(&self) -> ApiResult<DriveSpace> {
        Err(crate::ApiError::NotImplemented)
    }

    fn get_signal_quality(&self) -> ApiResult<SignalStatus> {
        Err(crate::ApiError::NotImplemented)
    }
}
