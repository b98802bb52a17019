//! In-process mock backend for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use pvr_api::{
    ApiError, ApiResult, BackendProperties, Capabilities, ChannelEntry, DemuxPacket, DriveSpace,
    EpgEntry, PvrBackend, RecordingEntry, SignalStatus, StreamSeekFrom, TimerEntry,
};

/// Call counters shared with the test through an `Arc`.
#[derive(Debug, Default)]
pub struct MockCalls {
    pub get_channels: AtomicUsize,
    pub get_epg: AtomicUsize,
    pub open_live: AtomicUsize,
    pub switch_channel: AtomicUsize,
}

/// A scriptable backend covering the full operation set.
pub struct MockBackend {
    pub name: String,
    pub capabilities: Capabilities,
    pub channels: Vec<ChannelEntry>,
    pub epg: HashMap<u32, Vec<EpgEntry>>,
    pub recordings: Vec<RecordingEntry>,
    /// When set, every forwarded call fails with this kind.
    pub fail_with: Option<ApiError>,
    pub calls: Arc<MockCalls>,
    timers: Arc<Mutex<Vec<TimerEntry>>>,
    next_timer_index: AtomicUsize,
    live_open: Mutex<Option<u32>>,
    stream_pos: Mutex<i64>,
    demux_queue: Mutex<Vec<DemuxPacket>>,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capabilities: Capabilities {
                supports_tv: true,
                supports_radio: true,
                supports_epg: true,
                supports_timers: true,
                supports_recordings: true,
                supports_pause: true,
                supports_directseek: true,
                handles_demuxing: false,
                supports_signal_quality: true,
                supports_drive_space: true,
            },
            channels: Vec::new(),
            epg: HashMap::new(),
            recordings: Vec::new(),
            fail_with: None,
            calls: Arc::new(MockCalls::default()),
            timers: Arc::new(Mutex::new(Vec::new())),
            next_timer_index: AtomicUsize::new(1),
            live_open: Mutex::new(None),
            stream_pos: Mutex::new(0),
            demux_queue: Mutex::new(Vec::new()),
        }
    }

    pub fn with_channels(mut self, channels: Vec<ChannelEntry>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_epg(mut self, channel_unique_id: u32, entries: Vec<EpgEntry>) -> Self {
        self.epg.insert(channel_unique_id, entries);
        self
    }

    /// Pre-seed a timer, marked recording when `recording` is set.
    pub fn seed_timer(&self, mut timer: TimerEntry, recording: bool) -> i32 {
        let index = self.next_timer_index.fetch_add(1, Ordering::SeqCst) as i32;
        timer.index = index;
        timer.recording = recording;
        self.timers.lock().unwrap().push(timer);
        index
    }

    /// Handle to the backing timer list, for mutating it after the
    /// backend has been boxed into an adapter.
    pub fn timers_handle(&self) -> Arc<Mutex<Vec<TimerEntry>>> {
        Arc::clone(&self.timers)
    }

    /// Queue a packet for [`PvrBackend::demux_read`].
    pub fn push_demux_packet(&self, packet: DemuxPacket) {
        self.demux_queue.lock().unwrap().push(packet);
    }

    fn check_fail(&self) -> ApiResult<()> {
        match self.fail_with {
            Some(kind) => Err(kind),
            None => Ok(()),
        }
    }
}

impl PvrBackend for MockBackend {
    fn get_properties(&self) -> ApiResult<BackendProperties> {
        Ok(BackendProperties {
            name: self.name.clone(),
            version: "1.0".to_string(),
            host: "mock://localhost".to_string(),
            capabilities: self.capabilities,
        })
    }

    fn get_channels(&self, radio: bool) -> ApiResult<Vec<ChannelEntry>> {
        self.check_fail()?;
        self.calls.get_channels.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .channels
            .iter()
            .filter(|c| c.radio == radio)
            .cloned()
            .collect())
    }

    fn get_epg_for_channel(
        &self,
        channel_unique_id: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<Vec<EpgEntry>> {
        self.check_fail()?;
        self.calls.get_epg.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .epg
            .get(&channel_unique_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.end_time > start && e.start_time < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_timers(&self) -> ApiResult<Vec<TimerEntry>> {
        self.check_fail()?;
        Ok(self.timers.lock().unwrap().clone())
    }

    fn add_timer(&mut self, timer: &TimerEntry) -> ApiResult<TimerEntry> {
        self.check_fail()?;
        let mut timers = self.timers.lock().unwrap();
        if timers
            .iter()
            .any(|t| t.channel_number == timer.channel_number && t.start_time == timer.start_time)
        {
            return Err(ApiError::AlreadyPresent);
        }
        let mut accepted = timer.clone();
        accepted.index = self.next_timer_index.fetch_add(1, Ordering::SeqCst) as i32;
        timers.push(accepted.clone());
        Ok(accepted)
    }

    fn delete_timer(&mut self, index: i32, force: bool) -> ApiResult<()> {
        self.check_fail()?;
        let mut timers = self.timers.lock().unwrap();
        let pos = timers
            .iter()
            .position(|t| t.index == index)
            .ok_or(ApiError::NotDeleted)?;
        if timers[pos].recording && !force {
            return Err(ApiError::RecordingInProgress);
        }
        timers.remove(pos);
        Ok(())
    }

    fn update_timer(&mut self, timer: &TimerEntry) -> ApiResult<()> {
        self.check_fail()?;
        let mut timers = self.timers.lock().unwrap();
        let stored = timers
            .iter_mut()
            .find(|t| t.index == timer.index)
            .ok_or(ApiError::NotSaved)?;
        *stored = timer.clone();
        Ok(())
    }

    fn get_recordings(&self) -> ApiResult<Vec<RecordingEntry>> {
        self.check_fail()?;
        Ok(self.recordings.clone())
    }

    fn delete_recording(&mut self, index: i32) -> ApiResult<()> {
        self.check_fail()?;
        let pos = self
            .recordings
            .iter()
            .position(|r| r.index == index)
            .ok_or(ApiError::NotDeleted)?;
        self.recordings.remove(pos);
        Ok(())
    }

    fn open_live_stream(&mut self, channel_unique_id: u32) -> ApiResult<()> {
        self.check_fail()?;
        self.calls.open_live.fetch_add(1, Ordering::SeqCst);
        *self.live_open.lock().unwrap() = Some(channel_unique_id);
        *self.stream_pos.lock().unwrap() = 0;
        Ok(())
    }

    fn close_live_stream(&mut self) -> ApiResult<()> {
        *self.live_open.lock().unwrap() = None;
        Ok(())
    }

    fn read_live_stream(&mut self, buf: &mut [u8]) -> ApiResult<usize> {
        self.check_fail()?;
        if self.live_open.lock().unwrap().is_none() {
            // Closed stream unblocks readers with end-of-stream
            return Ok(0);
        }
        let mut pos = self.stream_pos.lock().unwrap();
        for (i, b) in buf.iter_mut().enumerate() {
            *b = ((*pos as usize + i) % 251) as u8;
        }
        *pos += buf.len() as i64;
        Ok(buf.len())
    }

    fn seek_live_stream(&mut self, pos: StreamSeekFrom) -> ApiResult<i64> {
        self.check_fail()?;
        let mut current = self.stream_pos.lock().unwrap();
        *current = match pos {
            StreamSeekFrom::Start(p) => p as i64,
            StreamSeekFrom::Current(delta) => *current + delta,
            StreamSeekFrom::End(delta) => delta,
        };
        Ok(*current)
    }

    fn position_live_stream(&self) -> ApiResult<i64> {
        Ok(*self.stream_pos.lock().unwrap())
    }

    fn switch_channel(&mut self, channel_unique_id: u32) -> ApiResult<()> {
        self.check_fail()?;
        self.calls.switch_channel.fetch_add(1, Ordering::SeqCst);
        let mut open = self.live_open.lock().unwrap();
        if open.is_none() {
            return Err(ApiError::Unknown);
        }
        *open = Some(channel_unique_id);
        Ok(())
    }

    fn open_recorded_stream(&mut self, recording_index: i32) -> ApiResult<()> {
        self.check_fail()?;
        if !self.recordings.iter().any(|r| r.index == recording_index) {
            return Err(ApiError::Unknown);
        }
        *self.stream_pos.lock().unwrap() = 0;
        Ok(())
    }

    fn close_recorded_stream(&mut self) -> ApiResult<()> {
        Ok(())
    }

    fn read_recorded_stream(&mut self, buf: &mut [u8]) -> ApiResult<usize> {
        self.check_fail()?;
        Ok(buf.len())
    }

    fn seek_recorded_stream(&mut self, pos: StreamSeekFrom) -> ApiResult<i64> {
        self.seek_live_stream(pos)
    }

    fn demux_read(&mut self) -> ApiResult<Option<DemuxPacket>> {
        self.check_fail()?;
        let mut queue = self.demux_queue.lock().unwrap();
        if queue.is_empty() {
            Ok(None)
        } else {
            Ok(Some(queue.remove(0)))
        }
    }

    fn demux_reset(&mut self) -> ApiResult<()> {
        self.check_fail()?;
        self.demux_queue.lock().unwrap().clear();
        Ok(())
    }

    fn demux_abort(&mut self) -> ApiResult<()> {
        Ok(())
    }

    fn demux_flush(&mut self) -> ApiResult<()> {
        self.demux_queue.lock().unwrap().clear();
        Ok(())
    }

    fn get_drive_space(&self) -> ApiResult<DriveSpace> {
        self.check_fail()?;
        Ok(DriveSpace {
            total_kb: 1_000_000,
            used_kb: 250_000,
        })
    }

    fn get_signal_quality(&self) -> ApiResult<SignalStatus> {
        self.check_fail()?;
        Ok(SignalStatus {
            adapter_name: format!("{} tuner", self.name),
            adapter_status: "locked".to_string(),
            snr: 0xC000,
            signal: 0xD000,
            ber: 12,
            unc: 0,
        })
    }
}

/// Build a TV channel entry for tests.
pub fn tv_channel(unique_id: u32, number: u32, name: &str) -> ChannelEntry {
    ChannelEntry {
        unique_id,
        number,
        name: name.to_string(),
        ..ChannelEntry::default()
    }
}

/// Build a guide entry for tests.
pub fn guide_entry(
    broadcast_id: u32,
    start: DateTime<Utc>,
    minutes: i64,
    title: &str,
) -> EpgEntry {
    EpgEntry {
        broadcast_id,
        title: title.to_string(),
        plot_outline: String::new(),
        plot: String::new(),
        start_time: start,
        end_time: start + chrono::Duration::minutes(minutes),
        genre_type: 0,
        genre_sub_type: 0,
        parental_rating: 0,
        star_rating: 0,
        series_number: -1,
        episode_number: -1,
        episode_part: -1,
        episode_name: String::new(),
        first_aired: None,
    }
}
