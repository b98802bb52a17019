//! Playback state machine and stream pass-through.

use std::sync::MutexGuard;

use chrono::{DateTime, Utc};
use pvr_api::{EpgEntry, SignalStatus, StreamSeekFrom};

use crate::channels::Channel;
use crate::events::PvrEvent;
use crate::store::LastChannel;

use super::{Orchestrator, PvrError, Result};

/// Playback lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    OpeningLive,
    OpeningRecording,
    Playing,
    /// Only reachable when the owning client declares pause support.
    Paused,
    Closing,
}

/// What the caller should do with an opened live stream.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenedStream {
    /// Data flows through `read_stream` against the owning backend.
    Backend,
    /// Virtual channel: the player fetches the URL itself.
    Direct { url: String, input_format: String },
}

#[derive(Debug, Clone)]
enum Source {
    Live { channel: Channel, direct: bool },
    Recording { client_id: i64, index: i32 },
}

/// Orchestrator-local playback state. The lock around this struct is
/// never held across a backend call; stream operations copy what they
/// need out, call the adapter, and re-lock to update the caches.
#[derive(Debug)]
pub(super) struct Playback {
    state: PlaybackState,
    source: Option<Source>,
    /// Preview pointer for fast zapping; (radio, number).
    selected: Option<(bool, u32)>,
    signal: Option<SignalStatus>,
    position: i64,
    started_at: Option<DateTime<Utc>>,
}

impl Playback {
    pub(super) fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            source: None,
            selected: None,
            signal: None,
            position: 0,
            started_at: None,
        }
    }
}

impl Orchestrator {
    fn playback(&self) -> MutexGuard<'_, Playback> {
        self.playback.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback().state
    }

    /// The channel currently open for playback, if a live stream is.
    pub fn playing_channel(&self) -> Option<Channel> {
        match &self.playback().source {
            Some(Source::Live { channel, .. }) => Some(channel.clone()),
            _ => None,
        }
    }

    /// Open a live stream on a channel, closing whatever was open.
    pub fn open_live_stream(&self, radio: bool, number: u32) -> Result<OpenedStream> {
        if self.playback_state() != PlaybackState::Idle {
            self.close_stream()?;
        }

        let channel = self
            .registry
            .get_channel_by_number(radio, number)
            .ok_or(PvrError::NoSuchChannel(number))?;

        {
            let mut playback = self.playback();
            playback.state = PlaybackState::OpeningLive;
            playback.selected = Some((radio, number));
        }

        let (opened, signal) = if channel.is_virtual {
            (
                OpenedStream::Direct {
                    url: channel.stream_url.clone(),
                    input_format: channel.input_format.clone(),
                },
                None,
            )
        } else {
            let adapter = self
                .clients
                .get(channel.client_id)
                .ok_or(PvrError::ClientUnavailable(channel.client_id))?;
            if let Err(e) = adapter.open_live_stream(channel.unique_id) {
                self.playback().state = PlaybackState::Idle;
                return Err(e.into());
            }
            (OpenedStream::Backend, adapter.get_signal_quality().ok())
        };

        let now = Utc::now();
        {
            let mut playback = self.playback();
            playback.state = PlaybackState::Playing;
            playback.source = Some(Source::Live {
                channel: channel.clone(),
                direct: channel.is_virtual,
            });
            playback.signal = signal;
            playback.position = 0;
            playback.started_at = Some(now);
        }

        self.registry.set_playing_channel(Some(channel.id));
        if let Err(e) = self.store().set_last_channel(&LastChannel {
            channel_id: channel.id,
            number: channel.number,
            name: channel.name.clone(),
        }) {
            log::warn!("Failed to persist last channel: {}", e);
        }
        log::info!("Live playback started on '{}'", channel.name);
        self.events.publish(PvrEvent::PlaybackStarted {
            channel_id: Some(channel.id),
        });
        Ok(opened)
    }

    /// Open a recorded stream.
    pub fn open_recorded_stream(&self, client_id: i64, index: i32) -> Result<()> {
        if self.playback_state() != PlaybackState::Idle {
            self.close_stream()?;
        }

        self.playback().state = PlaybackState::OpeningRecording;
        let adapter = self
            .clients
            .get(client_id)
            .ok_or(PvrError::ClientUnavailable(client_id))?;
        if let Err(e) = adapter.open_recorded_stream(index) {
            self.playback().state = PlaybackState::Idle;
            return Err(e.into());
        }

        {
            let mut playback = self.playback();
            playback.state = PlaybackState::Playing;
            playback.source = Some(Source::Recording { client_id, index });
            playback.signal = None;
            playback.position = 0;
            playback.started_at = Some(Utc::now());
        }
        self.events
            .publish(PvrEvent::PlaybackStarted { channel_id: None });
        Ok(())
    }

    /// Read from the open stream. `Ok(0)` means end of stream or an
    /// aborted (closed) stream.
    pub fn read_stream(&self, buf: &mut [u8]) -> Result<usize> {
        let source = self
            .playback()
            .source
            .clone()
            .ok_or(PvrError::NotPlaying)?;

        let read = match source {
            Source::Live { direct: true, .. } => {
                // Virtual channels are read by the player, never by us
                return Err(PvrError::Api(pvr_api::ApiError::NotImplemented));
            }
            Source::Live { channel, .. } => {
                let adapter = self
                    .clients
                    .get(channel.client_id)
                    .ok_or(PvrError::ClientUnavailable(channel.client_id))?;
                adapter.read_live_stream(buf)?
            }
            Source::Recording { client_id, .. } => {
                let adapter = self
                    .clients
                    .get(client_id)
                    .ok_or(PvrError::ClientUnavailable(client_id))?;
                adapter.read_recorded_stream(buf)?
            }
        };

        self.playback().position += read as i64;
        Ok(read)
    }

    /// Seek the open stream; returns the new position.
    pub fn seek_stream(&self, pos: StreamSeekFrom) -> Result<i64> {
        let source = self
            .playback()
            .source
            .clone()
            .ok_or(PvrError::NotPlaying)?;

        let new_pos = match source {
            Source::Live { direct: true, .. } => {
                return Err(PvrError::Api(pvr_api::ApiError::NotImplemented));
            }
            Source::Live { channel, .. } => {
                let adapter = self
                    .clients
                    .get(channel.client_id)
                    .ok_or(PvrError::ClientUnavailable(channel.client_id))?;
                adapter.seek_live_stream(pos)?
            }
            Source::Recording { client_id, .. } => {
                let adapter = self
                    .clients
                    .get(client_id)
                    .ok_or(PvrError::ClientUnavailable(client_id))?;
                adapter.seek_recorded_stream(pos)?
            }
        };

        self.playback().position = new_pos;
        Ok(new_pos)
    }

    /// Cached stream position, updated by reads and seeks.
    pub fn stream_position(&self) -> i64 {
        self.playback().position
    }

    /// Cached signal status for the playing channel; `refresh` re-asks
    /// the backend.
    pub fn signal_status(&self, refresh: bool) -> Option<SignalStatus> {
        if refresh {
            let source = self.playback().source.clone();
            if let Some(Source::Live { channel, direct: false }) = source {
                if let Some(adapter) = self.clients.get(channel.client_id) {
                    if let Ok(signal) = adapter.get_signal_quality() {
                        let mut playback = self.playback();
                        playback.signal = Some(signal.clone());
                        return Some(signal);
                    }
                }
            }
        }
        self.playback().signal.clone()
    }

    /// Pause or resume playback. Refused when the owning client does not
    /// declare pause support.
    pub fn set_paused(&self, paused: bool) -> Result<()> {
        let source = self
            .playback()
            .source
            .clone()
            .ok_or(PvrError::NotPlaying)?;

        if let Source::Live { channel, direct: false } = &source {
            let adapter = self
                .clients
                .get(channel.client_id)
                .ok_or(PvrError::ClientUnavailable(channel.client_id))?;
            if !adapter.capabilities().supports_pause {
                return Err(PvrError::Api(pvr_api::ApiError::NotImplemented));
            }
        }

        let mut playback = self.playback();
        playback.state = match (playback.state, paused) {
            (PlaybackState::Playing, true) => PlaybackState::Paused,
            (PlaybackState::Paused, false) => PlaybackState::Playing,
            (state, _) => state,
        };
        Ok(())
    }

    /// Close the open stream, record watch statistics and publish the
    /// stop event. A no-op when nothing is open.
    pub fn close_stream(&self) -> Result<()> {
        let (source, started_at) = {
            let mut playback = self.playback();
            if playback.source.is_none() {
                return Ok(());
            }
            playback.state = PlaybackState::Closing;
            (playback.source.take(), playback.started_at.take())
        };

        match source {
            Some(Source::Live { channel, direct }) => {
                if !direct {
                    if let Some(adapter) = self.clients.get(channel.client_id) {
                        if let Err(e) = adapter.close_live_stream() {
                            log::warn!("Failed to close live stream: {}", e);
                        }
                    }
                }
                let now = Utc::now();
                if let Some(started) = started_at {
                    let seconds = (now - started).num_seconds().max(0);
                    if let Err(e) =
                        self.registry
                            .record_watch(channel.id, seconds, now.timestamp())
                    {
                        log::warn!("Failed to record watch statistics: {}", e);
                    }
                }
                log::info!("Live playback stopped on '{}'", channel.name);
            }
            Some(Source::Recording { client_id, .. }) => {
                if let Some(adapter) = self.clients.get(client_id) {
                    if let Err(e) = adapter.close_recorded_stream() {
                        log::warn!("Failed to close recorded stream: {}", e);
                    }
                }
            }
            None => {}
        }

        {
            let mut playback = self.playback();
            playback.state = PlaybackState::Idle;
            playback.signal = None;
            playback.position = 0;
        }
        self.registry.set_playing_channel(None);
        self.events.publish(PvrEvent::PlaybackStopped);
        Ok(())
    }

    /// Switch the live stream to another channel.
    ///
    /// In preview mode only the selected pointer moves; the backend call
    /// is deferred until the switch is confirmed with `preview == false`.
    pub fn switch_channel(&self, radio: bool, number: u32, preview: bool) -> Result<Channel> {
        let target = self
            .registry
            .get_channel_by_number(radio, number)
            .ok_or(PvrError::NoSuchChannel(number))?;

        if preview {
            self.playback().selected = Some((radio, number));
            return Ok(target);
        }

        let source = self.playback().source.clone();
        let current = match source {
            Some(Source::Live { channel, .. }) => channel,
            _ => {
                // Nothing live is open; a confirmed switch is an open
                self.open_live_stream(radio, number)?;
                return Ok(target);
            }
        };
        if current.id == target.id {
            self.playback().selected = Some((radio, number));
            return Ok(target);
        }

        // Same client and a tuner-backed target: retune in place
        if !target.is_virtual && !current.is_virtual && target.client_id == current.client_id {
            let adapter = self
                .clients
                .get(target.client_id)
                .ok_or(PvrError::ClientUnavailable(target.client_id))?;
            adapter.switch_channel(target.unique_id)?;

            let now = Utc::now();
            let started = self.playback().started_at.replace(now);
            if let Some(started) = started {
                let seconds = (now - started).num_seconds().max(0);
                if let Err(e) = self
                    .registry
                    .record_watch(current.id, seconds, now.timestamp())
                {
                    log::warn!("Failed to record watch statistics: {}", e);
                }
            }
            {
                let mut playback = self.playback();
                playback.source = Some(Source::Live {
                    channel: target.clone(),
                    direct: false,
                });
                playback.selected = Some((radio, number));
                playback.position = 0;
            }
            self.registry.set_playing_channel(Some(target.id));
            if let Err(e) = self.store().set_last_channel(&LastChannel {
                channel_id: target.id,
                number: target.number,
                name: target.name.clone(),
            }) {
                log::warn!("Failed to persist last channel: {}", e);
            }
            self.events.publish(PvrEvent::PlaybackStarted {
                channel_id: Some(target.id),
            });
            return Ok(target);
        }

        // Cross-client or virtual switch: full close and reopen
        self.close_stream()?;
        self.open_live_stream(radio, number)?;
        Ok(target)
    }

    /// Move to the next visible channel.
    pub fn channel_up(&self, preview: bool) -> Result<Channel> {
        self.step_channel(1, preview)
    }

    /// Move to the previous visible channel.
    pub fn channel_down(&self, preview: bool) -> Result<Channel> {
        self.step_channel(-1, preview)
    }

    fn step_channel(&self, steps: i64, preview: bool) -> Result<Channel> {
        let selected = self.playback().selected;
        let (radio, number) = match selected {
            Some(pointer) => pointer,
            None => self
                .playing_channel()
                .map(|c| (c.radio, c.number))
                .ok_or(PvrError::NotPlaying)?,
        };

        let target = self
            .registry
            .adjacent_channel(radio, number, steps)
            .ok_or(PvrError::NoSuchChannel(number))?;
        self.switch_channel(radio, target.number, preview)
    }

    /// Now/next guide entries for the currently selected channel, used
    /// by the zapping UI while previewing.
    pub fn selected_now_next(
        &self,
        now: DateTime<Utc>,
    ) -> Option<(Option<EpgEntry>, Option<EpgEntry>)> {
        let (radio, number) = self.playback().selected?;
        let channel = self.registry.get_channel_by_number(radio, number)?;
        Some((
            self.epg.get_now(channel.id, now),
            self.epg.get_next(channel.id, now),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{tv_channel, MockBackend, MockCalls};
    use crate::config::Config;
    use crate::store::Store;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn orchestrator_with_calls() -> (Arc<Orchestrator>, Arc<MockCalls>) {
        let store = Store::open_in_memory().unwrap();
        let orchestrator = Arc::new(Orchestrator::new(Config::default(), store));
        let backend = MockBackend::new("mock backend").with_channels(vec![
            tv_channel(1, 1, "One"),
            tv_channel(2, 2, "Two"),
            tv_channel(3, 3, "Three"),
        ]);
        let calls = Arc::clone(&backend.calls);
        orchestrator
            .register_client("mock backend", "guid-1", Box::new(backend))
            .unwrap();
        orchestrator.initialize().unwrap();
        (orchestrator, calls)
    }

    #[test]
    fn test_open_read_close_lifecycle() {
        let (orchestrator, _) = orchestrator_with_calls();

        let opened = orchestrator.open_live_stream(false, 1).unwrap();
        assert_eq!(opened, OpenedStream::Backend);
        assert_eq!(orchestrator.playback_state(), PlaybackState::Playing);
        assert!(orchestrator.signal_status(false).is_some());

        let mut buf = [0u8; 64];
        assert_eq!(orchestrator.read_stream(&mut buf).unwrap(), 64);
        assert_eq!(orchestrator.stream_position(), 64);

        orchestrator.close_stream().unwrap();
        assert_eq!(orchestrator.playback_state(), PlaybackState::Idle);
        assert!(orchestrator.registry().playing_channel().is_none());

        // Watch statistics were recorded for the session
        let channel = orchestrator
            .registry()
            .get_channel_by_number(false, 1)
            .unwrap();
        assert_eq!(channel.watch_count, 1);
    }

    #[test]
    fn test_preview_defers_backend_switch() {
        let (orchestrator, calls) = orchestrator_with_calls();
        orchestrator.open_live_stream(false, 1).unwrap();

        orchestrator.channel_up(true).unwrap();
        orchestrator.channel_up(true).unwrap();
        assert_eq!(calls.switch_channel.load(Ordering::SeqCst), 0);

        // Confirming performs exactly one backend switch
        let confirmed = orchestrator.switch_channel(false, 3, false).unwrap();
        assert_eq!(confirmed.number, 3);
        assert_eq!(calls.switch_channel.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.playing_channel().unwrap().number, 3);
    }

    #[test]
    fn test_last_channel_memory() {
        let (orchestrator, _) = orchestrator_with_calls();
        orchestrator.open_live_stream(false, 2).unwrap();
        orchestrator.close_stream().unwrap();

        let status = orchestrator.status(Utc::now());
        let last = status.previous_channel.unwrap();
        assert_eq!(last.number, 2);
        assert_eq!(last.name, "Two");
    }

    #[test]
    fn test_virtual_channel_opens_direct() {
        let (orchestrator, calls) = orchestrator_with_calls();
        orchestrator
            .registry()
            .add_virtual_channel("Cam", "http://example/cam", "mpegts", false)
            .unwrap();

        let opened = orchestrator.open_live_stream(false, 4).unwrap();
        assert_eq!(
            opened,
            OpenedStream::Direct {
                url: "http://example/cam".to_string(),
                input_format: "mpegts".to_string(),
            }
        );
        assert_eq!(calls.open_live.load(Ordering::SeqCst), 0);

        let mut buf = [0u8; 8];
        assert!(orchestrator.read_stream(&mut buf).is_err());
    }

    #[test]
    fn test_pause_requires_capability() {
        let store = Store::open_in_memory().unwrap();
        let orchestrator = Arc::new(Orchestrator::new(Config::default(), store));
        let mut backend =
            MockBackend::new("no pause").with_channels(vec![tv_channel(1, 1, "One")]);
        backend.capabilities.supports_pause = false;
        orchestrator
            .register_client("no pause", "guid-1", Box::new(backend))
            .unwrap();
        orchestrator.initialize().unwrap();

        orchestrator.open_live_stream(false, 1).unwrap();
        assert!(orchestrator.set_paused(true).is_err());
        assert_eq!(orchestrator.playback_state(), PlaybackState::Playing);
    }

    #[test]
    fn test_read_without_stream_fails() {
        let (orchestrator, _) = orchestrator_with_calls();
        let mut buf = [0u8; 8];
        assert!(matches!(
            orchestrator.read_stream(&mut buf),
            Err(PvrError::NotPlaying)
        ));
    }
}
