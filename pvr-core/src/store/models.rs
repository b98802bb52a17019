//! Store model definitions.

use serde::Serialize;

/// Backend client identity record.
#[derive(Debug, Clone, Serialize)]
pub struct ClientRecord {
    pub id: i64,
    pub name: String,
    pub guid: String,
}

/// Per-channel playback settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSettings {
    pub volume_amplification: f64,
    pub audio_stream: i32,
    pub subtitle_stream: i32,
    pub subtitles_on: bool,
    pub brightness: f64,
    pub contrast: f64,
    pub zoom_amount: f64,
    pub pixel_ratio: f64,
    pub view_mode: i32,
    pub audio_delay: f64,
    pub subtitle_delay: f64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            volume_amplification: 0.0,
            audio_stream: -1,
            subtitle_stream: -1,
            subtitles_on: false,
            brightness: 50.0,
            contrast: 50.0,
            zoom_amount: 1.0,
            pixel_ratio: 1.0,
            view_mode: 0,
            audio_delay: 0.0,
            subtitle_delay: 0.0,
        }
    }
}

/// Last played channel memory.
#[derive(Debug, Clone, Serialize)]
pub struct LastChannel {
    pub channel_id: i64,
    pub number: u32,
    pub name: String,
}

/// Result of reconciling a fresh channel list into the store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileResult {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ReconcileResult {
    pub fn total_changes(&self) -> usize {
        self.inserted + self.updated + self.removed
    }
}

/// Result of persisting a batch of guide entries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GuidePersistResult {
    pub saved: usize,
    pub failed: usize,
}
