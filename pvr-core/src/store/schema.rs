//! Database schema definitions.

/// SQL schema for the DVR database.
pub const SCHEMA_SQL: &str = r#"
-- Backend client identity table
CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    guid TEXT UNIQUE NOT NULL,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Channel table
CREATE TABLE IF NOT EXISTS channels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL,
    -- Provider key: unique per (client_id, unique_id)
    unique_id INTEGER NOT NULL,
    -- Logical display number (0 = no number assigned / hidden)
    number INTEGER NOT NULL DEFAULT 0,
    -- Provider-reported channel number
    client_number INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL DEFAULT '',
    client_name TEXT NOT NULL DEFAULT '',
    icon_path TEXT NOT NULL DEFAULT '',
    -- Group membership (0 = ungrouped)
    group_id INTEGER NOT NULL DEFAULT 0,
    -- Conditional-access system id (0 = free to air)
    encryption INTEGER NOT NULL DEFAULT 0,
    radio INTEGER NOT NULL DEFAULT 0,
    hidden INTEGER NOT NULL DEFAULT 0,
    -- Guide configuration
    grab_epg INTEGER NOT NULL DEFAULT 1,
    grabber TEXT NOT NULL DEFAULT 'client',
    -- User-defined channels backed by a stream URL
    is_virtual INTEGER NOT NULL DEFAULT 0,
    input_format TEXT NOT NULL DEFAULT '',
    stream_url TEXT NOT NULL DEFAULT '',
    -- Watch statistics
    watch_count INTEGER NOT NULL DEFAULT 0,
    watch_seconds INTEGER NOT NULL DEFAULT 0,
    last_watched INTEGER,
    created_at INTEGER DEFAULT (strftime('%s', 'now')),
    updated_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Provider key is unique per client; virtual channels carry no provider
-- key and are exempt
CREATE UNIQUE INDEX IF NOT EXISTS idx_channels_provider_key
    ON channels(client_id, unique_id) WHERE is_virtual = 0;

-- Guide data table, one row per broadcast
CREATE TABLE IF NOT EXISTS guide_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    broadcast_id INTEGER NOT NULL,
    channel_id INTEGER NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    plot_outline TEXT NOT NULL DEFAULT '',
    plot TEXT NOT NULL DEFAULT '',
    genre_type INTEGER NOT NULL DEFAULT 0,
    genre_sub_type INTEGER NOT NULL DEFAULT 0,
    first_aired TEXT,
    parental_rating INTEGER NOT NULL DEFAULT 0,
    star_rating INTEGER NOT NULL DEFAULT 0,
    series_number INTEGER NOT NULL DEFAULT -1,
    episode_number INTEGER NOT NULL DEFAULT -1,
    episode_part INTEGER NOT NULL DEFAULT -1,
    episode_name TEXT NOT NULL DEFAULT '',
    UNIQUE(channel_id, start_time),
    FOREIGN KEY(channel_id) REFERENCES channels(id) ON DELETE CASCADE
);

-- Channel group tables, one set for TV and one for radio
CREATE TABLE IF NOT EXISTS channel_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS radio_channel_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0
);

-- Per-channel playback settings
CREATE TABLE IF NOT EXISTS channel_settings (
    channel_id INTEGER PRIMARY KEY,
    volume_amplification REAL NOT NULL DEFAULT 0.0,
    audio_stream INTEGER NOT NULL DEFAULT -1,
    subtitle_stream INTEGER NOT NULL DEFAULT -1,
    subtitles_on INTEGER NOT NULL DEFAULT 0,
    brightness REAL NOT NULL DEFAULT 50.0,
    contrast REAL NOT NULL DEFAULT 50.0,
    zoom_amount REAL NOT NULL DEFAULT 1.0,
    pixel_ratio REAL NOT NULL DEFAULT 1.0,
    view_mode INTEGER NOT NULL DEFAULT 0,
    audio_delay REAL NOT NULL DEFAULT 0.0,
    subtitle_delay REAL NOT NULL DEFAULT 0.0,
    FOREIGN KEY(channel_id) REFERENCES channels(id) ON DELETE CASCADE
);

-- Last played channel (single row)
CREATE TABLE IF NOT EXISTS last_channel (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    channel_id INTEGER NOT NULL,
    number INTEGER NOT NULL,
    name TEXT NOT NULL DEFAULT ''
);

-- Last full guide scan timestamp (single row)
CREATE TABLE IF NOT EXISTS last_epg_scan (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    scan_time INTEGER NOT NULL
);

-- Indexes for efficient queries
CREATE INDEX IF NOT EXISTS idx_channels_client ON channels(client_id);
CREATE INDEX IF NOT EXISTS idx_channels_radio_hidden ON channels(radio, hidden);
CREATE INDEX IF NOT EXISTS idx_channels_group ON channels(group_id);
CREATE INDEX IF NOT EXISTS idx_guide_channel_start ON guide_data(channel_id, start_time);
CREATE INDEX IF NOT EXISTS idx_guide_end ON guide_data(end_time);

-- Trigger to update updated_at on channels
CREATE TRIGGER IF NOT EXISTS channels_updated_at
AFTER UPDATE ON channels
BEGIN
    UPDATE channels SET updated_at = strftime('%s', 'now') WHERE id = NEW.id;
END;
"#;
