//! Configuration file format and resolved runtime settings.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Deserialize;

use crate::timers::TimerMargins;

/// Configuration file format (TOML). Every field is optional; CLI
/// arguments win over file values, file values win over defaults.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub updates: UpdatesSection,
    #[serde(default)]
    pub timers: TimersSection,
    #[serde(default)]
    pub epg: EpgSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct StoreSection {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingSection {
    pub log_dir: Option<String>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdatesSection {
    pub channels_interval_secs: Option<u64>,
    pub recordings_interval_secs: Option<u64>,
    pub epg_interval_secs: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TimersSection {
    pub start_margin_mins: Option<i64>,
    pub stop_margin_mins: Option<i64>,
    pub instant_duration_mins: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EpgSection {
    pub linger_hours: Option<i64>,
    pub window_hours: Option<i64>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Cadence of the background update loop's tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateIntervals {
    pub tv_channels: StdDuration,
    pub radio_channels: StdDuration,
    pub recordings: StdDuration,
    pub epg: StdDuration,
    pub epg_cleanup: StdDuration,
    /// How often the loop wakes to check task due times.
    pub tick: StdDuration,
}

impl Default for UpdateIntervals {
    fn default() -> Self {
        Self {
            tv_channels: StdDuration::from_secs(600),
            radio_channels: StdDuration::from_secs(600),
            recordings: StdDuration::from_secs(300),
            epg: StdDuration::from_secs(1800),
            epg_cleanup: StdDuration::from_secs(3600),
            tick: StdDuration::from_secs(5),
        }
    }
}

/// Timer creation defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub margins: TimerMargins,
    pub instant_duration: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            margins: TimerMargins::default(),
            instant_duration: Duration::minutes(120),
        }
    }
}

/// Guide retention and grab window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpgSettings {
    /// Retention after a broadcast ended before its entry is purged.
    pub linger: Duration,
    /// How far ahead each grab reaches.
    pub window: Duration,
}

impl Default for EpgSettings {
    fn default() -> Self {
        Self {
            linger: Duration::hours(24),
            window: Duration::hours(24),
        }
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub store_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_retention_days: u64,
    pub log_level: Option<String>,
    pub updates: UpdateIntervals,
    pub timers: TimerSettings,
    pub epg: EpgSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("pvr.db"),
            log_dir: PathBuf::from("logs"),
            log_retention_days: 7,
            log_level: None,
            updates: UpdateIntervals::default(),
            timers: TimerSettings::default(),
            epg: EpgSettings::default(),
        }
    }
}

impl Config {
    /// Apply a parsed configuration file over the defaults.
    pub fn from_file(file: &ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(path) = &file.store.path {
            config.store_path = PathBuf::from(path);
        }
        if let Some(dir) = &file.logging.log_dir {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(days) = file.logging.retention_days {
            config.log_retention_days = days;
        }
        if let Some(level) = &file.logging.level {
            config.log_level = Some(level.clone());
        }

        if let Some(secs) = file.updates.channels_interval_secs {
            config.updates.tv_channels = StdDuration::from_secs(secs);
            config.updates.radio_channels = StdDuration::from_secs(secs);
        }
        if let Some(secs) = file.updates.recordings_interval_secs {
            config.updates.recordings = StdDuration::from_secs(secs);
        }
        if let Some(secs) = file.updates.epg_interval_secs {
            config.updates.epg = StdDuration::from_secs(secs);
        }
        if let Some(secs) = file.updates.cleanup_interval_secs {
            config.updates.epg_cleanup = StdDuration::from_secs(secs);
        }

        if let Some(mins) = file.timers.start_margin_mins {
            config.timers.margins.start = Duration::minutes(mins);
        }
        if let Some(mins) = file.timers.stop_margin_mins {
            config.timers.margins.stop = Duration::minutes(mins);
        }
        if let Some(mins) = file.timers.instant_duration_mins {
            config.timers.instant_duration = Duration::minutes(mins);
        }

        if let Some(hours) = file.epg.linger_hours {
            config.epg.linger = Duration::hours(hours);
        }
        if let Some(hours) = file.epg.window_hours {
            config.epg.window = Duration::hours(hours);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_keeps_defaults() {
        let file: ConfigFile = toml::from_str("").unwrap();
        let config = Config::from_file(&file);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_sections_override_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [store]
            path = "/var/lib/pvr/pvr.db"

            [updates]
            epg_interval_secs = 900

            [timers]
            start_margin_mins = 10

            [epg]
            linger_hours = 48
            "#,
        )
        .unwrap();
        let config = Config::from_file(&file);

        assert_eq!(config.store_path, PathBuf::from("/var/lib/pvr/pvr.db"));
        assert_eq!(config.updates.epg, StdDuration::from_secs(900));
        assert_eq!(config.timers.margins.start, Duration::minutes(10));
        assert_eq!(config.timers.margins.stop, Duration::minutes(5));
        assert_eq!(config.epg.linger, Duration::hours(48));
    }
}
