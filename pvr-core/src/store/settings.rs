//! Per-channel playback settings and last-channel memory.

use super::{ChannelSettings, LastChannel, Result, Store};
use rusqlite::params;

impl Store {
    /// Stored playback settings for a channel, if any were persisted.
    pub fn get_channel_settings(&self, channel_id: i64) -> Result<Option<ChannelSettings>> {
        let mut stmt = self.conn.prepare(
            "SELECT volume_amplification, audio_stream, subtitle_stream, subtitles_on,
                    brightness, contrast, zoom_amount, pixel_ratio, view_mode,
                    audio_delay, subtitle_delay
             FROM channel_settings WHERE channel_id = ?1",
        )?;

        let result = stmt.query_row([channel_id], |row| {
            Ok(ChannelSettings {
                volume_amplification: row.get(0)?,
                audio_stream: row.get(1)?,
                subtitle_stream: row.get(2)?,
                subtitles_on: row.get::<_, i32>(3)? != 0,
                brightness: row.get(4)?,
                contrast: row.get(5)?,
                zoom_amount: row.get(6)?,
                pixel_ratio: row.get(7)?,
                view_mode: row.get(8)?,
                audio_delay: row.get(9)?,
                subtitle_delay: row.get(10)?,
            })
        });

        match result {
            Ok(settings) => Ok(Some(settings)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist playback settings for a channel.
    pub fn persist_channel_settings(
        &self,
        channel_id: i64,
        settings: &ChannelSettings,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO channel_settings (
                channel_id, volume_amplification, audio_stream, subtitle_stream,
                subtitles_on, brightness, contrast, zoom_amount, pixel_ratio,
                view_mode, audio_delay, subtitle_delay
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                channel_id,
                settings.volume_amplification,
                settings.audio_stream,
                settings.subtitle_stream,
                settings.subtitles_on as i32,
                settings.brightness,
                settings.contrast,
                settings.zoom_amount,
                settings.pixel_ratio,
                settings.view_mode,
                settings.audio_delay,
                settings.subtitle_delay,
            ],
        )?;
        Ok(())
    }

    /// The channel that was playing when playback last stopped.
    pub fn get_last_channel(&self) -> Result<Option<LastChannel>> {
        let result = self.conn.query_row(
            "SELECT channel_id, number, name FROM last_channel WHERE id = 1",
            [],
            |row| {
                Ok(LastChannel {
                    channel_id: row.get(0)?,
                    number: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        );

        match result {
            Ok(last) => Ok(Some(last)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_last_channel(&self, last: &LastChannel) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO last_channel (id, channel_id, number, name)
             VALUES (1, ?1, ?2, ?3)",
            params![last.channel_id, last.number, last.name],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let client_id = store.get_or_create_client("backend", "guid").unwrap();
        let ch = crate::channels::Channel::from_entry(
            client_id,
            &pvr_api::ChannelEntry {
                unique_id: 1,
                number: 1,
                name: "One".to_string(),
                ..pvr_api::ChannelEntry::default()
            },
        );
        let ch_id = store.add_channel(&ch).unwrap();

        assert!(store.get_channel_settings(ch_id).unwrap().is_none());

        let settings = ChannelSettings {
            volume_amplification: 3.5,
            subtitles_on: true,
            view_mode: 2,
            ..ChannelSettings::default()
        };
        store.persist_channel_settings(ch_id, &settings).unwrap();

        let stored = store.get_channel_settings(ch_id).unwrap().unwrap();
        assert_eq!(stored, settings);
    }

    #[test]
    fn test_last_channel_single_row() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_last_channel().unwrap().is_none());

        store
            .set_last_channel(&LastChannel {
                channel_id: 5,
                number: 3,
                name: "Three".to_string(),
            })
            .unwrap();
        store
            .set_last_channel(&LastChannel {
                channel_id: 9,
                number: 7,
                name: "Seven".to_string(),
            })
            .unwrap();

        let last = store.get_last_channel().unwrap().unwrap();
        assert_eq!(last.channel_id, 9);
        assert_eq!(last.number, 7);
    }
}
