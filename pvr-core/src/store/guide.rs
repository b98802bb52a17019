//! Guide data storage.

use super::{GuidePersistResult, Result, Store};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pvr_api::EpgEntry;
use rusqlite::params;

impl Store {
    /// Upsert one guide entry, keyed on (channel_id, start_time).
    pub fn save_guide_entry(&self, channel_id: i64, entry: &EpgEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO guide_data (
                broadcast_id, channel_id, start_time, end_time, title,
                plot_outline, plot, genre_type, genre_sub_type, first_aired,
                parental_rating, star_rating, series_number, episode_number,
                episode_part, episode_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(channel_id, start_time) DO UPDATE SET
                broadcast_id = excluded.broadcast_id,
                end_time = excluded.end_time,
                title = excluded.title,
                plot_outline = excluded.plot_outline,
                plot = excluded.plot,
                genre_type = excluded.genre_type,
                genre_sub_type = excluded.genre_sub_type,
                first_aired = excluded.first_aired,
                parental_rating = excluded.parental_rating,
                star_rating = excluded.star_rating,
                series_number = excluded.series_number,
                episode_number = excluded.episode_number,
                episode_part = excluded.episode_part,
                episode_name = excluded.episode_name",
            params![
                entry.broadcast_id,
                channel_id,
                entry.start_time.timestamp(),
                entry.end_time.timestamp(),
                entry.title,
                entry.plot_outline,
                entry.plot,
                entry.genre_type,
                entry.genre_sub_type,
                entry.first_aired.map(|d| d.to_string()),
                entry.parental_rating,
                entry.star_rating,
                entry.series_number,
                entry.episode_number,
                entry.episode_part,
                entry.episode_name,
            ],
        )?;
        Ok(())
    }

    /// Persist a batch of guide entries for one channel.
    ///
    /// A single record failing to save is logged and skipped; the rest of
    /// the batch still goes through.
    pub fn save_guide_entries(&self, channel_id: i64, entries: &[EpgEntry]) -> GuidePersistResult {
        let mut result = GuidePersistResult::default();
        for entry in entries {
            match self.save_guide_entry(channel_id, entry) {
                Ok(()) => result.saved += 1,
                Err(e) => {
                    log::warn!(
                        "Failed to persist guide entry '{}' for channel {}: {}",
                        entry.title,
                        channel_id,
                        e
                    );
                    result.failed += 1;
                }
            }
        }
        result
    }

    /// All guide entries for one channel overlapping `[start, end)`,
    /// ordered by start time.
    pub fn get_guide_window(
        &self,
        channel_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EpgEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM guide_data
             WHERE channel_id = ?1 AND end_time > ?2 AND start_time < ?3
             ORDER BY start_time",
        )?;

        let records = stmt
            .query_map(
                params![channel_id, start.timestamp(), end.timestamp()],
                Self::row_to_guide_entry,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// All guide entries for one channel, ordered by start time.
    pub fn get_guide_entries(&self, channel_id: i64) -> Result<Vec<EpgEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM guide_data WHERE channel_id = ?1 ORDER BY start_time",
        )?;

        let records = stmt
            .query_map([channel_id], Self::row_to_guide_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Whether stored entries already span the requested window, so the
    /// backend does not need to be contacted.
    ///
    /// The overlapping entries must chain without a gap: each entry has
    /// to start at or before the point covered so far. Covered edges with
    /// a hole in the middle do not count.
    pub fn guide_window_covered(
        &self,
        channel_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        let mut stmt = self.conn.prepare(
            "SELECT start_time, end_time FROM guide_data
             WHERE channel_id = ?1 AND end_time > ?2 AND start_time < ?3
             ORDER BY start_time",
        )?;

        let spans = stmt
            .query_map(
                params![channel_id, start.timestamp(), end.timestamp()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )?
            .collect::<std::result::Result<Vec<(i64, i64)>, _>>()?;

        let mut covered_to = start.timestamp();
        for (entry_start, entry_end) in spans {
            if entry_start > covered_to {
                return Ok(false);
            }
            covered_to = covered_to.max(entry_end);
            if covered_to >= end.timestamp() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Delete one guide entry by its (channel_id, start_time) key.
    pub fn remove_guide_entry(&self, channel_id: i64, start: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "DELETE FROM guide_data WHERE channel_id = ?1 AND start_time = ?2",
            params![channel_id, start.timestamp()],
        )?;
        Ok(())
    }

    /// Purge guide entries whose end time is older than `cutoff`.
    /// Returns how many were removed.
    pub fn purge_guide_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM guide_data WHERE end_time < ?1",
            [cutoff.timestamp()],
        )?;
        Ok(removed)
    }

    /// Erase all guide entries for one channel.
    pub fn erase_guide_for_channel(&self, channel_id: i64) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM guide_data WHERE channel_id = ?1", [channel_id])?;
        Ok(removed)
    }

    /// Helper: Convert a row to EpgEntry.
    fn row_to_guide_entry(row: &rusqlite::Row) -> rusqlite::Result<EpgEntry> {
        let first_aired: Option<String> = row.get("first_aired")?;
        Ok(EpgEntry {
            broadcast_id: row.get("broadcast_id")?,
            title: row.get("title")?,
            plot_outline: row.get("plot_outline")?,
            plot: row.get("plot")?,
            start_time: Utc
                .timestamp_opt(row.get::<_, i64>("start_time")?, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end_time: Utc
                .timestamp_opt(row.get::<_, i64>("end_time")?, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            genre_type: row.get("genre_type")?,
            genre_sub_type: row.get("genre_sub_type")?,
            parental_rating: row.get("parental_rating")?,
            star_rating: row.get("star_rating")?,
            series_number: row.get("series_number")?,
            episode_number: row.get("episode_number")?,
            episode_part: row.get("episode_part")?,
            episode_name: row.get("episode_name")?,
            first_aired: first_aired.and_then(|s| s.parse::<NaiveDate>().ok()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(id: u32, start: DateTime<Utc>, minutes: i64, title: &str) -> EpgEntry {
        EpgEntry {
            broadcast_id: id,
            title: title.to_string(),
            plot_outline: String::new(),
            plot: String::new(),
            start_time: start,
            end_time: start + Duration::minutes(minutes),
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

    fn store_with_channel() -> (Store, i64) {
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
        (store, ch_id)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_save_and_window_query() {
        let (store, ch_id) = store_with_channel();

        let entries = vec![
            entry(1, t0(), 30, "News"),
            entry(2, t0() + Duration::minutes(30), 60, "Film"),
            entry(3, t0() + Duration::minutes(90), 30, "Weather"),
        ];
        let result = store.save_guide_entries(ch_id, &entries);
        assert_eq!(result.saved, 3);
        assert_eq!(result.failed, 0);

        let window = store
            .get_guide_window(ch_id, t0() + Duration::minutes(15), t0() + Duration::minutes(45))
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].title, "News");
        assert_eq!(window[1].title, "Film");
    }

    #[test]
    fn test_upsert_replaces_on_same_start() {
        let (store, ch_id) = store_with_channel();

        store.save_guide_entry(ch_id, &entry(1, t0(), 30, "Old title")).unwrap();
        store.save_guide_entry(ch_id, &entry(1, t0(), 45, "New title")).unwrap();

        let all = store.get_guide_entries(ch_id).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "New title");
        assert_eq!(all[0].end_time, t0() + Duration::minutes(45));
    }

    #[test]
    fn test_window_covered() {
        let (store, ch_id) = store_with_channel();
        store.save_guide_entry(ch_id, &entry(1, t0(), 120, "Long show")).unwrap();

        assert!(store
            .guide_window_covered(ch_id, t0() + Duration::minutes(10), t0() + Duration::minutes(100))
            .unwrap());
        assert!(!store
            .guide_window_covered(ch_id, t0() - Duration::minutes(10), t0() + Duration::minutes(60))
            .unwrap());
        assert!(!store
            .guide_window_covered(ch_id, t0() + Duration::hours(5), t0() + Duration::hours(6))
            .unwrap());
    }

    #[test]
    fn test_window_with_internal_gap_is_not_covered() {
        let (store, ch_id) = store_with_channel();

        // Both edges of the window are covered but the middle is a hole
        store.save_guide_entry(ch_id, &entry(1, t0(), 30, "Edge A")).unwrap();
        store
            .save_guide_entry(ch_id, &entry(2, t0() + Duration::minutes(90), 30, "Edge B"))
            .unwrap();
        assert!(!store
            .guide_window_covered(ch_id, t0(), t0() + Duration::minutes(120))
            .unwrap());

        // Filling the hole makes the chain contiguous
        store
            .save_guide_entry(ch_id, &entry(3, t0() + Duration::minutes(30), 60, "Middle"))
            .unwrap();
        assert!(store
            .guide_window_covered(ch_id, t0(), t0() + Duration::minutes(120))
            .unwrap());
    }

    #[test]
    fn test_purge_before_cutoff() {
        let (store, ch_id) = store_with_channel();

        store.save_guide_entry(ch_id, &entry(1, t0(), 30, "Past")).unwrap();
        store
            .save_guide_entry(ch_id, &entry(2, t0() + Duration::hours(5), 30, "Future"))
            .unwrap();

        let removed = store.purge_guide_before(t0() + Duration::hours(1)).unwrap();
        assert_eq!(removed, 1);

        let remaining = store.get_guide_entries(ch_id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "Future");
    }

    #[test]
    fn test_erase_for_channel() {
        let (store, ch_id) = store_with_channel();
        store.save_guide_entry(ch_id, &entry(1, t0(), 30, "A")).unwrap();
        store
            .save_guide_entry(ch_id, &entry(2, t0() + Duration::minutes(30), 30, "B"))
            .unwrap();

        assert_eq!(store.erase_guide_for_channel(ch_id).unwrap(), 2);
        assert!(store.get_guide_entries(ch_id).unwrap().is_empty());
    }

    #[test]
    fn test_first_aired_roundtrip() {
        let (store, ch_id) = store_with_channel();
        let mut e = entry(1, t0(), 30, "Pilot");
        e.first_aired = NaiveDate::from_ymd_opt(2001, 9, 9);
        store.save_guide_entry(ch_id, &e).unwrap();

        let stored = store.get_guide_entries(ch_id).unwrap();
        assert_eq!(stored[0].first_aired, NaiveDate::from_ymd_opt(2001, 9, 9));
    }
}
