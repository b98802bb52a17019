//! Channel CRUD operations.

use super::{ReconcileResult, Result, Store};
use crate::channels::{Channel, Grabber};
use rusqlite::params;
use std::collections::HashSet;

impl Store {
    /// Insert a new channel and return its store-assigned id.
    pub fn add_channel(&self, channel: &Channel) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO channels (
                client_id, unique_id, number, client_number, name, client_name,
                icon_path, group_id, encryption, radio, hidden, grab_epg, grabber,
                is_virtual, input_format, stream_url, watch_count, watch_seconds,
                last_watched
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                channel.client_id,
                channel.unique_id,
                channel.number,
                channel.client_number,
                channel.name,
                channel.client_name,
                channel.icon_path,
                channel.group_id,
                channel.encryption_system as i32,
                channel.radio as i32,
                channel.hidden as i32,
                channel.grab_epg as i32,
                channel.grabber.selector(),
                channel.is_virtual as i32,
                channel.input_format,
                channel.stream_url,
                channel.watch_count,
                channel.watch_seconds,
                channel.last_watched,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update all mutable fields of a stored channel.
    pub fn update_channel(&self, channel: &Channel) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE channels SET
                number = ?2, client_number = ?3, name = ?4, client_name = ?5,
                icon_path = ?6, group_id = ?7, encryption = ?8, hidden = ?9,
                grab_epg = ?10, grabber = ?11, input_format = ?12, stream_url = ?13,
                watch_count = ?14, watch_seconds = ?15, last_watched = ?16
             WHERE id = ?1",
            params![
                channel.id,
                channel.number,
                channel.client_number,
                channel.name,
                channel.client_name,
                channel.icon_path,
                channel.group_id,
                channel.encryption_system as i32,
                channel.hidden as i32,
                channel.grab_epg as i32,
                channel.grabber.selector(),
                channel.input_format,
                channel.stream_url,
                channel.watch_count,
                channel.watch_seconds,
                channel.last_watched,
            ],
        )?;

        if affected == 0 {
            return Err(super::StoreError::ChannelNotFound(channel.id));
        }
        Ok(())
    }

    /// Get all channels of one kind, ordered by display number.
    pub fn get_channels(&self, radio: bool) -> Result<Vec<Channel>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM channels WHERE radio = ?1 ORDER BY number, id",
        )?;

        let records = stmt
            .query_map([radio as i32], Self::row_to_channel)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Get one channel by store id.
    pub fn get_channel(&self, channel_id: i64) -> Result<Option<Channel>> {
        let mut stmt = self.conn.prepare("SELECT * FROM channels WHERE id = ?1")?;
        let result = stmt.query_row([channel_id], Self::row_to_channel);

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get one channel by its provider key.
    pub fn get_channel_by_provider_key(
        &self,
        client_id: i64,
        unique_id: u32,
    ) -> Result<Option<Channel>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM channels WHERE client_id = ?1 AND unique_id = ?2")?;
        let result = stmt.query_row(params![client_id, unique_id], Self::row_to_channel);

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a channel. Guide data follows through the foreign key.
    pub fn remove_channel(&self, channel_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM channels WHERE id = ?1", [channel_id])?;
        Ok(())
    }

    /// Record a finished viewing session on a channel.
    pub fn update_watch_stats(&self, channel_id: i64, seconds: i64, watched_at: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE channels SET
                watch_count = watch_count + 1,
                watch_seconds = watch_seconds + ?2,
                last_watched = ?3
             WHERE id = ?1",
            params![channel_id, seconds, watched_at],
        )?;
        Ok(())
    }

    /// Reconcile a fresh enumeration of one kind into the store.
    ///
    /// Stored channels are matched by provider key (client_id, unique_id).
    /// Matched channels absorb the provider-mutable fields and keep their
    /// id; unmatched fresh channels are inserted. A stored channel missing
    /// from `fresh` is removed only when its client is in `scanned` (the
    /// clients whose enumeration produced `fresh`); channels of a client
    /// that failed its scan keep their rows, and virtual channels, which
    /// no client reports, are never removed. Running this twice with the
    /// same input is a no-op the second time.
    pub fn reconcile_channels(
        &mut self,
        radio: bool,
        fresh: &[Channel],
        scanned: &HashSet<i64>,
    ) -> Result<ReconcileResult> {
        let stored = self.get_channels(radio)?;
        let mut result = ReconcileResult::default();

        let fresh_keys: HashSet<(i64, u32)> = fresh.iter().map(|c| c.provider_key()).collect();

        let tx = self.conn.transaction()?;

        let mut matched_keys: HashSet<(i64, u32)> = HashSet::new();
        for mut existing in stored {
            if existing.is_virtual {
                continue;
            }
            let key = existing.provider_key();
            if fresh_keys.contains(&key) {
                let incoming = fresh
                    .iter()
                    .find(|c| c.provider_key() == key)
                    .cloned()
                    .unwrap_or_else(|| existing.clone());
                let before = existing.clone();
                existing.absorb(&incoming);
                matched_keys.insert(key);

                if existing != before {
                    tx.execute(
                        "UPDATE channels SET
                            client_number = ?2, client_name = ?3, icon_path = ?4,
                            encryption = ?5, stream_url = ?6, input_format = ?7
                         WHERE id = ?1",
                        params![
                            existing.id,
                            existing.client_number,
                            existing.client_name,
                            existing.icon_path,
                            existing.encryption_system as i32,
                            existing.stream_url,
                            existing.input_format,
                        ],
                    )?;
                    result.updated += 1;
                }
            } else if scanned.contains(&existing.client_id) {
                tx.execute("DELETE FROM channels WHERE id = ?1", [existing.id])?;
                result.removed += 1;
            }
        }

        for incoming in fresh {
            if matched_keys.contains(&incoming.provider_key()) {
                continue;
            }
            tx.execute(
                "INSERT INTO channels (
                    client_id, unique_id, number, client_number, name, client_name,
                    icon_path, group_id, encryption, radio, hidden, grab_epg, grabber,
                    is_virtual, input_format, stream_url
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    incoming.client_id,
                    incoming.unique_id,
                    incoming.number,
                    incoming.client_number,
                    incoming.name,
                    incoming.client_name,
                    incoming.icon_path,
                    incoming.group_id,
                    incoming.encryption_system as i32,
                    incoming.radio as i32,
                    incoming.hidden as i32,
                    incoming.grab_epg as i32,
                    incoming.grabber.selector(),
                    incoming.is_virtual as i32,
                    incoming.input_format,
                    incoming.stream_url,
                ],
            )?;
            result.inserted += 1;
        }

        tx.commit()?;
        Ok(result)
    }

    /// Persist display numbers for a set of channels in one transaction.
    pub fn persist_channel_numbers(&mut self, numbers: &[(i64, u32)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (channel_id, number) in numbers {
            tx.execute(
                "UPDATE channels SET number = ?2 WHERE id = ?1",
                params![channel_id, number],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Helper: Convert a row to Channel.
    fn row_to_channel(row: &rusqlite::Row) -> rusqlite::Result<Channel> {
        let grabber: String = row.get("grabber")?;
        Ok(Channel {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            unique_id: row.get("unique_id")?,
            number: row.get("number")?,
            client_number: row.get("client_number")?,
            name: row.get("name")?,
            client_name: row.get("client_name")?,
            icon_path: row.get("icon_path")?,
            group_id: row.get("group_id")?,
            encryption_system: row.get::<_, i32>("encryption")? as u16,
            radio: row.get::<_, i32>("radio")? != 0,
            hidden: row.get::<_, i32>("hidden")? != 0,
            recording: false,
            grab_epg: row.get::<_, i32>("grab_epg")? != 0,
            grabber: Grabber::from_selector(&grabber),
            is_virtual: row.get::<_, i32>("is_virtual")? != 0,
            stream_url: row.get("stream_url")?,
            input_format: row.get("input_format")?,
            watch_count: row.get("watch_count")?,
            watch_seconds: row.get("watch_seconds")?,
            last_watched: row.get("last_watched")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_channel(client_id: i64, unique_id: u32, number: u32) -> Channel {
        let entry = pvr_api::ChannelEntry {
            unique_id,
            number,
            name: format!("Channel {}", unique_id),
            ..pvr_api::ChannelEntry::default()
        };
        Channel::from_entry(client_id, &entry)
    }

    fn test_store_with_client() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let client_id = store.get_or_create_client("test backend", "guid-1").unwrap();
        (store, client_id)
    }

    #[test]
    fn test_add_and_get_roundtrip() {
        let (store, client_id) = test_store_with_client();

        let mut channel = test_channel(client_id, 100, 1);
        channel.icon_path = "special://icons/100.png".to_string();
        channel.encryption_system = 0x0604;
        channel.grab_epg = false;
        channel.grabber = Grabber::Scraper("xmltv".to_string());

        let id = store.add_channel(&channel).unwrap();
        assert!(id > 0);
        channel.id = id;

        let listed = store.get_channels(false).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], channel);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let (mut store, client_id) = test_store_with_client();
        let scanned = HashSet::from([client_id]);

        let fresh = vec![
            test_channel(client_id, 1, 1),
            test_channel(client_id, 2, 2),
            test_channel(client_id, 3, 3),
        ];

        let first = store.reconcile_channels(false, &fresh, &scanned).unwrap();
        assert_eq!(first.inserted, 3);

        let second = store.reconcile_channels(false, &fresh, &scanned).unwrap();
        assert_eq!(second.total_changes(), 0);

        let stored = store.get_channels(false).unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[test]
    fn test_reconcile_removes_missing_and_inserts_new() {
        let (mut store, client_id) = test_store_with_client();
        let scanned = HashSet::from([client_id]);

        let initial = vec![
            test_channel(client_id, 1, 1),
            test_channel(client_id, 2, 2),
            test_channel(client_id, 3, 3),
        ];
        store.reconcile_channels(false, &initial, &scanned).unwrap();

        // 2 disappears, 4 appears, 1 changes its provider number
        let mut changed = test_channel(client_id, 1, 9);
        changed.client_name = "Channel 1 HD".to_string();
        let fresh = vec![
            changed,
            test_channel(client_id, 3, 3),
            test_channel(client_id, 4, 4),
        ];

        let result = store.reconcile_channels(false, &fresh, &scanned).unwrap();
        assert_eq!(result.inserted, 1);
        assert_eq!(result.updated, 1);
        assert_eq!(result.removed, 1);

        assert!(store.get_channel_by_provider_key(client_id, 2).unwrap().is_none());
        let kept = store
            .get_channel_by_provider_key(client_id, 1)
            .unwrap()
            .unwrap();
        assert_eq!(kept.client_number, 9);
        assert_eq!(kept.client_name, "Channel 1 HD");
    }

    #[test]
    fn test_reconcile_keeps_virtual_channels() {
        let (mut store, client_id) = test_store_with_client();

        let v = Channel::new_virtual("Webcam", "http://example/cam", "mpegts", false);
        store.add_channel(&v).unwrap();
        store
            .reconcile_channels(
                false,
                &[test_channel(client_id, 1, 1)],
                &HashSet::from([client_id]),
            )
            .unwrap();

        let stored = store.get_channels(false).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().any(|c| c.is_virtual));
    }

    #[test]
    fn test_reconcile_keeps_channels_of_unscanned_client() {
        let (mut store, client_a) = test_store_with_client();
        let client_b = store.get_or_create_client("other backend", "guid-2").unwrap();

        store
            .reconcile_channels(
                false,
                &[
                    test_channel(client_a, 1, 1),
                    test_channel(client_b, 10, 1),
                    test_channel(client_b, 11, 2),
                ],
                &HashSet::from([client_a, client_b]),
            )
            .unwrap();

        // Only client A produced a scan this time; B's rows must survive
        let result = store
            .reconcile_channels(false, &[test_channel(client_a, 1, 1)], &HashSet::from([client_a]))
            .unwrap();
        assert_eq!(result.removed, 0);
        assert_eq!(store.get_channels(false).unwrap().len(), 3);

        // Once B scans again and no longer reports 11, that row goes
        let result = store
            .reconcile_channels(
                false,
                &[test_channel(client_a, 1, 1), test_channel(client_b, 10, 1)],
                &HashSet::from([client_a, client_b]),
            )
            .unwrap();
        assert_eq!(result.removed, 1);
        assert!(store.get_channel_by_provider_key(client_b, 11).unwrap().is_none());
    }

    #[test]
    fn test_watch_stats() {
        let (store, client_id) = test_store_with_client();
        let id = store.add_channel(&test_channel(client_id, 1, 1)).unwrap();

        store.update_watch_stats(id, 1800, 1_700_000_000).unwrap();
        store.update_watch_stats(id, 600, 1_700_010_000).unwrap();

        let ch = store.get_channel(id).unwrap().unwrap();
        assert_eq!(ch.watch_count, 2);
        assert_eq!(ch.watch_seconds, 2400);
        assert_eq!(ch.last_watched, Some(1_700_010_000));
    }
}
