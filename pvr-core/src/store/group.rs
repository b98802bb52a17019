//! Channel group storage. TV and radio groups live in separate tables.

use super::{Result, Store};
use crate::channels::ChannelGroup;
use rusqlite::params;

fn table(radio: bool) -> &'static str {
    if radio {
        "radio_channel_groups"
    } else {
        "channel_groups"
    }
}

impl Store {
    /// Insert a group and return its store-assigned id.
    pub fn add_group(&self, group: &ChannelGroup) -> Result<i64> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} (name, sort_order) VALUES (?1, ?2)",
                table(group.radio)
            ),
            params![group.name, group.sort_order],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All groups of one kind, in sort order.
    pub fn get_groups(&self, radio: bool) -> Result<Vec<ChannelGroup>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, sort_order FROM {} ORDER BY sort_order, id",
            table(radio)
        ))?;

        let records = stmt
            .query_map([], |row| {
                Ok(ChannelGroup {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    sort_order: row.get(2)?,
                    radio,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Rename a group.
    pub fn rename_group(&self, radio: bool, group_id: i64, name: &str) -> Result<()> {
        self.conn.execute(
            &format!("UPDATE {} SET name = ?2 WHERE id = ?1", table(radio)),
            params![group_id, name],
        )?;
        Ok(())
    }

    /// Delete a group and detach its members.
    pub fn remove_group(&self, radio: bool, group_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE channels SET group_id = 0 WHERE group_id = ?1 AND radio = ?2",
            params![group_id, radio as i32],
        )?;
        self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table(radio)),
            [group_id],
        )?;
        Ok(())
    }

    /// Move a channel into a group (0 = ungrouped).
    pub fn set_channel_group(&self, channel_id: i64, group_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE channels SET group_id = ?2 WHERE id = ?1",
            params![channel_id, group_id],
        )?;
        Ok(())
    }
}
