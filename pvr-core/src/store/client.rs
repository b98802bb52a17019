//! Backend client identity storage.

use super::{ClientRecord, Result, Store};
use rusqlite::params;

impl Store {
    /// Look up a client by GUID, creating it if unknown. Returns the
    /// store-assigned client id.
    pub fn get_or_create_client(&self, name: &str, guid: &str) -> Result<i64> {
        let existing: std::result::Result<i64, _> = self.conn.query_row(
            "SELECT id FROM clients WHERE guid = ?1",
            [guid],
            |row| row.get(0),
        );

        match existing {
            Ok(id) => {
                // Keep the display name current
                self.conn.execute(
                    "UPDATE clients SET name = ?2 WHERE id = ?1",
                    params![id, name],
                )?;
                Ok(id)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                self.conn.execute(
                    "INSERT INTO clients (name, guid) VALUES (?1, ?2)",
                    params![name, guid],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All registered clients.
    pub fn get_clients(&self) -> Result<Vec<ClientRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, guid FROM clients ORDER BY id")?;

        let records = stmt
            .query_map([], |row| {
                Ok(ClientRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    guid: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Remove a client and everything that hangs off it.
    pub fn remove_client(&self, client_id: i64) -> Result<()> {
        // channels carry no FK to clients (virtual channels have none),
        // so cascade by hand
        self.conn.execute(
            "DELETE FROM guide_data WHERE channel_id IN
                (SELECT id FROM channels WHERE client_id = ?1)",
            [client_id],
        )?;
        self.conn
            .execute("DELETE FROM channels WHERE client_id = ?1", [client_id])?;
        self.conn
            .execute("DELETE FROM clients WHERE id = ?1", [client_id])?;
        Ok(())
    }
}
