/// Join event queries
use chrono::NaiveDateTime;
use rusqlite::{params, Row};

use super::{Database, StoreError};
use crate::types::{format_store_timestamp, JoinEvent};

const JOIN_COLUMNS: &str = "id, timestamp, application_id, device_id, dev_eui, join_eui, \
    dev_addr, frequency, data_rate, rssi, snr, latitude, longitude, hostname, raw_topic, created_at";

fn map_join(row: &Row) -> rusqlite::Result<JoinEvent> {
    Ok(JoinEvent {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        application_id: row.get(2)?,
        device_id: row.get(3)?,
        dev_eui: row.get(4)?,
        join_eui: row.get(5)?,
        dev_addr: row.get(6)?,
        frequency: row.get(7)?,
        data_rate: row.get(8)?,
        rssi: row.get(9)?,
        snr: row.get(10)?,
        latitude: row.get(11)?,
        longitude: row.get(12)?,
        hostname: row.get(13)?,
        raw_topic: row.get(14)?,
        created_at: row.get(15)?,
    })
}

impl Database {
    /// Join events with `timestamp >= since`, oldest first.
    pub fn joins_since(&self, since: &NaiveDateTime) -> Result<Vec<JoinEvent>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOIN_COLUMNS} FROM join_events \
             WHERE timestamp >= ?1 \
             ORDER BY timestamp ASC"
        ))?;

        let rows = stmt.query_map(params![format_store_timestamp(since)], map_join)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Full-table join event count.
    pub fn count_join_events(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM join_events", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Insert a join event. Fixture/seeding helper, as with uplinks.
    pub fn insert_join_event(&self, event: &JoinEvent) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO join_events (
                timestamp, application_id, device_id, dev_eui, join_eui, dev_addr,
                frequency, data_rate, rssi, snr, latitude, longitude,
                hostname, raw_topic, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                event.timestamp,
                event.application_id,
                event.device_id,
                event.dev_eui,
                event.join_eui,
                event.dev_addr,
                event.frequency,
                event.data_rate,
                event.rssi,
                event.snr,
                event.latitude,
                event.longitude,
                event.hostname,
                event.raw_topic,
                event.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{parse_record_timestamp, reference_offset};

    fn join_event(device: &str, timestamp: &str) -> JoinEvent {
        JoinEvent {
            id: 0,
            timestamp: timestamp.to_string(),
            application_id: "app-1".to_string(),
            device_id: device.to_string(),
            dev_eui: "0011223344556677".to_string(),
            join_eui: Some("8899aabbccddeeff".to_string()),
            dev_addr: Some("01020304".to_string()),
            frequency: Some(868300000),
            data_rate: Some(0),
            rssi: Some(-90.0),
            snr: Some(3.0),
            latitude: None,
            longitude: None,
            hostname: None,
            raw_topic: None,
            created_at: Some(timestamp.to_string()),
        }
    }

    #[test]
    fn insert_count_and_window() {
        let db = Database::open_in_memory().unwrap();
        let offset = reference_offset(0);

        db.insert_join_event(&join_event("dev-a", "2025-08-01T09:00:00.000000")).unwrap();
        db.insert_join_event(&join_event("dev-b", "2025-08-01T11:00:00.000000")).unwrap();

        assert_eq!(db.count_join_events().unwrap(), 2);

        let since = parse_record_timestamp("2025-08-01T10:00:00", &offset).unwrap();
        let windowed = db.joins_since(&since).unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].device_id, "dev-b");
        assert_eq!(windowed[0].dev_addr.as_deref(), Some("01020304"));
    }
}
