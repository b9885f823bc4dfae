/// Uplink record queries
use chrono::NaiveDateTime;
use rusqlite::{params, Row};

use super::{Database, StoreError};
use crate::types::{format_store_timestamp, UplinkRecord};

const UPLINK_COLUMNS: &str = "id, timestamp, application_id, device_id, dev_eui, \
    payload_base64, payload_hex, payload_text, payload_size, frame_count, f_port, \
    frequency, data_rate, rssi, snr, latitude, longitude, hostname, raw_topic, created_at";

fn map_uplink(row: &Row) -> rusqlite::Result<UplinkRecord> {
    Ok(UplinkRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        application_id: row.get(2)?,
        device_id: row.get(3)?,
        dev_eui: row.get(4)?,
        payload_base64: row.get(5)?,
        payload_hex: row.get(6)?,
        payload_text: row.get(7)?,
        payload_size: row.get(8)?,
        frame_count: row.get(9)?,
        f_port: row.get(10)?,
        frequency: row.get(11)?,
        data_rate: row.get(12)?,
        rssi: row.get(13)?,
        snr: row.get(14)?,
        latitude: row.get(15)?,
        longitude: row.get(16)?,
        hostname: row.get(17)?,
        raw_topic: row.get(18)?,
        created_at: row.get(19)?,
    })
}

impl Database {
    /// Uplink records with `timestamp` in `[from, to)`, oldest first.
    pub fn uplinks_in_range(
        &self,
        from: &NaiveDateTime,
        to: &NaiveDateTime,
    ) -> Result<Vec<UplinkRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {UPLINK_COLUMNS} FROM uplink_messages \
             WHERE timestamp >= ?1 AND timestamp < ?2 \
             ORDER BY timestamp ASC"
        ))?;

        let rows = stmt.query_map(
            params![format_store_timestamp(from), format_store_timestamp(to)],
            map_uplink,
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Uplink records with `timestamp >= since`, oldest first.
    pub fn uplinks_since(&self, since: &NaiveDateTime) -> Result<Vec<UplinkRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {UPLINK_COLUMNS} FROM uplink_messages \
             WHERE timestamp >= ?1 \
             ORDER BY timestamp ASC"
        ))?;

        let rows = stmt.query_map(params![format_store_timestamp(since)], map_uplink)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Full-table uplink count.
    pub fn count_uplinks(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM uplink_messages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Uplink count for a single device.
    pub fn count_uplinks_for_device(&self, device_id: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM uplink_messages WHERE device_id = ?1",
            params![device_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Every device id seen in the uplink stream, sorted.
    pub fn distinct_device_ids(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT DISTINCT device_id FROM uplink_messages ORDER BY device_id ASC")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Insert an uplink record. The gateway logger owns ingestion in
    /// production; this exists for fixtures and local seeding.
    pub fn insert_uplink(&self, record: &UplinkRecord) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO uplink_messages (
                timestamp, application_id, device_id, dev_eui,
                payload_base64, payload_hex, payload_text, payload_size,
                frame_count, f_port, frequency, data_rate,
                rssi, snr, latitude, longitude, hostname, raw_topic, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                record.timestamp,
                record.application_id,
                record.device_id,
                record.dev_eui,
                record.payload_base64,
                record.payload_hex,
                record.payload_text,
                record.payload_size,
                record.frame_count,
                record.f_port,
                record.frequency,
                record.data_rate,
                record.rssi,
                record.snr,
                record.latitude,
                record.longitude,
                record.hostname,
                record.raw_topic,
                record.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
