/// Message store read layer
///
/// SQLite access to the uplink and join-event tables written by the external
/// gateway logger. The schema is created if missing so the service can start
/// before the logger has written anything, but this crate never alters
/// records once stored.
///
/// A single connection behind a mutex with WAL journaling and a busy timeout
/// is enough for this read-mostly workload; all queries are bounded.
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

use crate::logger::{self, LogTag};

mod joins;
mod uplinks;

/// Store access errors. Query failures abort the tick or snapshot in
/// progress; they never crash the process.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare store directory {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Handle to the message store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the store at the given path.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                    path: parent.to_string_lossy().to_string(),
                    source: e,
                })?;
            }
        }

        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.configure()?;
        db.init_schema()?;

        logger::info(LogTag::Store, &format!("Message store opened at {}", path));

        Ok(db)
    }

    /// In-memory store, used by tests and local experiments.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.configure()?;
        db.init_schema()?;
        Ok(db)
    }

    fn configure(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        // journal_mode returns the resulting mode ("wal" on disk, "memory"
        // for in-memory databases), so read it instead of asserting it.
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(5_000))?;
        Ok(())
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS uplink_messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp       TEXT    NOT NULL,
                application_id  TEXT    NOT NULL,
                device_id       TEXT    NOT NULL,
                dev_eui         TEXT,
                payload_base64  TEXT,
                payload_hex     TEXT,
                payload_text    TEXT,
                payload_size    INTEGER,
                frame_count     INTEGER,
                f_port          INTEGER,
                frequency       INTEGER,
                data_rate       INTEGER,
                rssi            REAL,
                snr             REAL,
                latitude        REAL,
                longitude       REAL,
                hostname        TEXT,
                raw_topic       TEXT,
                created_at      TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_uplink_timestamp
                ON uplink_messages(timestamp);
            CREATE INDEX IF NOT EXISTS idx_uplink_device_id
                ON uplink_messages(device_id);

            CREATE TABLE IF NOT EXISTS join_events (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp       TEXT    NOT NULL,
                application_id  TEXT    NOT NULL,
                device_id       TEXT    NOT NULL,
                dev_eui         TEXT    NOT NULL DEFAULT '',
                join_eui        TEXT,
                dev_addr        TEXT,
                frequency       INTEGER,
                data_rate       INTEGER,
                rssi            REAL,
                snr             REAL,
                latitude        REAL,
                longitude       REAL,
                hostname        TEXT,
                raw_topic       TEXT,
                created_at      TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_join_timestamp
                ON join_events(timestamp);",
        )?;
        Ok(())
    }

    /// Fault injection for tests (e.g. dropping a table to simulate an
    /// unavailable store).
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.lock().unwrap().execute_batch(sql)?;
        Ok(())
    }
}
