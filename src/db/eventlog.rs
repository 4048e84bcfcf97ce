//! Append-only status event log.
//!
//! Events are never rewritten once stored; readers must tolerate
//! out-of-order arrival under concurrent producers.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqlResult, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::models::StatusEvent;
use super::{format_db_time, parse_db_time};

/// Event log error types.
#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("event log unavailable: {0}")]
    Unavailable(String),
}

/// Ordered, append-only store of status-change events.
pub trait StatusEventLog: Send + Sync {
    /// Append one event.
    fn append(&self, event: &StatusEvent) -> Result<(), EventLogError>;

    /// Latest event at or before `at` for the server, if any.
    fn latest_before(
        &self,
        server_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<StatusEvent>, EventLogError>;

    /// Events in `[start, end)` for the server, time-ascending best effort.
    fn range(
        &self,
        server_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StatusEvent>, EventLogError>;

    /// Drop every event for a server. Used when the server itself is removed.
    fn delete_for(&self, server_id: i64) -> Result<(), EventLogError>;
}

/// SQLite-backed event log.
pub struct SqliteEventLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventLog {
    /// Open (and if necessary create) the log at the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, EventLogError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| EventLogError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl StatusEventLog for SqliteEventLog {
    fn append(&self, event: &StatusEvent) -> Result<(), EventLogError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO status_events (server_id, timestamp, previous_status, new_status) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.server_id,
                format_db_time(event.timestamp),
                event.previous_status,
                event.new_status,
            ],
        )?;
        Ok(())
    }

    fn latest_before(
        &self,
        server_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<StatusEvent>, EventLogError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT server_id, timestamp, previous_status, new_status FROM status_events \
             WHERE server_id = ?1 AND timestamp <= ?2 ORDER BY timestamp DESC LIMIT 1",
        )?;

        let mut rows = stmt
            .query_map(params![server_id, format_db_time(at)], row_to_event)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(rows.pop())
    }

    fn range(
        &self,
        server_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StatusEvent>, EventLogError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT server_id, timestamp, previous_status, new_status FROM status_events \
             WHERE server_id = ?1 AND timestamp >= ?2 AND timestamp < ?3 ORDER BY timestamp ASC",
        )?;

        let events = stmt
            .query_map(
                params![server_id, format_db_time(start), format_db_time(end)],
                row_to_event,
            )?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(events)
    }

    fn delete_for(&self, server_id: i64) -> Result<(), EventLogError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM status_events WHERE server_id = ?1",
            params![server_id],
        )?;
        Ok(())
    }
}

fn row_to_event(row: &Row<'_>) -> SqlResult<StatusEvent> {
    let ts: String = row.get(1)?;
    Ok(StatusEvent {
        server_id: row.get(0)?,
        timestamp: parse_db_time(&ts).unwrap_or_else(Utc::now),
        previous_status: row.get(2)?,
        new_status: row.get(3)?,
    })
}
