//! SQLite store for the server inventory.

use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use chrono::{DateTime, Utc};

use super::models::*;
use super::{format_db_time, parse_db_time};

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found")]
    NotFound,
}

/// Columns accepted by `list_filtered` as sort fields. Anything else falls
/// back to `id` so user input never reaches the ORDER BY clause verbatim.
const SORT_COLUMNS: &[&str] = &["id", "name", "address", "status", "created_at", "updated_at"];

/// Thread-safe inventory store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize the database with migrations.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();

        // Run migrations inline (embedded SQL)
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;

        Ok(())
    }

    // --- Server CRUD ---

    /// Add a new server and return its ID.
    pub fn create_server(&self, server: &mut Server) -> Result<i64, DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO servers (name, address, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                server.name,
                server.address,
                server.status,
                format_db_time(server.created_at),
                format_db_time(server.updated_at),
            ],
        )?;
        let id = conn.last_insert_rowid();
        server.id = id;
        Ok(id)
    }

    /// Update an existing server's name, address and status.
    pub fn update_server(&self, server: &Server) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE servers SET name=?1, address=?2, status=?3, updated_at=?4 WHERE id=?5",
            params![
                server.name,
                server.address,
                server.status,
                format_db_time(server.updated_at),
                server.id,
            ],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Set only the observed status of a server.
    pub fn update_status(&self, id: i64, status: bool, at: DateTime<Utc>) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE servers SET status=?1, updated_at=?2 WHERE id=?3",
            params![status, format_db_time(at), id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Get all servers.
    pub fn get_servers(&self) -> Result<Vec<Server>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, address, status, created_at, updated_at FROM servers ORDER BY id",
        )?;

        let servers = stmt
            .query_map([], row_to_server)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(servers)
    }

    /// Get a server by ID.
    pub fn get_server(&self, id: i64) -> Result<Server, DbError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, address, status, created_at, updated_at FROM servers WHERE id = ?1",
            params![id],
            row_to_server,
        )
        .optional()?
        .ok_or(DbError::NotFound)
    }

    /// Retrieve one page of servers plus the total matching count.
    pub fn list_filtered(&self, query: &ListQuery) -> Result<(Vec<Server>, i64), DbError> {
        let column = if SORT_COLUMNS.contains(&query.sort_field.as_str()) {
            query.sort_field.as_str()
        } else {
            "id"
        };
        let direction = if query.sort_order.eq_ignore_ascii_case("desc") {
            "DESC"
        } else {
            "ASC"
        };
        let filter = match query.status {
            StatusFilter::Any => "",
            StatusFilter::Online => "WHERE status = 1",
            StatusFilter::Offline => "WHERE status = 0",
        };

        let conn = self.conn.lock().unwrap();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM servers {}", filter),
            [],
            |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, name, address, status, created_at, updated_at FROM servers {} \
             ORDER BY {} {} LIMIT ?1 OFFSET ?2",
            filter, column, direction
        ))?;

        let servers = stmt
            .query_map(params![query.per_page, query.offset], row_to_server)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok((servers, total))
    }

    /// Count online and offline servers.
    pub fn status_counts(&self) -> Result<(i64, i64), DbError> {
        let conn = self.conn.lock().unwrap();
        let online: i64 = conn.query_row(
            "SELECT COUNT(*) FROM servers WHERE status = 1",
            [],
            |r| r.get(0),
        )?;
        let offline: i64 = conn.query_row(
            "SELECT COUNT(*) FROM servers WHERE status = 0",
            [],
            |r| r.get(0),
        )?;
        Ok((online, offline))
    }

    /// Delete a server.
    pub fn delete_server(&self, id: i64) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM servers WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

fn row_to_server(row: &Row<'_>) -> SqlResult<Server> {
    let created: String = row.get(4)?;
    let updated: String = row.get(5)?;
    Ok(Server {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        status: row.get(3)?,
        created_at: parse_db_time(&created).unwrap_or_else(Utc::now),
        updated_at: parse_db_time(&updated).unwrap_or_else(Utc::now),
    })
}
