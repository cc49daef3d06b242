//! SQLite-backed audit sink.

use std::path::Path;

use rusqlite::{params, Connection};
use tracing::info;

use crate::error::AuditError;

use super::{AuditEntry, AuditRecord, AuditSink};

/// Audit sink storing records in a SQLite `logs` table.
pub struct SqliteAuditSink {
    conn: Connection,
}

impl SqliteAuditSink {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Audit database opened");
        Self::with_connection(conn)
    }

    /// Use a private in-memory database. Records are lost on exit.
    pub fn in_memory() -> Result<Self, AuditError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AuditError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS logs (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                ip          TEXT NOT NULL,
                user_agent  TEXT,
                method      TEXT NOT NULL,
                url         TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// All stored records in id order.
    pub fn records(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, ip, user_agent, method, url FROM logs ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AuditRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                client_ip: row.get(2)?,
                user_agent: row.get(3)?,
                method: row.get(4)?,
                url: row.get(5)?,
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<i64, AuditError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?)
    }
}

impl AuditSink for SqliteAuditSink {
    fn append(&mut self, entry: AuditEntry) -> Result<AuditRecord, AuditError> {
        self.conn.execute(
            "INSERT INTO logs (timestamp, ip, user_agent, method, url) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.timestamp,
                entry.client_ip,
                entry.user_agent,
                entry.method,
                entry.url
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(AuditRecord::from_entry(id, entry))
    }
}
