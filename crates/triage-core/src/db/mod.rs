//! SQLite persistence for the provider roster and queue entries.
//!
//! The schema is created on open. Files written by an older build are
//! brought forward by [`Database::migrate`], keyed on `PRAGMA user_version`.

mod entries;
mod providers;
mod schema;
mod store;

pub use schema::*;
pub use store::*;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;

/// Current on-disk layout.
pub const SCHEMA_VERSION: u32 = 2;

/// How long a writer waits on a locked file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// A stored value that does not parse back into its domain type.
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        let db = Self { conn };
        db.conn.execute_batch(SCHEMA)?;
        db.migrate()?;
        Ok(db)
    }

    /// Bring an older file up to [`SCHEMA_VERSION`].
    fn migrate(&self) -> DbResult<()> {
        let version: u32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }

        // v1 files predate the business-day column on queue entries
        if !self.has_column("queue_entries", "assigned_on")? {
            self.conn
                .execute_batch("ALTER TABLE queue_entries ADD COLUMN assigned_on TEXT")?;
        }

        self.conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tracing::info!(from = version, to = SCHEMA_VERSION, "Database schema migrated");
        Ok(())
    }

    fn has_column(&self, table: &str, column: &str) -> DbResult<bool> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for name in names {
            if name? == column {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"providers".to_string()));
        assert!(tables.contains(&"queue_entries".to_string()));
    }

    #[test]
    fn test_reopen_file_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.db");
        Database::open(&path).unwrap();

        let db = Database::open(&path).unwrap();
        let version: u32 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_migrates_file_without_business_day_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE queue_entries (
                    case_id TEXT PRIMARY KEY, patient_id TEXT NOT NULL, department TEXT NOT NULL,
                    queue_date TEXT NOT NULL, slot TEXT NOT NULL, risk_tier TEXT NOT NULL,
                    priority_score INTEGER NOT NULL, status TEXT NOT NULL DEFAULT 'pending',
                    queue_position INTEGER, provider_id TEXT, original_slot TEXT,
                    intake_fingerprint TEXT, created_at TEXT NOT NULL, updated_at TEXT NOT NULL
                );",
            )
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.has_column("queue_entries", "assigned_on").unwrap());
    }
}
