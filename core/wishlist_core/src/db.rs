//! Database connection management and migrations.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use time::OffsetDateTime;

use crate::clock::unix_millis;
use crate::storage::KeyValueStore;

/// SQLite-backed key/value store with migrations support.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the specified path and apply migrations.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;",
        )
        .context("Failed to set SQLite pragmas")?;

        Self::with_connection(conn)
    }

    /// Open a private in-memory database. Contents vanish with the handle.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };

        db.apply_migrations()?;
        Ok(db)
    }

    /// Apply all pending migrations.
    fn apply_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        let current_version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .context("Failed to get user_version")?;

        let migrations = [include_str!("../migrations/0001_init.sql")];

        for (idx, sql) in migrations.iter().enumerate() {
            let version = idx as i32 + 1;
            if current_version < version {
                conn.execute_batch(sql)
                    .with_context(|| format!("Failed to apply migration {}", version))?;
                conn.execute_batch(&format!("PRAGMA user_version = {};", version))
                    .with_context(|| format!("Failed to update user_version to {}", version))?;
            }
        }

        Ok(())
    }

    /// Read the value stored under `key`.
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to read key {:?}", key))
    }

    /// Insert or overwrite the value stored under `key`.
    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        let now = unix_millis(OffsetDateTime::now_utc());

        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .with_context(|| format!("Failed to write key {:?}", key))?;

        Ok(())
    }

    /// Delete `key`. Deleting a missing key is not an error.
    pub fn remove_value(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .with_context(|| format!("Failed to delete key {:?}", key))?;
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.remove_value(key)
    }
}
