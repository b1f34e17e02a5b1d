//! Durable key-value storage backed by SQLite.
//!
//! One table, `kv`, holding opaque string values. The history store
//! keeps its whole record list under a single key, the way a browser's
//! local storage would.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension};

/// Persistent key-value store.
pub struct KvStore {
    conn: Mutex<Connection>,
}

impl KvStore {
    /// Open or create the `kv` table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open storage database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create kv table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("storage connection lock poisoned"))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        read(&conn, key)
    }

    /// Set a value (upsert).
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        write(&conn, key, value)
    }

    /// Read-modify-write a key while holding the connection, so two
    /// concurrent updates cannot lose each other's change.
    pub fn update<F>(&self, key: &str, f: F) -> Result<()>
    where
        F: FnOnce(Option<String>) -> Result<String>,
    {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let next = f(read(&tx, key)?)?;
        write(&tx, key, &next)?;
        tx.commit()?;
        Ok(())
    }
}

fn read(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value: Option<String> = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

fn write(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}
