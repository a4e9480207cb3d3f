use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::{pair_key, CounterSnapshot, MatchCounterStore};
use crate::error::StoreError;

/// Counters in a SQLite table (single connection with mutex).
///
/// The increment is one upsert statement, so the database does the
/// read-modify-write itself.
#[derive(Clone)]
pub struct SqliteCounterStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCounterStore {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(SqliteCounterStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl MatchCounterStore for SqliteCounterStore {
    fn increment(&self, team1: &str, team2: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "INSERT INTO match_counts (pair_key, count, updated_at)
             VALUES (?1, 1, ?2)
             ON CONFLICT(pair_key) DO UPDATE SET
                count = count + 1,
                updated_at = excluded.updated_at
             RETURNING count",
            params![pair_key(team1, team2), Utc::now()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn get(&self, team1: &str, team2: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: Option<i64> = conn
            .query_row(
                "SELECT count FROM match_counts WHERE pair_key = ?1",
                params![pair_key(team1, team2)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }

    fn snapshot(&self) -> Result<CounterSnapshot, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT pair_key, count FROM match_counts ORDER BY pair_key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = CounterSnapshot::new();
        for row in rows {
            match row {
                Ok((key, n)) if n >= 0 => {
                    counts.insert(key, n as u64);
                }
                Ok((key, n)) => warn!("Skipping counter {:?} with negative count {}", key, n),
                Err(e) => warn!("Skipping unreadable counter row: {}", e),
            }
        }
        Ok(counts)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS match_counts (
    pair_key    TEXT    PRIMARY KEY,
    count       INTEGER NOT NULL DEFAULT 0,
    updated_at  TEXT    NOT NULL
);
"#;
