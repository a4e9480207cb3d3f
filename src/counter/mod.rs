//! Per-pairing query counters.
//!
//! Every backend keys counters by the canonical unordered pair, so
//! `increment("A", "B")` and `increment("B", "A")` share one count. Counts only
//! ever grow and are durable as soon as `increment` returns (except for the
//! in-memory backend).

pub mod file;
pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::StoreError;
pub use file::{FileCounterStore, FileFormat};
pub use memory::MemoryCounterStore;
pub use sqlite::SqliteCounterStore;

/// Joins the two sorted team names of a canonical pair key.
pub const PAIR_SEPARATOR: &str = "|";

/// Canonical key → count.
pub type CounterSnapshot = BTreeMap<String, u64>;

/// Trait that every counter backend must implement.
pub trait MatchCounterStore: Send + Sync {
    /// Add one to the pairing's count and return the new value. The whole
    /// read-modify-write is atomic with respect to other callers.
    fn increment(&self, team1: &str, team2: &str) -> Result<u64, StoreError>;

    /// Current count for the pairing, 0 if it was never incremented.
    fn get(&self, team1: &str, team2: &str) -> Result<u64, StoreError>;

    /// Every tracked pairing.
    fn snapshot(&self) -> Result<CounterSnapshot, StoreError>;

    /// Human-readable backend name for logging.
    fn name(&self) -> &str;
}

/// Order-independent identifier for a pairing.
pub fn pair_key(team1: &str, team2: &str) -> String {
    let (lo, hi) = if team1 <= team2 { (team1, team2) } else { (team2, team1) };
    format!("{}{}{}", lo, PAIR_SEPARATOR, hi)
}

/// The value after `current`, refusing to wrap around.
pub(crate) fn next_count(key: &str, current: u64) -> Result<u64, StoreError> {
    current
        .checked_add(1)
        .ok_or_else(|| StoreError::Overflow(key.to_string()))
}

/// Which backend to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CounterBackend {
    /// No tracking at all
    None,
    /// Process-local, lost on restart
    Memory,
    /// Whole-file JSON object
    Json,
    /// Whole-file CSV table
    Csv,
    /// SQLite table with native upsert
    Sqlite,
}

impl CounterBackend {
    pub fn default_path(self) -> Option<PathBuf> {
        let file = match self {
            CounterBackend::None | CounterBackend::Memory => return None,
            CounterBackend::Json => "match_counts.json",
            CounterBackend::Csv => "match_counts.csv",
            CounterBackend::Sqlite => "match_counts.db",
        };
        Some(PathBuf::from(file))
    }

    pub fn is_persistent(self) -> bool {
        self.default_path().is_some()
    }

    /// Build the store, or `None` when tracking is disabled.
    pub fn open(
        self,
        path: Option<PathBuf>,
    ) -> Result<Option<Arc<dyn MatchCounterStore>>, StoreError> {
        let store: Arc<dyn MatchCounterStore> = match (self, path.or_else(|| self.default_path())) {
            (CounterBackend::None, _) => return Ok(None),
            (CounterBackend::Memory, _) => Arc::new(MemoryCounterStore::new()),
            (CounterBackend::Json, Some(p)) => Arc::new(FileCounterStore::new(p, FileFormat::Json)),
            (CounterBackend::Csv, Some(p)) => Arc::new(FileCounterStore::new(p, FileFormat::Csv)),
            (CounterBackend::Sqlite, Some(p)) => Arc::new(SqliteCounterStore::open(&p)?),
            // Every persistent backend has a default path.
            (_, None) => return Ok(None),
        };
        Ok(Some(store))
    }
}
