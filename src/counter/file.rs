//! Whole-collection counter file.
//!
//! Every increment loads the full collection, bumps one key and writes the
//! full collection back. Writers are serialised by a process-wide mutex; the
//! write itself goes to a sibling temp file that is renamed over the target,
//! so readers always see either the old or the new collection and need no
//! lock. Fine for the few hundred pairings a league produces; a larger key
//! space wants the SQLite backend instead.
//!
//! Loading is lenient: an entry that cannot be read as `key → non-negative
//! integer` is dropped with a warning instead of failing the request.

use std::fs::{remove_file, rename, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, warn};

use super::{next_count, pair_key, CounterSnapshot, MatchCounterStore};
use crate::error::StoreError;

/// On-disk layout of the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `{"Leones|Pumas": 3, ...}`
    Json,
    /// `pair,count` header followed by one row per key
    Csv,
}

impl FileFormat {
    fn label(self) -> &'static str {
        match self {
            FileFormat::Json => "json-file",
            FileFormat::Csv => "csv-file",
        }
    }

    pub fn decode(self, raw: &[u8]) -> Result<CounterSnapshot, StoreError> {
        match self {
            FileFormat::Json => decode_json(raw),
            FileFormat::Csv => Ok(decode_csv(raw)),
        }
    }

    pub fn encode(self, counts: &CounterSnapshot) -> Result<Vec<u8>, StoreError> {
        match self {
            FileFormat::Json => {
                serde_json::to_vec_pretty(counts).map_err(|e| StoreError::Encode(e.to_string()))
            }
            FileFormat::Csv => encode_csv(counts),
        }
    }
}

fn decode_json(raw: &[u8]) -> Result<CounterSnapshot, StoreError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(CounterSnapshot::new());
    }
    let doc: serde_json::Value =
        serde_json::from_slice(raw).map_err(|e| StoreError::Malformed(e.to_string()))?;
    let serde_json::Value::Object(entries) = doc else {
        return Err(StoreError::Malformed(
            "counter document is not a JSON object".into(),
        ));
    };

    let mut counts = CounterSnapshot::new();
    for (key, value) in entries {
        match value.as_u64() {
            Some(n) => {
                counts.insert(key, n);
            }
            None => warn!("Skipping malformed counter entry {:?}: {}", key, value),
        }
    }
    Ok(counts)
}

fn decode_csv(raw: &[u8]) -> CounterSnapshot {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw);

    let mut counts = CounterSnapshot::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping unreadable counter row {}: {}", line, e);
                continue;
            }
        };
        if record.len() != 2 {
            warn!("Skipping counter row {}: expected 2 fields, found {}", line, record.len());
            continue;
        }
        match record[1].trim().parse::<u64>() {
            Ok(n) => {
                counts.insert(record[0].to_string(), n);
            }
            Err(_) => warn!("Skipping counter row {}: invalid count '{}'", line, &record[1]),
        }
    }
    counts
}

fn encode_csv(counts: &CounterSnapshot) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let encode_err = |e: csv::Error| StoreError::Encode(e.to_string());
    writer.write_record(["pair", "count"]).map_err(encode_err)?;
    for (key, count) in counts {
        let count = count.to_string();
        writer
            .write_record([key.as_str(), count.as_str()])
            .map_err(encode_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| StoreError::Encode(e.to_string()))
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    file.sync_all()
}

/// Counter collection persisted as one JSON or CSV file.
pub struct FileCounterStore {
    path: PathBuf,
    format: FileFormat,
    write_lock: Mutex<()>,
}

impl FileCounterStore {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        FileCounterStore {
            path: path.into(),
            format,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole collection; a missing file is an empty collection.
    fn load(&self) -> Result<CounterSnapshot, StoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CounterSnapshot::new()),
            Err(e) => return Err(e.into()),
        };
        self.format.decode(&raw)
    }

    /// Replace the whole collection: temp file, fsync, rename.
    fn save(&self, counts: &CounterSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let data = self.format.encode(counts)?;
        let temp_path = self.temp_path();
        let written = write_synced(&temp_path, &data).and_then(|_| rename(&temp_path, &self.path));
        if let Err(e) = written {
            if let Err(cleanup) = remove_file(&temp_path) {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", temp_path.display(), cleanup);
                }
            }
            return Err(e.into());
        }

        debug!("Saved {} counters to {}", counts.len(), self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl MatchCounterStore for FileCounterStore {
    fn increment(&self, team1: &str, team2: &str) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        let mut counts = self.load()?;
        let key = pair_key(team1, team2);
        let new_count = next_count(&key, counts.get(&key).copied().unwrap_or(0))?;
        counts.insert(key, new_count);

        if let Err(e) = self.save(&counts) {
            error!("Failed to persist counters to {}: {}", self.path.display(), e);
            return Err(e);
        }
        Ok(new_count)
    }

    fn get(&self, team1: &str, team2: &str) -> Result<u64, StoreError> {
        Ok(self
            .load()?
            .get(&pair_key(team1, team2))
            .copied()
            .unwrap_or(0))
    }

    fn snapshot(&self) -> Result<CounterSnapshot, StoreError> {
        self.load()
    }

    fn name(&self) -> &str {
        self.format.label()
    }
}
