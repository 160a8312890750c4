//! On-disk record cache
//!
//! One `<key>.json` file per model. A zero-length file is a placeholder: the
//! slot was reserved but the pipeline never finished writing a record. Nothing
//! retries a placeholder on its own; see [`RecordCache::placeholders`].

use crate::models::record::CacheRecord;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Directory of cached model records
#[derive(Debug, Clone)]
pub struct RecordCache {
    dir: PathBuf,
}

/// Result of asking the gate for a slot
#[derive(Debug)]
pub enum Reservation {
    /// A record or placeholder already exists
    Cached(PathBuf),
    /// A fresh placeholder was created and belongs to the caller
    Reserved(Slot),
}

/// A reserved, still-empty record file
#[derive(Debug)]
pub struct Slot {
    path: PathBuf,
}

impl Slot {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// What the cache holds for a key
#[derive(Debug, PartialEq, Eq)]
pub enum CacheEntry {
    Missing,
    Placeholder,
    Record(CacheRecord),
}

impl RecordCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for a cache key
    #[must_use]
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Reserve the slot for `key` unless something is already there
    ///
    /// Creating the placeholder and checking for an existing file happen in
    /// one `create_new` call.
    pub fn reserve(&self, key: &str) -> io::Result<Reservation> {
        fs::create_dir_all(&self.dir)?;
        let path = self.record_path(key);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Reservation::Reserved(Slot { path })),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(Reservation::Cached(path)),
            Err(e) => Err(e),
        }
    }

    /// Write `record` over the reserved placeholder atomically (tmp + rename)
    pub fn store(&self, slot: &Slot, record: &CacheRecord) -> io::Result<()> {
        let content = serde_json::to_string(record)?;

        let tmp_path = slot.path.with_extension("tmp");
        let written = fs::write(&tmp_path, content).and_then(|()| fs::rename(&tmp_path, &slot.path));

        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written
    }

    /// Read whatever is cached for `key`
    pub fn load(&self, key: &str) -> io::Result<CacheEntry> {
        let path = self.record_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheEntry::Missing),
            Err(e) => return Err(e),
        };

        if content.trim().is_empty() {
            return Ok(CacheEntry::Placeholder);
        }

        let record = serde_json::from_str(&content)?;
        Ok(CacheEntry::Record(record))
    }

    /// Placeholder files left behind by failed or interrupted runs
    pub fn placeholders(&self) -> io::Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && entry.metadata().is_ok_and(|m| m.is_file() && m.len() == 0)
            {
                found.push(path);
            }
        }

        found.sort();
        Ok(found)
    }

    /// Delete placeholders so the next run retries those models
    pub fn clear_placeholders(&self) -> io::Result<Vec<PathBuf>> {
        let placeholders = self.placeholders()?;
        for path in &placeholders {
            fs::remove_file(path)?;
            tracing::info!(path = %path.display(), "Removed placeholder");
        }
        Ok(placeholders)
    }
}
