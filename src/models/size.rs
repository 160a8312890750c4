//! Weight size resolution
//!
//! Two sources, picked by which file the clone contains:
//! - [`LegacyPointerScan`] reads `pytorch_model.bin` as text and looks for
//!   `size <digits>`. After a metadata-only clone the file is a git-lfs
//!   pointer, so the match is the size of the real weights.
//! - [`ShardIndex`] reads `metadata.total_size` from
//!   `pytorch_model.bin.index.json` for sharded checkpoints.

use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

pub const WEIGHTS_FILE: &str = "pytorch_model.bin";
pub const SHARD_INDEX_FILE: &str = "pytorch_model.bin.index.json";

static POINTER_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"size (\d+)").expect("pointer size pattern is valid"));

#[derive(Error, Debug)]
pub enum SizeError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("no 'size <bytes>' entry found")]
    NoSizeEntry,

    #[error("size '{0}' is not a valid byte count")]
    InvalidSize(String),

    #[error("invalid index document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("index has no metadata.total_size")]
    MissingTotalSize,
}

/// A file the weight size can be read from
pub trait SizeSource: Send + Sync {
    /// File this source reads
    fn path(&self) -> &Path;

    /// Total weight size in bytes
    fn resolve(&self) -> Result<u64, SizeError>;
}

/// Size scan over a single weight file read as text
#[derive(Debug, Clone)]
pub struct LegacyPointerScan {
    path: PathBuf,
}

impl LegacyPointerScan {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SizeSource for LegacyPointerScan {
    fn path(&self) -> &Path {
        &self.path
    }

    fn resolve(&self) -> Result<u64, SizeError> {
        let bytes = fs::read(&self.path)?;
        let content = String::from_utf8_lossy(&bytes);

        let digits = POINTER_SIZE
            .captures(&content)
            .and_then(|caps| caps.get(1))
            .ok_or(SizeError::NoSizeEntry)?
            .as_str();

        digits
            .parse()
            .map_err(|_| SizeError::InvalidSize(digits.to_string()))
    }
}

/// `metadata.total_size` from a sharded checkpoint index
#[derive(Debug, Clone)]
pub struct ShardIndex {
    path: PathBuf,
}

impl ShardIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SizeSource for ShardIndex {
    fn path(&self) -> &Path {
        &self.path
    }

    fn resolve(&self) -> Result<u64, SizeError> {
        let content = fs::read_to_string(&self.path)?;
        let index: Value = serde_json::from_str(&content)?;

        match index.pointer("/metadata/total_size") {
            None | Some(Value::Null) => Err(SizeError::MissingTotalSize),
            Some(total) => total_size_bytes(total),
        }
    }
}

// Some exporters write the total as a float or a string.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn total_size_bytes(total: &Value) -> Result<u64, SizeError> {
    if let Some(n) = total.as_u64() {
        return Ok(n);
    }
    if let Some(f) = total.as_f64() {
        // `u64::MAX as f64` rounds up to 2^64, the first value that no longer fits.
        if f >= 0.0 && f < u64::MAX as f64 && f.fract() == 0.0 {
            return Ok(f as u64);
        }
        return Err(SizeError::InvalidSize(total.to_string()));
    }
    if let Some(s) = total.as_str() {
        return s
            .trim()
            .parse()
            .map_err(|_| SizeError::InvalidSize(s.to_string()));
    }
    Err(SizeError::InvalidSize(total.to_string()))
}

/// Pick the size source for a cloned repository
///
/// The single weight file wins when present; otherwise the shard index is
/// used, even if it does not exist, so the failure names the index path.
#[must_use]
pub fn select_source(repo_dir: &Path) -> Box<dyn SizeSource> {
    let weights = repo_dir.join(WEIGHTS_FILE);
    if weights.exists() {
        Box::new(LegacyPointerScan::new(weights))
    } else {
        Box::new(ShardIndex::new(repo_dir.join(SHARD_INDEX_FILE)))
    }
}
