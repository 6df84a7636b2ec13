//! Filesystem data lake.
//!
//! Layout under `data_dir`:
//! - `snapshots/<YYYY-MM-DD>.jsonl`: game snapshot rows, one file per date
//! - `derived/`: genre aggregates, tag correlations and genre scores

pub mod jsonl;
pub mod store;

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

pub use jsonl::{DerivedKind, JsonlReader, JsonlWriter};
pub use store::{DerivedSink, JsonlMarketStore, SnapshotSource};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn derived_dir(&self) -> PathBuf {
        self.data_dir.join("derived")
    }

    /// Snapshot file for one date.
    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.snapshots_dir().join(format!("{}.jsonl", date))
    }

    /// Derived record file for one kind.
    pub fn derived_path(&self, kind: DerivedKind) -> PathBuf {
        self.derived_dir().join(kind.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
