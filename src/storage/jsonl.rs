//! JSONL (JSON Lines) storage.
//!
//! One JSON object per line. Snapshot files and derived record files share the
//! same reader and writer.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::hash::Hash;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::{StorageConfig, StorageError};

/// Derived record kinds, one file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKind {
    GenreAggregate,
    TagCorrelation,
    GenreScore,
}

impl DerivedKind {
    /// Get the filename for this record kind.
    pub fn filename(&self) -> &'static str {
        match self {
            DerivedKind::GenreAggregate => "genre_aggregates.jsonl",
            DerivedKind::TagCorrelation => "tag_correlations.jsonl",
            DerivedKind::GenreScore => "genre_scores.jsonl",
        }
    }
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for a derived record kind.
    pub fn for_kind(config: &StorageConfig, kind: DerivedKind) -> Self {
        Self::new(config.derived_path(kind))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append multiple entities to the file.
    pub fn append_batch(&self, entities: &[T]) -> Result<usize, StorageError> {
        if entities.is_empty() {
            return Ok(0);
        }

        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        for entity in entities {
            let json = serde_json::to_string(entity)?;
            writeln!(writer, "{}", json)?;
        }

        writer.flush()?;
        debug!("Appended {} entities to {:?}", entities.len(), self.path);

        Ok(entities.len())
    }

    /// Write entities, replacing the entire file.
    ///
    /// Writes to a sibling temp file first, then renames over the target.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            for entity in entities {
                let json = serde_json::to_string(entity)?;
                writeln!(writer, "{}", json)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!("Wrote {} entities to {:?}", entities.len(), self.path);
        Ok(entities.len())
    }

    /// Insert or replace entities by natural key.
    ///
    /// Existing records keep their position; a later record with the same key
    /// replaces an earlier one. New keys are appended in input order.
    pub fn upsert_by<K, F>(&self, entities: Vec<T>, key: F) -> Result<usize, StorageError>
    where
        K: Eq + Hash,
        F: Fn(&T) -> K,
    {
        if entities.is_empty() {
            return Ok(0);
        }

        let mut merged: Vec<T> = JsonlReader::new(self.path.clone()).read_all()?;
        let mut positions: HashMap<K, usize> = merged
            .iter()
            .enumerate()
            .map(|(i, entity)| (key(entity), i))
            .collect();

        let upserted = entities.len();
        for entity in entities {
            let k = key(&entity);
            match positions.get(&k) {
                Some(&i) => merged[i] = entity,
                None => {
                    positions.insert(k, merged.len());
                    merged.push(entity);
                }
            }
        }

        self.write_all(&merged)?;
        info!("Upserted {} entities into {:?}", upserted, self.path);
        Ok(upserted)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for a derived record kind.
    pub fn for_kind(config: &StorageConfig, kind: DerivedKind) -> Self {
        Self::new(config.derived_path(kind))
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities from the file. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(entity) => entities.push(entity),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", i + 1, self.path, e);
                }
            }
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }

    /// Read entities matching a predicate.
    pub fn read_where<F>(&self, predicate: F) -> Result<Vec<T>, StorageError>
    where
        F: Fn(&T) -> bool,
    {
        let all = self.read_all()?;
        Ok(all.into_iter().filter(predicate).collect())
    }
}
