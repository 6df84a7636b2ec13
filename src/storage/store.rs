//! Data-access and persistence seams for the engine, plus the JSONL-backed store.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::jsonl::{DerivedKind, JsonlReader, JsonlWriter};
use super::{StorageConfig, StorageError};
use crate::calculate::trend::latest_on_or_before;
use crate::models::{GameSnapshotRow, GenreAggregate, GenreScore, TagCorrelation};

/// Read side: snapshot rows and prior aggregates.
pub trait SnapshotSource {
    /// Dates with snapshot data, oldest first.
    fn snapshot_dates(&self) -> Result<Vec<NaiveDate>, StorageError>;

    /// Every snapshot row captured on `date`.
    fn rows_on(&self, date: NaiveDate) -> Result<Vec<GameSnapshotRow>, StorageError>;

    /// Every stored aggregate for `genre`, any date.
    fn aggregate_history(&self, genre: &str) -> Result<Vec<GenreAggregate>, StorageError>;

    /// Rows whose genre set or tag set names `genre`.
    fn rows_for_genre(
        &self,
        genre: &str,
        date: NaiveDate,
    ) -> Result<Vec<GameSnapshotRow>, StorageError> {
        Ok(self
            .rows_on(date)?
            .into_iter()
            .filter(|row| row.in_genre(genre))
            .collect())
    }

    /// Rows carrying `tag`, case-insensitive.
    fn rows_with_tag(
        &self,
        tag: &str,
        date: NaiveDate,
    ) -> Result<Vec<GameSnapshotRow>, StorageError> {
        Ok(self
            .rows_on(date)?
            .into_iter()
            .filter(|row| row.has_tag(tag))
            .collect())
    }

    /// Genre names appearing in any row's genre set on `date`.
    fn genres_on(&self, date: NaiveDate) -> Result<BTreeSet<String>, StorageError> {
        Ok(self
            .rows_on(date)?
            .into_iter()
            .flat_map(|row| row.genres.into_iter())
            .collect())
    }

    /// Every row captured for `app_id`, oldest first.
    fn game_history(&self, app_id: u32) -> Result<Vec<GameSnapshotRow>, StorageError> {
        let mut history = Vec::new();
        for date in self.snapshot_dates()? {
            history.extend(self.rows_on(date)?.into_iter().filter(|row| row.app_id == app_id));
        }
        Ok(history)
    }

    fn latest_snapshot_date(&self) -> Result<Option<NaiveDate>, StorageError> {
        Ok(self.snapshot_dates()?.pop())
    }

    /// The most recent aggregate for `genre` dated on or before `cutoff`.
    fn prior_aggregate(
        &self,
        genre: &str,
        cutoff: NaiveDate,
    ) -> Result<Option<GenreAggregate>, StorageError> {
        let history = self.aggregate_history(genre)?;
        Ok(latest_on_or_before(&history, cutoff).cloned())
    }
}

/// Write side: derived records, upserted by natural key.
pub trait DerivedSink {
    fn upsert_aggregates(&self, aggregates: Vec<GenreAggregate>) -> Result<usize, StorageError>;

    fn upsert_correlations(&self, correlations: Vec<TagCorrelation>) -> Result<usize, StorageError>;

    fn upsert_scores(&self, scores: Vec<GenreScore>) -> Result<usize, StorageError>;
}

/// The JSONL data lake.
#[derive(Debug, Clone)]
pub struct JsonlMarketStore {
    config: StorageConfig,
}

impl JsonlMarketStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Merge rows into their per-date snapshot files, replacing rows with the same
    /// app id. Returns the number of rows written.
    pub fn import_rows(&self, rows: Vec<GameSnapshotRow>) -> Result<usize, StorageError> {
        let mut by_date: BTreeMap<NaiveDate, Vec<GameSnapshotRow>> = BTreeMap::new();
        for row in rows {
            by_date.entry(row.snapshot_date).or_default().push(row);
        }

        let mut total = 0;
        for (date, rows) in by_date {
            let writer = JsonlWriter::new(self.config.snapshot_path(date));
            total += writer.upsert_by(rows, |row: &GameSnapshotRow| row.app_id)?;
        }
        info!("Imported {} snapshot rows", total);
        Ok(total)
    }

    /// Read a JSONL file of snapshot rows from anywhere on disk.
    pub fn read_import_file(path: &Path) -> Result<Vec<GameSnapshotRow>, StorageError> {
        if !path.exists() {
            return Err(StorageError::PathNotFound(path.to_path_buf()));
        }
        JsonlReader::new(path.to_path_buf()).read_all()
    }

    pub fn aggregates(&self) -> Result<Vec<GenreAggregate>, StorageError> {
        JsonlReader::for_kind(&self.config, DerivedKind::GenreAggregate).read_all()
    }

    pub fn aggregates_on(&self, date: NaiveDate) -> Result<Vec<GenreAggregate>, StorageError> {
        JsonlReader::for_kind(&self.config, DerivedKind::GenreAggregate)
            .read_where(|a: &GenreAggregate| a.snapshot_date == date)
    }

    pub fn correlations(&self) -> Result<Vec<TagCorrelation>, StorageError> {
        JsonlReader::for_kind(&self.config, DerivedKind::TagCorrelation).read_all()
    }

    pub fn scores(&self) -> Result<Vec<GenreScore>, StorageError> {
        JsonlReader::for_kind(&self.config, DerivedKind::GenreScore).read_all()
    }
}

fn date_from_stem(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

impl SnapshotSource for JsonlMarketStore {
    fn snapshot_dates(&self) -> Result<Vec<NaiveDate>, StorageError> {
        let dir = self.config.snapshots_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let pattern = dir.join("*.jsonl");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| StorageError::InvalidPath(dir.display().to_string()))?;

        let mut dates = Vec::new();
        for entry in glob::glob(pattern)? {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping unreadable snapshot path: {}", e);
                    continue;
                }
            };
            match date_from_stem(&path) {
                Some(date) => dates.push(date),
                None => debug!("Ignoring non-date snapshot file {:?}", path),
            }
        }

        dates.sort();
        Ok(dates)
    }

    fn rows_on(&self, date: NaiveDate) -> Result<Vec<GameSnapshotRow>, StorageError> {
        JsonlReader::new(self.config.snapshot_path(date)).read_all()
    }

    fn aggregate_history(&self, genre: &str) -> Result<Vec<GenreAggregate>, StorageError> {
        JsonlReader::for_kind(&self.config, DerivedKind::GenreAggregate)
            .read_where(|a: &GenreAggregate| a.genre.eq_ignore_ascii_case(genre))
    }
}

impl DerivedSink for JsonlMarketStore {
    fn upsert_aggregates(&self, aggregates: Vec<GenreAggregate>) -> Result<usize, StorageError> {
        JsonlWriter::for_kind(&self.config, DerivedKind::GenreAggregate)
            .upsert_by(aggregates, |a| a.id.clone())
    }

    fn upsert_correlations(
        &self,
        correlations: Vec<TagCorrelation>,
    ) -> Result<usize, StorageError> {
        JsonlWriter::for_kind(&self.config, DerivedKind::TagCorrelation)
            .upsert_by(correlations, |c| c.id.clone())
    }

    fn upsert_scores(&self, scores: Vec<GenreScore>) -> Result<usize, StorageError> {
        JsonlWriter::for_kind(&self.config, DerivedKind::GenreScore)
            .upsert_by(scores, |s| s.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn store(temp_dir: &TempDir) -> JsonlMarketStore {
        JsonlMarketStore::new(StorageConfig::new(temp_dir.path().to_path_buf()))
    }

    fn rows(date: NaiveDate) -> Vec<GameSnapshotRow> {
        vec![
            GameSnapshotRow::new(1, "Dungeon Dice", date)
                .with_genres(&["Indie", "Strategy"])
                .with_tags(&["Roguelike", "Deck Building"])
                .with_ccu(10),
            GameSnapshotRow::new(2, "Farm Days", date)
                .with_genres(&["Simulation"])
                .with_tags(&["Farming", "Cozy"])
                .with_ccu(40),
        ]
    }

    #[test]
    fn test_import_and_query_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        assert_eq!(store.import_rows(rows(day(10))).unwrap(), 2);

        assert_eq!(store.rows_on(day(10)).unwrap().len(), 2);
        assert!(store.rows_on(day(11)).unwrap().is_empty());

        let roguelikes = store.rows_for_genre("roguelike", day(10)).unwrap();
        assert_eq!(roguelikes.len(), 1);
        assert_eq!(roguelikes[0].app_id, 1);

        let cozy = store.rows_with_tag("COZY", day(10)).unwrap();
        assert_eq!(cozy[0].app_id, 2);

        let genres: Vec<String> = store.genres_on(day(10)).unwrap().into_iter().collect();
        assert_eq!(genres, vec!["Indie", "Simulation", "Strategy"]);
    }

    #[test]
    fn test_reimport_replaces_rows_by_app_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        store.import_rows(rows(day(10))).unwrap();
        let updated = vec![GameSnapshotRow::new(1, "Dungeon Dice", day(10)).with_ccu(99)];
        store.import_rows(updated).unwrap();

        let stored = store.rows_on(day(10)).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].ccu, 99);
    }

    #[test]
    fn test_snapshot_dates_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        store.import_rows(rows(day(17))).unwrap();
        store.import_rows(rows(day(3))).unwrap();
        std::fs::write(store.config().snapshots_dir().join("notes.jsonl"), "").unwrap();

        assert_eq!(store.snapshot_dates().unwrap(), vec![day(3), day(17)]);
        assert_eq!(store.latest_snapshot_date().unwrap(), Some(day(17)));
    }

    #[test]
    fn test_game_history_across_dates() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        store.import_rows(rows(day(10))).unwrap();
        store.import_rows(rows(day(3))).unwrap();

        let history = store.game_history(2).unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|r| r.snapshot_date).collect();
        assert_eq!(dates, vec![day(3), day(10)]);
        assert!(history.iter().all(|r| r.app_id == 2));
        assert!(store.game_history(99).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_dates_without_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        assert!(store.snapshot_dates().unwrap().is_empty());
        assert_eq!(store.latest_snapshot_date().unwrap(), None);
    }

    #[test]
    fn test_prior_aggregate_on_or_before_cutoff() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        store
            .upsert_aggregates(vec![
                GenreAggregate::empty("Roguelike", day(1)),
                GenreAggregate::empty("Roguelike", day(3)),
                GenreAggregate::empty("Roguelike", day(5)),
                GenreAggregate::empty("Survival", day(3)),
            ])
            .unwrap();

        let prior = store.prior_aggregate("roguelike", day(4)).unwrap().unwrap();
        assert_eq!(prior.snapshot_date, day(3));
        assert_eq!(prior.genre, "Roguelike");
        let before_history = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        assert!(store.prior_aggregate("Roguelike", before_history).unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent_per_natural_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let mut agg = GenreAggregate::empty("Roguelike", day(10));
        store.upsert_aggregates(vec![agg.clone()]).unwrap();
        agg.total_ccu = 500;
        store.upsert_aggregates(vec![agg.clone()]).unwrap();

        let stored = store.aggregates().unwrap();
        assert_eq!(stored, vec![agg]);
        assert_eq!(store.aggregates_on(day(10)).unwrap().len(), 1);
        assert!(store.aggregates_on(day(11)).unwrap().is_empty());
    }

    #[test]
    fn test_scores_and_correlations_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        store
            .upsert_scores(vec![GenreScore::unknown("Cozy", day(10))])
            .unwrap();

        assert_eq!(store.scores().unwrap().len(), 1);
        assert!(store.correlations().unwrap().is_empty());
    }

    #[test]
    fn test_read_import_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = JsonlMarketStore::read_import_file(&temp_dir.path().join("missing.jsonl"));
        assert!(matches!(result, Err(StorageError::PathNotFound(_))));
    }
}
