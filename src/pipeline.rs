//! Compute-and-upsert pipeline.
//!
//! One run for a snapshot date:
//! 1. Aggregate every tracked (or discovered) genre
//! 2. Score the aggregates against their WoW baselines
//! 3. Correlate the configured tag pairs
//! 4. Upsert all derived records by natural key
//!
//! Reruns for the same date overwrite, so the scheduler may retry freely.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::calculate::correlation::analyze_tag_pair;
use crate::calculate::genre::aggregate_genre;
use crate::calculate::scoring::{score_genre, ScoringContext};
use crate::calculate::trend::wow_cutoff;
use crate::calculate::EngineError;
use crate::config::EngineConfig;
use crate::models::{GenreAggregate, GenreScore, TagCorrelation};
use crate::storage::{DerivedSink, SnapshotSource, StorageError};

/// Errors that stop a run. Per-row and per-key conditions never do.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No snapshot data available")]
    NoSnapshots,

    #[error("No snapshot rows for {0}")]
    EmptySnapshot(NaiveDate),
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub snapshot_date: NaiveDate,
    pub genres_aggregated: usize,
    pub scores_written: usize,
    pub correlations_written: usize,
    /// Rejected rows, tag pairs without overlap and missing baselines
    pub diagnostics: Vec<EngineError>,
    pub duration: Duration,
}

impl RunReport {
    fn new(snapshot_date: NaiveDate) -> Self {
        Self {
            snapshot_date,
            genres_aggregated: 0,
            scores_written: 0,
            correlations_written: 0,
            diagnostics: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn rejected_rows(&self) -> usize {
        self.count(|e| matches!(e, EngineError::MalformedRow { .. }))
    }

    pub fn pairs_without_overlap(&self) -> usize {
        self.count(|e| matches!(e, EngineError::NoOverlap { .. }))
    }

    pub fn missing_baselines(&self) -> usize {
        self.count(|e| matches!(e, EngineError::MissingBaseline { .. }))
    }

    fn count(&self, predicate: impl Fn(&EngineError) -> bool) -> usize {
        self.diagnostics.iter().filter(|e| predicate(e)).count()
    }
}

/// Runs the engine against a store.
pub struct Pipeline<S> {
    store: S,
    engine: EngineConfig,
}

impl<S> Pipeline<S>
where
    S: SnapshotSource + DerivedSink,
{
    pub fn new(store: S, engine: EngineConfig) -> Self {
        Self { store, engine }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run for `date`, or for the latest snapshot date when `None`.
    pub fn run_once(&self, date: Option<NaiveDate>) -> Result<RunReport, PipelineError> {
        let date = match date {
            Some(date) => date,
            None => self
                .store
                .latest_snapshot_date()?
                .ok_or(PipelineError::NoSnapshots)?,
        };
        self.run_for_date(date)
    }

    fn run_for_date(&self, date: NaiveDate) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let mut report = RunReport::new(date);

        let genres: Vec<String> = if self.engine.tracked_genres.is_empty() {
            self.store.genres_on(date)?.into_iter().collect()
        } else {
            self.engine.tracked_genres.clone()
        };
        if genres.is_empty() {
            return Err(PipelineError::EmptySnapshot(date));
        }
        info!("Computing market data for {} ({} genres)", date, genres.len());

        let aggregates = self.aggregate(&genres, date, &mut report)?;
        let scores = self.score(&aggregates, date, &mut report)?;
        let correlations = self.correlate(date, &mut report)?;

        report.genres_aggregated = self.store.upsert_aggregates(aggregates)?;
        report.scores_written = self.store.upsert_scores(scores)?;
        report.correlations_written = self.store.upsert_correlations(correlations)?;
        report.duration = started.elapsed();

        info!(
            "Run for {} complete: {} genres, {} scores, {} correlations, \
             {} rejected rows, {} missing baselines in {:?}",
            date,
            report.genres_aggregated,
            report.scores_written,
            report.correlations_written,
            report.rejected_rows(),
            report.missing_baselines(),
            report.duration
        );
        Ok(report)
    }

    fn aggregate(
        &self,
        genres: &[String],
        date: NaiveDate,
        report: &mut RunReport,
    ) -> Result<Vec<GenreAggregate>, PipelineError> {
        let options = self.engine.aggregate_options();
        let mut aggregates = Vec::with_capacity(genres.len());

        for genre in genres {
            let rows = self.store.rows_for_genre(genre, date)?;
            let outcome = aggregate_genre(genre, date, &rows, &options);
            for rejection in &outcome.rejected {
                warn!("{}: {}", genre, rejection);
            }
            debug!(
                "Aggregated {}: {} games, {} CCU",
                genre, outcome.aggregate.game_count, outcome.aggregate.total_ccu
            );
            report.diagnostics.extend(outcome.rejected);
            aggregates.push(outcome.aggregate);
        }

        Ok(aggregates)
    }

    fn score(
        &self,
        aggregates: &[GenreAggregate],
        date: NaiveDate,
        report: &mut RunReport,
    ) -> Result<Vec<GenreScore>, PipelineError> {
        let ctx = ScoringContext::from_aggregates(aggregates);
        let cutoff = wow_cutoff(date);
        let mut scores = Vec::with_capacity(aggregates.len());

        for aggregate in aggregates {
            let baseline = self.store.prior_aggregate(&aggregate.genre, cutoff)?;
            if baseline.is_none() {
                let missing = EngineError::MissingBaseline {
                    key: aggregate.genre.clone(),
                    cutoff,
                };
                debug!("{}", missing);
                report.diagnostics.push(missing);
            }
            let score = score_genre(aggregate, baseline.as_ref(), &ctx, &self.engine.scoring);
            debug!(
                "Scored {}: overall {:?}, {}",
                score.genre, score.overall, score.recommendation
            );
            scores.push(score);
        }

        Ok(scores)
    }

    fn correlate(
        &self,
        date: NaiveDate,
        report: &mut RunReport,
    ) -> Result<Vec<TagCorrelation>, PipelineError> {
        let mut correlations = Vec::with_capacity(self.engine.tag_pairs.len());

        for (tag_a, tag_b) in &self.engine.tag_pairs {
            let rows_a = self.store.rows_with_tag(tag_a, date)?;
            let rows_b = self.store.rows_with_tag(tag_b, date)?;
            let top_games = self.engine.correlation_top_games;
            match analyze_tag_pair(tag_a, tag_b, &rows_a, &rows_b, date, top_games) {
                Ok(correlation) => correlations.push(correlation),
                Err(e) => {
                    debug!("Skipping tag pair: {}", e);
                    report.diagnostics.push(e);
                }
            }
        }

        Ok(correlations)
    }
}

impl<S> Pipeline<S>
where
    S: SnapshotSource + DerivedSink + Send + Sync + 'static,
{
    /// Rerun on a fixed interval, first run immediately. Failed runs are logged
    /// and retried on the next tick.
    pub async fn run_periodic(self: Arc<Self>, every: Duration, date: Option<NaiveDate>) {
        let mut ticker = interval(every);

        info!("Starting periodic compute every {:?}", every);

        loop {
            ticker.tick().await;

            match self.run_once(date) {
                Ok(report) => {
                    info!(
                        "Periodic compute for {} completed: {} genres",
                        report.snapshot_date, report.genres_aggregated
                    );
                }
                Err(e) => {
                    error!("Periodic compute failed: {}", e);
                }
            }
        }
    }
}
