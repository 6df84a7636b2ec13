//! Read-only views over derived records, shaped for the HTTP layer.

use std::cmp::Ordering;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::calculate::metrics::round_to;
use crate::calculate::trend::{
    baseline_for, overall_trend, weekly_series, GameWow, WeeklyTrendPoint,
};
use crate::models::{
    GameSnapshotRow, GenreAggregate, GenreScore, PriceDistribution, RankedGame, Recommendation,
    TagCorrelation, TagCount, TrendDirection,
};

/// Tags and games carried on each heatmap entry.
pub const HEATMAP_TOP_LIMIT: usize = 5;

pub const DEFAULT_TAG_COMBO_LIMIT: usize = 20;
pub const DEFAULT_TREND_WEEKS: u32 = 12;

/// A genre's scores joined with the aggregate they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapEntry {
    pub genre: String,
    pub score_date: NaiveDate,

    pub hotness: Option<u8>,
    pub saturation: Option<u8>,
    pub success_rate: Option<u8>,
    pub timing: Option<u8>,
    pub growth_velocity: Option<f64>,
    pub competition: Option<u8>,
    pub revenue_potential: Option<u8>,
    pub discoverability: Option<u8>,
    pub overall: Option<u8>,
    pub trend_direction: Option<TrendDirection>,
    pub recommendation: Recommendation,

    pub game_count: Option<u32>,
    pub total_ccu: Option<u64>,
    pub avg_ccu: Option<f64>,
    pub total_owners_estimate: Option<u64>,
    pub avg_review_score: Option<f64>,
    pub median_review_score: Option<f64>,
    pub median_review_count: Option<u64>,
    pub well_reviewed_count: Option<u32>,
    pub avg_price_cents: Option<u64>,
    pub median_price_cents: Option<u64>,
    pub price_distribution: Option<PriceDistribution>,
    pub releases_last_30d: Option<u32>,
    pub releases_last_90d: Option<u32>,
    pub early_access_count: Option<u32>,
    pub early_access_pct: Option<u8>,
    pub avg_game_age_days: Option<u32>,
    pub revenue_estimate_cents: Option<u64>,
    pub top_tags: Vec<TagCount>,
    pub top_games: Vec<RankedGame>,
}

impl HeatmapEntry {
    fn new(score: &GenreScore, aggregate: Option<&GenreAggregate>) -> Self {
        Self {
            genre: score.genre.clone(),
            score_date: score.score_date,
            hotness: score.hotness,
            saturation: score.saturation,
            success_rate: score.success_rate,
            timing: score.timing,
            growth_velocity: score.growth_velocity,
            competition: score.competition,
            revenue_potential: score.revenue_potential,
            discoverability: score.discoverability,
            overall: score.overall,
            trend_direction: score.trend_direction,
            recommendation: score.recommendation,
            game_count: aggregate.map(|a| a.game_count),
            total_ccu: aggregate.map(|a| a.total_ccu),
            avg_ccu: aggregate.and_then(|a| a.avg_ccu),
            total_owners_estimate: aggregate.map(|a| a.total_owners_estimate),
            avg_review_score: aggregate.and_then(|a| a.avg_review_score),
            median_review_score: aggregate.and_then(|a| a.median_review_score),
            median_review_count: aggregate.and_then(|a| a.median_review_count),
            well_reviewed_count: aggregate.map(|a| a.well_reviewed_count),
            avg_price_cents: aggregate.and_then(|a| a.avg_price_cents),
            median_price_cents: aggregate.and_then(|a| a.median_price_cents),
            price_distribution: aggregate.map(|a| a.price_distribution),
            releases_last_30d: aggregate.map(|a| a.releases_last_30d),
            releases_last_90d: aggregate.map(|a| a.releases_last_90d),
            early_access_count: aggregate.map(|a| a.early_access_count),
            early_access_pct: aggregate.and_then(|a| a.early_access_pct),
            avg_game_age_days: aggregate.and_then(|a| a.avg_game_age_days),
            revenue_estimate_cents: aggregate.map(|a| a.revenue_estimate_cents),
            top_tags: aggregate
                .map(|a| a.top_tags.iter().take(HEATMAP_TOP_LIMIT).cloned().collect())
                .unwrap_or_default(),
            top_games: aggregate
                .map(|a| a.top_games.iter().take(HEATMAP_TOP_LIMIT).cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// Join scores with same-date aggregates, best overall first, unscored last.
pub fn build_heatmap(scores: &[GenreScore], aggregates: &[GenreAggregate]) -> Vec<HeatmapEntry> {
    let mut entries: Vec<HeatmapEntry> = scores
        .iter()
        .map(|score| {
            let aggregate = aggregates.iter().find(|a| {
                a.snapshot_date == score.score_date && a.genre.eq_ignore_ascii_case(&score.genre)
            });
            HeatmapEntry::new(score, aggregate)
        })
        .collect();

    entries.sort_by(|a, b| match (a.overall, b.overall) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.genre.cmp(&b.genre)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.genre.cmp(&b.genre),
    });
    entries
}

/// Week-over-week movement of one game at `date`, or at its latest snapshot.
///
/// `history` is every row captured for the game. Returns `None` when the game has
/// no row at the requested date. Without a baseline the deltas are null.
pub fn game_wow(history: &[GameSnapshotRow], date: Option<NaiveDate>) -> Option<GameWow> {
    let current = match date {
        Some(date) => history.iter().find(|row| row.snapshot_date == date)?,
        None => history.iter().max_by_key(|row| row.snapshot_date)?,
    };
    let key = current.app_id.to_string();
    let baseline = baseline_for(&key, history, current.snapshot_date).ok();
    Some(GameWow::between(current, baseline))
}

/// A tag pair listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCombination {
    pub tag_a: String,
    pub tag_b: String,
    pub snapshot_date: NaiveDate,
    pub co_occurrence_count: u32,
    /// Two decimal places
    pub correlation_strength: f64,
    pub combined_ccu: u64,
    pub avg_review_score: Option<f64>,
    pub avg_price_cents: Option<u64>,
    pub top_games: Vec<RankedGame>,
}

impl From<&TagCorrelation> for TagCombination {
    fn from(corr: &TagCorrelation) -> Self {
        Self {
            tag_a: corr.tag_a.clone(),
            tag_b: corr.tag_b.clone(),
            snapshot_date: corr.snapshot_date,
            co_occurrence_count: corr.co_occurrence_count,
            correlation_strength: round_to(corr.correlation_strength, 2),
            combined_ccu: corr.combined_ccu,
            avg_review_score: corr.avg_review_score,
            avg_price_cents: corr.avg_price_cents,
            top_games: corr.top_games.clone(),
        }
    }
}

/// Tag pairs by combined CCU, largest first.
pub fn tag_combinations(correlations: &[TagCorrelation], limit: usize) -> Vec<TagCombination> {
    let mut combos: Vec<TagCombination> = correlations.iter().map(TagCombination::from).collect();
    combos.sort_by(|a, b| {
        b.combined_ccu
            .cmp(&a.combined_ccu)
            .then_with(|| a.tag_a.cmp(&b.tag_a))
            .then_with(|| a.tag_b.cmp(&b.tag_b))
    });
    combos.truncate(limit);
    combos
}

/// A genre's weekly history with WoW deltas attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub genre: String,
    pub weeks: Vec<WeeklyTrendPoint>,
    pub overall_trend: TrendDirection,
}

/// The last `weeks` ISO weeks of `genre` ending at `anchor`.
pub fn trend_series(
    genre: &str,
    history: &[GenreAggregate],
    anchor: NaiveDate,
    weeks: u32,
) -> TrendSeries {
    let earliest = anchor - Duration::weeks(i64::from(weeks));
    let window: Vec<GenreAggregate> = history
        .iter()
        .filter(|a| a.genre.eq_ignore_ascii_case(genre))
        .filter(|a| a.snapshot_date > earliest && a.snapshot_date <= anchor)
        .cloned()
        .collect();

    let mut points = weekly_series(&window);
    let excess = points.len().saturating_sub(weeks as usize);
    points.drain(..excess);

    let overall_trend = overall_trend(&points);
    TrendSeries {
        genre: genre.to_string(),
        weeks: points,
        overall_trend,
    }
}
