//! Genre aggregation: reduce one genre's snapshot rows to a `GenreAggregate`.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::metrics::{
    average_age_days, bucket_prices, count_within_window, mean, median, percentage, round_to,
};
use super::scoring::DEFAULT_SUCCESS_REVIEW_THRESHOLD;
use super::EngineError;
use crate::models::{GameSnapshotRow, GenreAggregate, RankedGame, TagCount};

/// Co-occurring tags kept per aggregate.
pub const DEFAULT_TOP_TAGS: usize = 10;

/// Games kept in an aggregate's top-by-CCU list.
pub const DEFAULT_TOP_GAMES: usize = 10;

/// Share of buyers assumed to pay full price in the revenue heuristic.
pub const REVENUE_CONSERVATIVE_MULTIPLIER: f64 = 0.5;

pub const RECENT_RELEASE_WINDOW_DAYS: i64 = 30;
pub const QUARTER_RELEASE_WINDOW_DAYS: i64 = 90;

/// Tunables for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    pub top_tags_limit: usize,
    pub top_games_limit: usize,
    /// Minimum review score for a game to count as well reviewed
    pub success_review_threshold: u8,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            top_tags_limit: DEFAULT_TOP_TAGS,
            top_games_limit: DEFAULT_TOP_GAMES,
            success_review_threshold: DEFAULT_SUCCESS_REVIEW_THRESHOLD,
        }
    }
}

/// An aggregate plus the rows that were rejected while building it.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub aggregate: GenreAggregate,
    /// Always `EngineError::MalformedRow`
    pub rejected: Vec<EngineError>,
}

/// Check a row's invariants against the snapshot it is aggregated into.
pub fn validate_row(row: &GameSnapshotRow, snapshot_date: NaiveDate) -> Result<(), EngineError> {
    if row.snapshot_date != snapshot_date {
        return Err(EngineError::malformed(
            row.app_id,
            format!(
                "snapshot date {} does not match {}",
                row.snapshot_date, snapshot_date
            ),
        ));
    }
    if let Some(owners) = row.owners {
        if !owners.is_ordered() {
            return Err(EngineError::malformed(
                row.app_id,
                format!("owners_min {} > owners_max {}", owners.min, owners.max),
            ));
        }
    }
    if row.discount_percent > 100 {
        return Err(EngineError::malformed(
            row.app_id,
            format!("discount {}% out of range", row.discount_percent),
        ));
    }
    Ok(())
}

/// Boxleiter-style gross revenue estimate for one game, in cents:
/// `floor((owners_min + owners_max) / 2 * price * 0.5)`.
///
/// A deliberately conservative lower bound, not a calibrated model. The flat
/// multiplier ignores game age, regional pricing and discount history.
/// Unknown ownership contributes nothing.
pub fn estimate_revenue_cents(row: &GameSnapshotRow) -> u64 {
    match row.owners {
        Some(owners) => {
            let midpoint = (owners.min as f64 + owners.max as f64) / 2.0;
            (midpoint * row.price_cents as f64 * REVENUE_CONSERVATIVE_MULTIPLIER).floor() as u64
        }
        None => 0,
    }
}

/// Tags ranked by how many games carry them, ties by name, excluding `genre`.
pub fn top_co_occurring_tags(
    rows: &[&GameSnapshotRow],
    genre: &str,
    limit: usize,
) -> Vec<TagCount> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for row in rows {
        for tag in &row.tags {
            if tag.eq_ignore_ascii_case(genre) {
                continue;
            }
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }

    let mut ranked: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    ranked.truncate(limit);
    ranked
}

/// Games ranked by CCU descending, ties by app id ascending.
pub fn top_games_by_ccu(rows: &[&GameSnapshotRow], limit: usize) -> Vec<RankedGame> {
    let mut sorted: Vec<&GameSnapshotRow> = rows.to_vec();
    sorted.sort_by(|a, b| b.ccu.cmp(&a.ccu).then_with(|| a.app_id.cmp(&b.app_id)));
    sorted
        .into_iter()
        .take(limit)
        .map(RankedGame::from)
        .collect()
}

/// Aggregate every row of a genre at a snapshot date.
///
/// Deterministic in its input set. Rows that break an invariant are left out and
/// reported in `rejected`; the rest still aggregate. An app id that appears more
/// than once has all of its rows rejected.
pub fn aggregate_genre(
    genre: &str,
    snapshot_date: NaiveDate,
    rows: &[GameSnapshotRow],
    options: &AggregateOptions,
) -> AggregateOutcome {
    let mut rejected = Vec::new();
    let mut checked: Vec<&GameSnapshotRow> = Vec::with_capacity(rows.len());
    for row in rows {
        match validate_row(row, snapshot_date) {
            Ok(()) => checked.push(row),
            Err(e) => rejected.push(e),
        }
    }

    // Every copy of a repeated app id is dropped, so the result never depends on row order.
    let mut copies: HashMap<u32, usize> = HashMap::new();
    for row in &checked {
        *copies.entry(row.app_id).or_default() += 1;
    }
    let mut valid: Vec<&GameSnapshotRow> = Vec::with_capacity(checked.len());
    for row in checked {
        if copies.get(&row.app_id).copied().unwrap_or(0) > 1 {
            rejected.push(EngineError::malformed(row.app_id, "duplicate app id in snapshot"));
        } else {
            valid.push(row);
        }
    }

    let mut aggregate = GenreAggregate::empty(genre, snapshot_date);
    if valid.is_empty() {
        return AggregateOutcome {
            aggregate,
            rejected,
        };
    }

    let game_count = valid.len() as u32;
    aggregate.game_count = game_count;

    // Audience
    aggregate.total_ccu = valid.iter().map(|r| r.ccu).sum();
    let ccus: Vec<f64> = valid.iter().map(|r| r.ccu as f64).collect();
    aggregate.avg_ccu = mean(&ccus).ok().map(|v| round_to(v, 1));
    aggregate.total_owners_estimate = valid
        .iter()
        .filter_map(|r| r.owners)
        .fold(0u64, |acc, o| acc.saturating_add(o.midpoint()));

    // Reviews
    let review_scores: Vec<f64> = valid
        .iter()
        .filter_map(|r| r.review_score())
        .map(f64::from)
        .collect();
    aggregate.avg_review_score = mean(&review_scores).ok().map(|v| round_to(v, 1));
    aggregate.median_review_score = median(&review_scores).ok().map(|v| round_to(v, 1));
    aggregate.well_reviewed_count = valid
        .iter()
        .filter(|r| matches!(r.review_score(), Some(s) if s >= options.success_review_threshold))
        .count() as u32;
    let review_counts: Vec<f64> = valid
        .iter()
        .map(|r| r.review_count())
        .filter(|c| *c > 0)
        .map(|c| c as f64)
        .collect();
    aggregate.median_review_count = median(&review_counts).ok().map(|v| v as u64);

    // Pricing
    let prices: Vec<u64> = valid.iter().map(|r| r.price_cents).collect();
    let paid: Vec<f64> = prices.iter().filter(|p| **p > 0).map(|p| *p as f64).collect();
    aggregate.avg_price_cents = mean(&paid).ok().map(|v| v as u64);
    aggregate.median_price_cents = median(&paid).ok().map(|v| v as u64);
    aggregate.price_distribution = bucket_prices(&prices);

    // Release activity
    let release_dates = || valid.iter().filter_map(|r| r.release_date);
    aggregate.releases_last_30d =
        count_within_window(release_dates(), snapshot_date, RECENT_RELEASE_WINDOW_DAYS);
    aggregate.releases_last_90d =
        count_within_window(release_dates(), snapshot_date, QUARTER_RELEASE_WINDOW_DAYS);
    aggregate.avg_game_age_days =
        average_age_days(valid.iter().map(|r| r.release_date), snapshot_date)
            .ok()
            .map(|d| d.round() as u32);

    aggregate.early_access_count = valid.iter().filter(|r| r.is_early_access()).count() as u32;
    aggregate.early_access_pct = percentage(aggregate.early_access_count, game_count);

    aggregate.top_tags = top_co_occurring_tags(&valid, genre, options.top_tags_limit);
    aggregate.top_games = top_games_by_ccu(&valid, options.top_games_limit);
    aggregate.revenue_estimate_cents = valid
        .iter()
        .map(|r| estimate_revenue_cents(r))
        .fold(0u64, u64::saturating_add);

    AggregateOutcome {
        aggregate,
        rejected,
    }
}
