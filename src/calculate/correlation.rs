//! Tag co-occurrence: how strongly two tags travel together.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::genre::top_games_by_ccu;
use super::metrics::{mean, round_to};
use super::EngineError;
use crate::models::{GameSnapshotRow, TagCorrelation, TagPair};

/// Games kept in a correlation's top-by-CCU list.
pub const DEFAULT_CORRELATION_TOP_GAMES: usize = 5;

/// `|A ∩ B| / min(|A|, |B|)`, in [0, 1]. Zero when either side is empty.
///
/// Overlap over the smaller set, so a niche tag that always appears alongside a
/// broad one scores 1.0 rather than being diluted by the broad tag's size.
pub fn correlation_strength(common: usize, count_a: usize, count_b: usize) -> f64 {
    let smaller = count_a.min(count_b);
    if smaller == 0 {
        return 0.0;
    }
    (common.min(smaller) as f64 / smaller as f64).clamp(0.0, 1.0)
}

/// Key rows by app id, keeping the higher-CCU row when an id repeats.
fn index_by_app(rows: &[GameSnapshotRow]) -> BTreeMap<u32, &GameSnapshotRow> {
    let mut index: BTreeMap<u32, &GameSnapshotRow> = BTreeMap::new();
    for row in rows {
        index
            .entry(row.app_id)
            .and_modify(|existing| {
                if row.ccu > existing.ccu {
                    *existing = row;
                }
            })
            .or_insert(row);
    }
    index
}

/// Compare the games carrying `tag_a` with those carrying `tag_b`.
///
/// The pair is stored in canonical (case-insensitive lexicographic) order whichever way round it
/// is given. Returns `EngineError::NoOverlap` when no game carries both tags.
pub fn analyze_tag_pair(
    tag_a: &str,
    tag_b: &str,
    rows_a: &[GameSnapshotRow],
    rows_b: &[GameSnapshotRow],
    snapshot_date: NaiveDate,
    top_games_limit: usize,
) -> Result<TagCorrelation, EngineError> {
    let pair = TagPair::new(tag_a, tag_b);
    let (rows_a, rows_b) = if pair.tag_a() == tag_a {
        (rows_a, rows_b)
    } else {
        (rows_b, rows_a)
    };

    let games_a = index_by_app(rows_a);
    let games_b = index_by_app(rows_b);

    let common: Vec<&GameSnapshotRow> = games_a
        .iter()
        .filter(|(app_id, _)| games_b.contains_key(*app_id))
        .map(|(_, row)| *row)
        .collect();

    if common.is_empty() {
        return Err(EngineError::NoOverlap {
            tag_a: pair.tag_a().to_string(),
            tag_b: pair.tag_b().to_string(),
        });
    }

    let review_scores: Vec<f64> = common
        .iter()
        .filter_map(|r| r.review_score())
        .map(f64::from)
        .collect();
    let paid_prices: Vec<f64> = common
        .iter()
        .filter(|r| r.price_cents > 0)
        .map(|r| r.price_cents as f64)
        .collect();

    Ok(TagCorrelation {
        id: TagCorrelation::record_id(&pair, snapshot_date),
        tag_a: pair.tag_a().to_string(),
        tag_b: pair.tag_b().to_string(),
        snapshot_date,
        co_occurrence_count: common.len() as u32,
        correlation_strength: correlation_strength(common.len(), games_a.len(), games_b.len()),
        combined_ccu: common.iter().map(|r| r.ccu).sum(),
        avg_review_score: mean(&review_scores).ok().map(|v| round_to(v, 1)),
        avg_price_cents: mean(&paid_prices).ok().map(|v| v as u64),
        top_games: top_games_by_ccu(&common, top_games_limit),
    })
}
