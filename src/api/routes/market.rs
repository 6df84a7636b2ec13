use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::trend::{trending as wow_movers, GameWow, GenreWow};
use crate::storage::SnapshotSource;
use crate::views::{
    build_heatmap, game_wow, tag_combinations, trend_series, HeatmapEntry, TagCombination,
    TrendSeries, DEFAULT_TAG_COMBO_LIMIT, DEFAULT_TREND_WEEKS,
};

const MAX_TAG_COMBO_LIMIT: usize = 100;
const MAX_TREND_WEEKS: u32 = 52;

// ── Heatmap ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HeatmapParams {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct HeatmapResponse {
    pub score_date: Option<NaiveDate>,
    pub genres: Vec<HeatmapEntry>,
}

pub async fn heatmap(
    State(state): State<AppState>,
    Query(params): Query<HeatmapParams>,
) -> Result<Json<HeatmapResponse>, ApiError> {
    let scores = state.store.scores()?;

    let score_date = match params.date {
        Some(date) => {
            if !scores.iter().any(|s| s.score_date == date) {
                return Err(ApiError::NotFound(format!("no scores for {}", date)));
            }
            Some(date)
        }
        None => scores.iter().map(|s| s.score_date).max(),
    };

    let Some(date) = score_date else {
        return Ok(Json(HeatmapResponse {
            score_date: None,
            genres: Vec::new(),
        }));
    };

    let day_scores: Vec<_> = scores.into_iter().filter(|s| s.score_date == date).collect();
    let aggregates = state.store.aggregates_on(date)?;

    Ok(Json(HeatmapResponse {
        score_date: Some(date),
        genres: build_heatmap(&day_scores, &aggregates),
    }))
}

// ── Tag Combinations ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TagComboParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TagComboResponse {
    pub snapshot_date: Option<NaiveDate>,
    pub combinations: Vec<TagCombination>,
}

pub async fn tag_combos(
    State(state): State<AppState>,
    Query(params): Query<TagComboParams>,
) -> Result<Json<TagComboResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TAG_COMBO_LIMIT)
        .clamp(1, MAX_TAG_COMBO_LIMIT);

    let correlations = state.store.correlations()?;
    let snapshot_date = correlations.iter().map(|c| c.snapshot_date).max();
    let latest: Vec<_> = correlations
        .into_iter()
        .filter(|c| Some(c.snapshot_date) == snapshot_date)
        .collect();

    Ok(Json(TagComboResponse {
        snapshot_date,
        combinations: tag_combinations(&latest, limit),
    }))
}

// ── Weekly Trends ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TrendsParams {
    pub genre: Option<String>,
    pub weeks: Option<u32>,
}

pub async fn trends(
    State(state): State<AppState>,
    Query(params): Query<TrendsParams>,
) -> Result<Json<TrendSeries>, ApiError> {
    let genre = params
        .genre
        .filter(|g| !g.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("genre is required".to_string()))?;
    let weeks = params
        .weeks
        .unwrap_or(DEFAULT_TREND_WEEKS)
        .clamp(1, MAX_TREND_WEEKS);

    let aggregates = state.store.aggregates()?;
    let anchor = aggregates
        .iter()
        .map(|a| a.snapshot_date)
        .max()
        .ok_or_else(|| ApiError::NotFound("no aggregates computed yet".to_string()))?;

    if !aggregates.iter().any(|a| a.genre.eq_ignore_ascii_case(&genre)) {
        return Err(ApiError::NotFound(format!("genre {:?}", genre)));
    }

    Ok(Json(trend_series(&genre, &aggregates, anchor, weeks)))
}

// ── Trending ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TrendingResponse {
    pub snapshot_date: Option<NaiveDate>,
    pub genres: Vec<GenreWow>,
}

pub async fn trending(State(state): State<AppState>) -> Result<Json<TrendingResponse>, ApiError> {
    let aggregates = state.store.aggregates()?;
    let snapshot_date = aggregates.iter().map(|a| a.snapshot_date).max();

    let current: Vec<_> = aggregates
        .iter()
        .filter(|a| Some(a.snapshot_date) == snapshot_date)
        .cloned()
        .collect();

    Ok(Json(TrendingResponse {
        snapshot_date,
        genres: wow_movers(&current, &aggregates),
    }))
}

// ── Game WoW ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GameWowParams {
    pub date: Option<NaiveDate>,
}

pub async fn game_wow_detail(
    State(state): State<AppState>,
    Path(app_id): Path<u32>,
    Query(params): Query<GameWowParams>,
) -> Result<Json<GameWow>, ApiError> {
    let history = state.store.game_history(app_id)?;

    game_wow(&history, params.date).map(Json).ok_or_else(|| match params.date {
        Some(date) => ApiError::NotFound(format!("app {} on {}", app_id, date)),
        None => ApiError::NotFound(format!("app {}", app_id)),
    })
}
