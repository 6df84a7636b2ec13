//! Genre scoring: turn aggregates into 0-100 sub-scores, an overall score and a
//! recommendation.
//!
//! Sign convention: saturation, competition and discoverability are "higher =
//! worse" (more crowded, more fresh competition, harder to get noticed). They enter
//! the overall score inverted, and `timing` rewards low saturation.

use chrono::NaiveDate;

use super::metrics::percentage;
use super::trend::change_pct;
use crate::config::{ScoreWeights, ScoringConfig};
use crate::models::{
    GenreAggregate, GenreScore, Recommendation, RecordId, TrendDirection, GENRE_SCORE_KIND,
};

pub const DEFAULT_SUCCESS_REVIEW_THRESHOLD: u8 = 70;
pub const DEFAULT_STABLE_BAND_PCT: f64 = 5.0;
pub const DEFAULT_HOT_THRESHOLD: u8 = 70;
pub const DEFAULT_RISING_HOT_THRESHOLD: u8 = 60;
pub const DEFAULT_COLD_THRESHOLD: u8 = 40;

pub const DEFAULT_HOTNESS_WEIGHT: f64 = 0.20;
pub const DEFAULT_SATURATION_WEIGHT: f64 = 0.10;
pub const DEFAULT_SUCCESS_RATE_WEIGHT: f64 = 0.20;
pub const DEFAULT_TIMING_WEIGHT: f64 = 0.15;
pub const DEFAULT_GROWTH_VELOCITY_WEIGHT: f64 = 0.10;
pub const DEFAULT_COMPETITION_WEIGHT: f64 = 0.10;
pub const DEFAULT_REVENUE_POTENTIAL_WEIGHT: f64 = 0.10;
pub const DEFAULT_DISCOVERABILITY_WEIGHT: f64 = 0.05;

/// Score given when there is no peer maximum to compare against.
pub const NEUTRAL_SCORE: u8 = 50;

/// Shift applied to a signed velocity to place it on the 0-100 scale.
pub const VELOCITY_NORMALIZATION_OFFSET: f64 = 50.0;

/// Timing = openness (100 - saturation) and normalized velocity, blended.
pub const TIMING_OPENNESS_WEIGHT: f64 = 0.6;
pub const TIMING_VELOCITY_WEIGHT: f64 = 0.4;

/// Competition points added per release in the last 30 days.
pub const COMPETITION_POINTS_PER_RELEASE: u32 = 1;

/// Average price that, at 100% success, maxes out revenue potential ($30).
pub const REVENUE_REFERENCE_PRICE_CENTS: f64 = 3000.0;

/// Discoverability difficulty drops this much per tenfold increase in median reviews.
pub const DISCOVERABILITY_POINTS_PER_DECADE: f64 = 25.0;

/// Peer maxima used to normalize hotness and saturation on one score date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringContext {
    pub max_total_ccu: u64,
    pub max_game_count: u32,
}

impl ScoringContext {
    pub fn from_aggregates<'a, I>(aggregates: I) -> Self
    where
        I: IntoIterator<Item = &'a GenreAggregate>,
    {
        aggregates
            .into_iter()
            .fold(Self::default(), |ctx, agg| Self {
                max_total_ccu: ctx.max_total_ccu.max(agg.total_ccu),
                max_game_count: ctx.max_game_count.max(agg.game_count),
            })
    }
}

/// The sub-scores that feed the overall score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub hotness: u8,
    pub saturation: u8,
    pub success_rate: u8,
    pub timing: u8,
    pub growth_velocity: Option<f64>,
    pub competition: u8,
    pub revenue_potential: u8,
    pub discoverability: u8,
}

fn clamp_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// `floor(value / max * 100)` capped at 100; neutral when `max` is zero.
fn relative_score(value: f64, max: f64) -> u8 {
    if max <= 0.0 {
        return NEUTRAL_SCORE;
    }
    (value / max * 100.0).floor().clamp(0.0, 100.0) as u8
}

/// Audience size against the busiest genre of the day.
pub fn hotness(total_ccu: u64, ctx: &ScoringContext) -> u8 {
    relative_score(total_ccu as f64, ctx.max_total_ccu as f64)
}

/// Crowding against the most crowded genre of the day. Higher = more crowded.
pub fn saturation(game_count: u32, ctx: &ScoringContext) -> u8 {
    relative_score(f64::from(game_count), f64::from(ctx.max_game_count))
}

/// Percentage of the genre's games that are well reviewed.
pub fn success_rate(well_reviewed: u32, game_count: u32) -> Option<u8> {
    percentage(well_reviewed, game_count)
}

/// Signed velocity mapped onto 0-100; unknown velocity is neutral.
pub fn normalized_velocity(growth_velocity: Option<f64>) -> f64 {
    growth_velocity
        .map(|v| (v + VELOCITY_NORMALIZATION_OFFSET).clamp(0.0, 100.0))
        .unwrap_or(f64::from(NEUTRAL_SCORE))
}

/// Rewards genres that are growing and not yet saturated.
pub fn timing(saturation: u8, growth_velocity: Option<f64>) -> u8 {
    let openness = 100.0 - f64::from(saturation);
    clamp_score(
        TIMING_OPENNESS_WEIGHT * openness
            + TIMING_VELOCITY_WEIGHT * normalized_velocity(growth_velocity),
    )
}

/// Saturation plus recent release pressure. Higher = more competition.
pub fn competition(saturation: u8, releases_last_30d: u32) -> u8 {
    let release_points = releases_last_30d.saturating_mul(COMPETITION_POINTS_PER_RELEASE);
    let points = u32::from(saturation).saturating_add(release_points);
    points.min(100) as u8
}

/// Average paid price weighted by success rate, against a $30 reference.
pub fn revenue_potential(avg_price_cents: Option<u64>, success_rate: u8) -> u8 {
    let price = avg_price_cents.unwrap_or(0) as f64;
    clamp_score(price * f64::from(success_rate) / 100.0 / REVENUE_REFERENCE_PRICE_CENTS * 100.0)
}

/// Difficulty of getting noticed, inverse in the median review count.
///
/// 0 reviews → 100, 9 → 75, 99 → 50, 999 → 25, 9,999+ → 0.
pub fn discoverability(median_review_count: Option<u64>) -> u8 {
    let reviews = median_review_count.unwrap_or(0) as f64;
    clamp_score(100.0 - DISCOVERABILITY_POINTS_PER_DECADE * (reviews + 1.0).log10())
}

/// Direction of a WoW change against a symmetric stability band (inclusive).
pub fn trend_direction(
    growth_velocity: Option<f64>,
    stable_band_pct: f64,
) -> Option<TrendDirection> {
    growth_velocity.map(|v| {
        if v > stable_band_pct {
            TrendDirection::Rising
        } else if v < -stable_band_pct {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    })
}

/// Weighted combination of the sub-scores, "higher = worse" ones inverted.
pub fn overall(scores: &SubScores, weights: &ScoreWeights) -> u8 {
    let inverted = |s: u8| 100.0 - f64::from(s);
    let total = weights.hotness * f64::from(scores.hotness)
        + weights.saturation * inverted(scores.saturation)
        + weights.success_rate * f64::from(scores.success_rate)
        + weights.timing * f64::from(scores.timing)
        + weights.growth_velocity * normalized_velocity(scores.growth_velocity)
        + weights.competition * inverted(scores.competition)
        + weights.revenue_potential * f64::from(scores.revenue_potential)
        + weights.discoverability * inverted(scores.discoverability);
    clamp_score(total)
}

/// Threshold the overall score and trend into a verdict.
pub fn recommendation(
    overall: Option<u8>,
    trend: Option<TrendDirection>,
    config: &ScoringConfig,
) -> Recommendation {
    let Some(overall) = overall else {
        return Recommendation::Unknown;
    };

    if trend == Some(TrendDirection::Declining) || overall < config.cold_threshold {
        Recommendation::Cold
    } else if overall >= config.hot_threshold
        || (trend == Some(TrendDirection::Rising) && overall >= config.rising_hot_threshold)
    {
        Recommendation::Hot
    } else {
        Recommendation::Warm
    }
}

/// Compute every sub-score for `current`.
///
/// `previous` is the WoW baseline chosen by the caller; without it velocity and
/// trend are null. A genre with no games scores `unknown` across the board.
pub fn score_genre(
    current: &GenreAggregate,
    previous: Option<&GenreAggregate>,
    ctx: &ScoringContext,
    config: &ScoringConfig,
) -> GenreScore {
    if current.is_empty() {
        return GenreScore::unknown(current.genre.clone(), current.snapshot_date);
    }

    let growth_velocity = change_pct(
        current.total_ccu as f64,
        previous.map(|p| p.total_ccu as f64),
    );
    let saturation = saturation(current.game_count, ctx);
    let success_rate = success_rate(current.well_reviewed_count, current.game_count).unwrap_or(0);

    let scores = SubScores {
        hotness: hotness(current.total_ccu, ctx),
        saturation,
        success_rate,
        timing: timing(saturation, growth_velocity),
        growth_velocity,
        competition: competition(saturation, current.releases_last_30d),
        revenue_potential: revenue_potential(current.avg_price_cents, success_rate),
        discoverability: discoverability(current.median_review_count),
    };
    let overall = overall(&scores, &config.weights);
    let trend_direction = trend_direction(growth_velocity, config.stable_band_pct);

    GenreScore {
        id: score_id(&current.genre, current.snapshot_date),
        genre: current.genre.clone(),
        score_date: current.snapshot_date,
        hotness: Some(scores.hotness),
        saturation: Some(scores.saturation),
        success_rate: Some(scores.success_rate),
        timing: Some(scores.timing),
        growth_velocity,
        competition: Some(scores.competition),
        revenue_potential: Some(scores.revenue_potential),
        discoverability: Some(scores.discoverability),
        overall: Some(overall),
        trend_direction,
        recommendation: recommendation(Some(overall), trend_direction, config),
    }
}

fn score_id(genre: &str, date: NaiveDate) -> RecordId {
    RecordId::for_genre(GENRE_SCORE_KIND, genre, date)
}
