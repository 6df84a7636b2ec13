//! Week-over-week comparison and weekly trend series.
//!
//! `change_pct` is the one comparator every delta goes through, so the
//! null-versus-zero policy is the same for genres, games and weekly series.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::metrics::round_to;
use super::EngineError;
use crate::models::{GameSnapshotRow, GenreAggregate, TrendDirection, TrendLabel};

/// A baseline must be at least this many days older than the current record.
pub const WOW_LOOKBACK_DAYS: i64 = 7;

pub const SURGING_CHANGE_PCT: f64 = 20.0;
pub const GROWING_CHANGE_PCT: f64 = 10.0;
pub const DECLINING_CHANGE_PCT: f64 = -10.0;
pub const CRASHING_CHANGE_PCT: f64 = -20.0;

/// Stability band for a weekly series' overall trend.
pub const SERIES_TREND_BAND_PCT: f64 = 10.0;

/// Recent weekly changes averaged into a series' overall trend.
pub const SERIES_TREND_WINDOW: usize = 3;

/// Percent change from `previous` to `current`, one decimal.
///
/// Null when there is no baseline or the baseline is zero. Never zero-filled.
pub fn change_pct(current: f64, previous: Option<f64>) -> Option<f64> {
    match previous {
        Some(previous) if previous > 0.0 => {
            Some(round_to((current - previous) / previous * 100.0, 1))
        }
        _ => None,
    }
}

fn change_pct_u64(current: u64, previous: Option<u64>) -> Option<f64> {
    change_pct(current as f64, previous.map(|p| p as f64))
}

/// Anything positioned on a snapshot date.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl<T: Dated> Dated for &T {
    fn date(&self) -> NaiveDate {
        (**self).date()
    }
}

impl Dated for GenreAggregate {
    fn date(&self) -> NaiveDate {
        self.snapshot_date
    }
}

impl Dated for GameSnapshotRow {
    fn date(&self) -> NaiveDate {
        self.snapshot_date
    }
}

/// Latest date a WoW baseline may have.
pub fn wow_cutoff(current_date: NaiveDate) -> NaiveDate {
    current_date - Duration::days(WOW_LOOKBACK_DAYS)
}

/// The most recent record dated on or before `cutoff`. Never a later one.
pub fn latest_on_or_before<T: Dated>(history: &[T], cutoff: NaiveDate) -> Option<&T> {
    history
        .iter()
        .filter(|record| record.date() <= cutoff)
        .max_by_key(|record| record.date())
}

/// The WoW baseline for a record dated `current_date`.
pub fn baseline_for<'a, T: Dated>(
    key: &str,
    history: &'a [T],
    current_date: NaiveDate,
) -> Result<&'a T, EngineError> {
    let cutoff = wow_cutoff(current_date);
    latest_on_or_before(history, cutoff).ok_or_else(|| EngineError::MissingBaseline {
        key: key.to_string(),
        cutoff,
    })
}

/// Genre-level week-over-week deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreWow {
    pub genre: String,
    pub current_date: NaiveDate,
    pub baseline_date: Option<NaiveDate>,
    pub total_ccu: u64,
    pub previous_total_ccu: Option<u64>,
    pub ccu_change_pct: Option<f64>,
    pub game_count_change_pct: Option<f64>,
    pub revenue_change_pct: Option<f64>,
}

impl GenreWow {
    pub fn between(current: &GenreAggregate, previous: Option<&GenreAggregate>) -> Self {
        Self {
            genre: current.genre.clone(),
            current_date: current.snapshot_date,
            baseline_date: previous.map(|p| p.snapshot_date),
            total_ccu: current.total_ccu,
            previous_total_ccu: previous.map(|p| p.total_ccu),
            ccu_change_pct: change_pct_u64(current.total_ccu, previous.map(|p| p.total_ccu)),
            game_count_change_pct: change_pct(
                f64::from(current.game_count),
                previous.map(|p| f64::from(p.game_count)),
            ),
            revenue_change_pct: change_pct_u64(
                current.revenue_estimate_cents,
                previous.map(|p| p.revenue_estimate_cents),
            ),
        }
    }
}

/// Per-game week-over-week deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameWow {
    pub app_id: u32,
    pub name: String,
    pub current_date: NaiveDate,
    pub baseline_date: Option<NaiveDate>,
    pub ccu: u64,
    pub ccu_change_pct: Option<f64>,
    pub review_count: u64,
    pub review_count_change_pct: Option<f64>,
}

impl GameWow {
    pub fn between(current: &GameSnapshotRow, previous: Option<&GameSnapshotRow>) -> Self {
        Self {
            app_id: current.app_id,
            name: current.name.clone(),
            current_date: current.snapshot_date,
            baseline_date: previous.map(|p| p.snapshot_date),
            ccu: current.ccu,
            ccu_change_pct: change_pct_u64(current.ccu, previous.map(|p| p.ccu)),
            review_count: current.review_count(),
            review_count_change_pct: change_pct_u64(
                current.review_count(),
                previous.map(GameSnapshotRow::review_count),
            ),
        }
    }
}

/// One week of a genre's weekly trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTrendPoint {
    /// Monday of the ISO week
    pub week_start: NaiveDate,
    /// Date of the aggregate representing the week
    pub snapshot_date: NaiveDate,
    pub game_count: u32,
    pub total_ccu: u64,
    pub avg_review_score: Option<f64>,
    pub ccu_change_pct: Option<f64>,
    pub trend: Option<TrendLabel>,
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Label a weekly change. Null change, null label.
pub fn trend_label(change: Option<f64>) -> Option<TrendLabel> {
    change.map(|pct| {
        if pct >= SURGING_CHANGE_PCT {
            TrendLabel::Surging
        } else if pct >= GROWING_CHANGE_PCT {
            TrendLabel::Growing
        } else if pct <= CRASHING_CHANGE_PCT {
            TrendLabel::Crashing
        } else if pct <= DECLINING_CHANGE_PCT {
            TrendLabel::Declining
        } else {
            TrendLabel::Stable
        }
    })
}

/// Group one genre's aggregate history into ISO weeks, oldest first.
///
/// The latest aggregate in a week represents it. Each week's change is against the
/// latest earlier representative dated at least seven days before it, the same
/// baseline rule as any other WoW delta. Without one the change is null.
pub fn weekly_series(history: &[GenreAggregate]) -> Vec<WeeklyTrendPoint> {
    let mut weeks: BTreeMap<NaiveDate, &GenreAggregate> = BTreeMap::new();
    for agg in history {
        weeks
            .entry(week_start(agg.snapshot_date))
            .and_modify(|existing| {
                if agg.snapshot_date > existing.snapshot_date {
                    *existing = agg;
                }
            })
            .or_insert(agg);
    }

    let representatives: Vec<(NaiveDate, &GenreAggregate)> = weeks.into_iter().collect();
    representatives
        .iter()
        .enumerate()
        .map(|(i, &(week_start, agg))| {
            let earlier: Vec<&GenreAggregate> =
                representatives[..i].iter().map(|(_, a)| *a).collect();
            let baseline = latest_on_or_before(&earlier, wow_cutoff(agg.snapshot_date));
            let ccu_change_pct = change_pct_u64(agg.total_ccu, baseline.map(|b| b.total_ccu));
            WeeklyTrendPoint {
                week_start,
                snapshot_date: agg.snapshot_date,
                game_count: agg.game_count,
                total_ccu: agg.total_ccu,
                avg_review_score: agg.avg_review_score,
                ccu_change_pct,
                trend: trend_label(ccu_change_pct),
            }
        })
        .collect()
}

/// Direction of the mean of the last few weekly changes against a ±10% band.
///
/// The band edges count as movement: a mean of exactly +10% is rising.
pub fn overall_trend(points: &[WeeklyTrendPoint]) -> TrendDirection {
    if points.len() < 2 {
        return TrendDirection::Stable;
    }
    let recent: Vec<f64> = points
        .iter()
        .rev()
        .filter_map(|p| p.ccu_change_pct)
        .take(SERIES_TREND_WINDOW)
        .collect();
    if recent.is_empty() {
        return TrendDirection::Stable;
    }
    let avg = recent.iter().sum::<f64>() / recent.len() as f64;
    if avg >= SERIES_TREND_BAND_PCT {
        TrendDirection::Rising
    } else if avg <= -SERIES_TREND_BAND_PCT {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

/// WoW movement for every current aggregate that has a baseline in `history`,
/// biggest gain first. Genres without a baseline are left out.
pub fn trending(current: &[GenreAggregate], history: &[GenreAggregate]) -> Vec<GenreWow> {
    let mut movers: Vec<GenreWow> = current
        .iter()
        .filter_map(|agg| {
            let same_genre: Vec<GenreAggregate> = history
                .iter()
                .filter(|h| h.genre.eq_ignore_ascii_case(&agg.genre))
                .cloned()
                .collect();
            let baseline = baseline_for(&agg.genre, &same_genre, agg.snapshot_date).ok()?;
            let wow = GenreWow::between(agg, Some(baseline));
            wow.ccu_change_pct.is_some().then_some(wow)
        })
        .collect();

    movers.sort_by(|a, b| {
        let a_pct = a.ccu_change_pct.unwrap_or(f64::MIN);
        let b_pct = b.ccu_change_pct.unwrap_or(f64::MIN);
        b_pct.total_cmp(&a_pct).then_with(|| a.genre.cmp(&b.genre))
    });
    movers
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn aggregate(genre: &str, date: NaiveDate, total_ccu: u64) -> GenreAggregate {
        let mut agg = GenreAggregate::empty(genre, date);
        agg.total_ccu = total_ccu;
        agg.game_count = 1;
        agg
    }

    #[test]
    fn test_change_pct() {
        assert_eq!(change_pct(125.0, Some(100.0)), Some(25.0));
        assert_eq!(change_pct(75.0, Some(100.0)), Some(-25.0));
        assert_eq!(change_pct(100.0, Some(100.0)), Some(0.0));
        assert_eq!(change_pct(1.0, Some(3.0)), Some(-66.7));
    }

    #[test]
    fn test_change_pct_null_without_usable_baseline() {
        assert_eq!(change_pct(125.0, None), None);
        assert_eq!(change_pct(125.0, Some(0.0)), None);
        assert_eq!(change_pct(0.0, Some(0.0)), None);
    }

    #[test]
    fn test_baseline_never_later_than_cutoff() {
        let history = vec![
            aggregate("Roguelike", day(2025, 3, 1), 80),
            aggregate("Roguelike", day(2025, 3, 3), 100),
            aggregate("Roguelike", day(2025, 3, 5), 120),
        ];

        // Cutoff is 2025-03-03; the 03-05 record is too recent.
        let baseline = baseline_for("Roguelike", &history, day(2025, 3, 10)).unwrap();
        assert_eq!(baseline.snapshot_date, day(2025, 3, 3));
    }

    #[test]
    fn test_missing_baseline() {
        let history = vec![aggregate("Roguelike", day(2025, 3, 8), 100)];

        let err = baseline_for("Roguelike", &history, day(2025, 3, 10)).unwrap_err();
        assert_eq!(
            err,
            EngineError::MissingBaseline {
                key: "Roguelike".to_string(),
                cutoff: day(2025, 3, 3),
            }
        );
    }

    #[test]
    fn test_genre_wow() {
        let previous = aggregate("Roguelike", day(2025, 3, 3), 100);
        let current = aggregate("Roguelike", day(2025, 3, 10), 125);

        let wow = GenreWow::between(&current, Some(&previous));
        assert_eq!(wow.ccu_change_pct, Some(25.0));
        assert_eq!(wow.game_count_change_pct, Some(0.0));
        assert_eq!(wow.baseline_date, Some(day(2025, 3, 3)));

        let no_baseline = GenreWow::between(&current, None);
        assert_eq!(no_baseline.ccu_change_pct, None);
        assert_eq!(no_baseline.game_count_change_pct, None);
        assert_eq!(no_baseline.previous_total_ccu, None);
    }

    #[test]
    fn test_game_wow() {
        let previous = GameSnapshotRow::new(7, "Hades Like", day(2025, 3, 3))
            .with_ccu(200)
            .with_reviews(90, 10);
        let current = GameSnapshotRow::new(7, "Hades Like", day(2025, 3, 10))
            .with_ccu(150)
            .with_reviews(140, 10);

        let wow = GameWow::between(&current, Some(&previous));
        assert_eq!(wow.ccu_change_pct, Some(-25.0));
        assert_eq!(wow.review_count, 150);
        assert_eq!(wow.review_count_change_pct, Some(50.0));

        let first_week = GameWow::between(&current, None);
        assert_eq!(first_week.ccu_change_pct, None);
        assert_eq!(first_week.review_count_change_pct, None);
    }

    #[test]
    fn test_game_wow_zero_baseline_is_null() {
        let previous = GameSnapshotRow::new(7, "New", day(2025, 3, 3));
        let current = GameSnapshotRow::new(7, "New", day(2025, 3, 10)).with_ccu(50);

        let wow = GameWow::between(&current, Some(&previous));
        assert_eq!(wow.ccu_change_pct, None);
    }

    #[test]
    fn test_week_start() {
        assert_eq!(week_start(day(2025, 3, 10)), day(2025, 3, 10));
        assert_eq!(week_start(day(2025, 3, 16)), day(2025, 3, 10));
        assert_eq!(week_start(day(2025, 3, 12)), day(2025, 3, 10));
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(trend_label(Some(20.0)), Some(TrendLabel::Surging));
        assert_eq!(trend_label(Some(19.9)), Some(TrendLabel::Growing));
        assert_eq!(trend_label(Some(10.0)), Some(TrendLabel::Growing));
        assert_eq!(trend_label(Some(0.0)), Some(TrendLabel::Stable));
        assert_eq!(trend_label(Some(-10.0)), Some(TrendLabel::Declining));
        assert_eq!(trend_label(Some(-20.0)), Some(TrendLabel::Crashing));
        assert_eq!(trend_label(None), None);
    }

    #[test]
    fn test_weekly_series_latest_per_week() {
        let history = vec![
            aggregate("Roguelike", day(2025, 3, 12), 90),
            aggregate("Roguelike", day(2025, 3, 3), 100),
            aggregate("Roguelike", day(2025, 3, 14), 110),
            aggregate("Roguelike", day(2025, 3, 17), 88),
        ];

        let series = weekly_series(&history);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].week_start, day(2025, 3, 3));
        assert_eq!(series[0].ccu_change_pct, None);
        assert_eq!(series[0].trend, None);
        assert_eq!(series[1].snapshot_date, day(2025, 3, 14));
        assert_eq!(series[1].ccu_change_pct, Some(10.0));
        assert_eq!(series[1].trend, Some(TrendLabel::Growing));
        // 03-14 is only three days before 03-17, so the baseline is 03-03.
        assert_eq!(series[2].ccu_change_pct, Some(-12.0));
        assert_eq!(series[2].trend, Some(TrendLabel::Declining));
    }

    #[test]
    fn test_weekly_series_skips_baseline_inside_seven_days() {
        let history = vec![
            aggregate("Roguelike", day(2025, 3, 9), 100),
            aggregate("Roguelike", day(2025, 3, 10), 150),
            aggregate("Roguelike", day(2025, 3, 17), 180),
        ];

        let series = weekly_series(&history);

        assert_eq!(series.len(), 3);
        assert_eq!(series[1].snapshot_date, day(2025, 3, 10));
        assert_eq!(series[1].ccu_change_pct, None);
        assert_eq!(series[1].trend, None);
        assert_eq!(series[2].ccu_change_pct, Some(20.0));
    }

    #[test]
    fn test_weekly_series_zero_week_breaks_chain() {
        let history = vec![
            aggregate("Cozy", day(2025, 3, 3), 0),
            aggregate("Cozy", day(2025, 3, 10), 40),
        ];

        let series = weekly_series(&history);
        assert_eq!(series[1].ccu_change_pct, None);
    }

    #[test]
    fn test_overall_trend() {
        let rising = weekly_series(&[
            aggregate("A", day(2025, 3, 3), 100),
            aggregate("A", day(2025, 3, 10), 120),
            aggregate("A", day(2025, 3, 17), 150),
        ]);
        assert_eq!(overall_trend(&rising), TrendDirection::Rising);

        let falling = weekly_series(&[
            aggregate("A", day(2025, 3, 3), 100),
            aggregate("A", day(2025, 3, 10), 70),
        ]);
        assert_eq!(overall_trend(&falling), TrendDirection::Declining);

        let flat = weekly_series(&[
            aggregate("A", day(2025, 3, 3), 100),
            aggregate("A", day(2025, 3, 10), 105),
        ]);
        assert_eq!(overall_trend(&flat), TrendDirection::Stable);
    }

    #[test]
    fn test_overall_trend_band_edges_count_as_movement() {
        let up = weekly_series(&[
            aggregate("A", day(2025, 3, 3), 100),
            aggregate("A", day(2025, 3, 10), 110),
        ]);
        assert_eq!(up[1].ccu_change_pct, Some(10.0));
        assert_eq!(overall_trend(&up), TrendDirection::Rising);

        let down = weekly_series(&[
            aggregate("A", day(2025, 3, 3), 100),
            aggregate("A", day(2025, 3, 10), 90),
        ]);
        assert_eq!(overall_trend(&down), TrendDirection::Declining);
    }

    #[test]
    fn test_overall_trend_needs_two_weeks() {
        let single = weekly_series(&[aggregate("A", day(2025, 3, 3), 100)]);
        assert_eq!(overall_trend(&single), TrendDirection::Stable);
        assert_eq!(overall_trend(&[]), TrendDirection::Stable);
    }

    #[test]
    fn test_overall_trend_uses_last_three_changes() {
        // +100%, then three small moves; the early spike falls out of the window.
        let series = weekly_series(&[
            aggregate("A", day(2025, 3, 3), 50),
            aggregate("A", day(2025, 3, 10), 100),
            aggregate("A", day(2025, 3, 17), 102),
            aggregate("A", day(2025, 3, 24), 100),
            aggregate("A", day(2025, 3, 31), 101),
        ]);
        assert_eq!(overall_trend(&series), TrendDirection::Stable);
    }

    #[test]
    fn test_trending_sorted_and_omits_missing_baselines() {
        let date = day(2025, 3, 10);
        let history = vec![
            aggregate("Roguelike", day(2025, 3, 3), 100),
            aggregate("Survival", day(2025, 3, 3), 200),
            aggregate("Cozy", day(2025, 3, 8), 50),
        ];
        let current = vec![
            aggregate("Roguelike", date, 125),
            aggregate("Survival", date, 300),
            aggregate("Cozy", date, 80),
        ];

        let movers = trending(&current, &history);

        let genres: Vec<&str> = movers.iter().map(|m| m.genre.as_str()).collect();
        assert_eq!(genres, vec!["Survival", "Roguelike"]);
        assert_eq!(movers[0].ccu_change_pct, Some(50.0));
    }
}
