//! Genre-level aggregate records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{GameSnapshotRow, RecordId};

/// Record kind used when hashing aggregate IDs.
pub const GENRE_AGGREGATE_KIND: &str = "genre_aggregate";

/// Fixed price bands, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceBucket {
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "under_5")]
    Under5,
    #[serde(rename = "5_to_10")]
    From5To10,
    #[serde(rename = "10_to_20")]
    From10To20,
    #[serde(rename = "20_to_30")]
    From20To30,
    #[serde(rename = "over_30")]
    Over30,
}

impl PriceBucket {
    pub const ALL: [PriceBucket; 6] = [
        PriceBucket::Free,
        PriceBucket::Under5,
        PriceBucket::From5To10,
        PriceBucket::From10To20,
        PriceBucket::From20To30,
        PriceBucket::Over30,
    ];

    /// The single band a price falls in.
    pub fn for_price(price_cents: u64) -> Self {
        match price_cents {
            0 => PriceBucket::Free,
            1..=499 => PriceBucket::Under5,
            500..=999 => PriceBucket::From5To10,
            1000..=1999 => PriceBucket::From10To20,
            2000..=2999 => PriceBucket::From20To30,
            _ => PriceBucket::Over30,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriceBucket::Free => "free",
            PriceBucket::Under5 => "under_5",
            PriceBucket::From5To10 => "5_to_10",
            PriceBucket::From10To20 => "10_to_20",
            PriceBucket::From20To30 => "20_to_30",
            PriceBucket::Over30 => "over_30",
        }
    }
}

impl std::fmt::Display for PriceBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Count of games per price band. All six bands are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDistribution {
    pub free: u32,
    pub under_5: u32,
    #[serde(rename = "5_to_10")]
    pub from_5_to_10: u32,
    #[serde(rename = "10_to_20")]
    pub from_10_to_20: u32,
    #[serde(rename = "20_to_30")]
    pub from_20_to_30: u32,
    pub over_30: u32,
}

impl PriceDistribution {
    pub fn get(&self, bucket: PriceBucket) -> u32 {
        match bucket {
            PriceBucket::Free => self.free,
            PriceBucket::Under5 => self.under_5,
            PriceBucket::From5To10 => self.from_5_to_10,
            PriceBucket::From10To20 => self.from_10_to_20,
            PriceBucket::From20To30 => self.from_20_to_30,
            PriceBucket::Over30 => self.over_30,
        }
    }

    pub fn increment(&mut self, bucket: PriceBucket) {
        let slot = match bucket {
            PriceBucket::Free => &mut self.free,
            PriceBucket::Under5 => &mut self.under_5,
            PriceBucket::From5To10 => &mut self.from_5_to_10,
            PriceBucket::From10To20 => &mut self.from_10_to_20,
            PriceBucket::From20To30 => &mut self.from_20_to_30,
            PriceBucket::Over30 => &mut self.over_30,
        };
        *slot += 1;
    }

    /// Sum over all bands.
    pub fn total(&self) -> u32 {
        PriceBucket::ALL.iter().map(|b| self.get(*b)).sum()
    }
}

/// A tag and how many games in the set carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u32,
}

/// A game summary used in "top games by CCU" lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedGame {
    pub app_id: u32,
    pub name: String,
    pub ccu: u64,
    pub review_score: Option<u8>,
    pub price_cents: u64,
}

impl From<&GameSnapshotRow> for RankedGame {
    fn from(row: &GameSnapshotRow) -> Self {
        Self {
            app_id: row.app_id,
            name: row.name.clone(),
            ccu: row.ccu,
            review_score: row.review_score(),
            price_cents: row.price_cents,
        }
    }
}

/// Everything known about one genre at one snapshot date.
///
/// Counts and sums are zero for an empty genre; ratio fields are `None` so
/// "no data" stays distinct from a measured zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreAggregate {
    /// Hash of (genre, snapshot_date)
    pub id: RecordId,

    pub genre: String,

    pub snapshot_date: NaiveDate,

    pub game_count: u32,

    pub total_ccu: u64,

    /// Mean CCU per game, one decimal
    pub avg_ccu: Option<f64>,

    /// Sum of ownership midpoints
    pub total_owners_estimate: u64,

    /// Mean review score over reviewed games, one decimal
    pub avg_review_score: Option<f64>,

    pub median_review_score: Option<f64>,

    /// Games whose review score clears the success threshold
    pub well_reviewed_count: u32,

    /// Mean over paid games
    pub avg_price_cents: Option<u64>,

    /// Median over paid games
    pub median_price_cents: Option<u64>,

    pub price_distribution: PriceDistribution,

    pub releases_last_30d: u32,

    pub releases_last_90d: u32,

    pub early_access_count: u32,

    /// Whole percentage 0-100
    pub early_access_pct: Option<u8>,

    pub median_review_count: Option<u64>,

    pub avg_game_age_days: Option<u32>,

    /// Most frequent co-occurring tags, excluding the genre itself
    pub top_tags: Vec<TagCount>,

    /// Highest-CCU games
    pub top_games: Vec<RankedGame>,

    /// Conservative gross revenue estimate, see `calculate::genre::estimate_revenue_cents`
    pub revenue_estimate_cents: u64,
}

impl GenreAggregate {
    /// The aggregate of a genre with no games at that date.
    pub fn empty(genre: impl Into<String>, snapshot_date: NaiveDate) -> Self {
        let genre = genre.into();
        Self {
            id: RecordId::for_genre(GENRE_AGGREGATE_KIND, &genre, snapshot_date),
            genre,
            snapshot_date,
            game_count: 0,
            total_ccu: 0,
            avg_ccu: None,
            total_owners_estimate: 0,
            avg_review_score: None,
            median_review_score: None,
            well_reviewed_count: 0,
            avg_price_cents: None,
            median_price_cents: None,
            price_distribution: PriceDistribution::default(),
            releases_last_30d: 0,
            releases_last_90d: 0,
            early_access_count: 0,
            early_access_pct: None,
            median_review_count: None,
            avg_game_age_days: None,
            top_tags: Vec::new(),
            top_games: Vec::new(),
            revenue_estimate_cents: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.game_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_bucket_boundaries() {
        assert_eq!(PriceBucket::for_price(0), PriceBucket::Free);
        assert_eq!(PriceBucket::for_price(1), PriceBucket::Under5);
        assert_eq!(PriceBucket::for_price(499), PriceBucket::Under5);
        assert_eq!(PriceBucket::for_price(500), PriceBucket::From5To10);
        assert_eq!(PriceBucket::for_price(999), PriceBucket::From5To10);
        assert_eq!(PriceBucket::for_price(1000), PriceBucket::From10To20);
        assert_eq!(PriceBucket::for_price(1999), PriceBucket::From10To20);
        assert_eq!(PriceBucket::for_price(2000), PriceBucket::From20To30);
        assert_eq!(PriceBucket::for_price(2999), PriceBucket::From20To30);
        assert_eq!(PriceBucket::for_price(3000), PriceBucket::Over30);
        assert_eq!(PriceBucket::for_price(u64::MAX), PriceBucket::Over30);
    }

    #[test]
    fn test_price_distribution_serializes_all_labels() {
        let json = serde_json::to_value(PriceDistribution::default()).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 6);
        for bucket in PriceBucket::ALL {
            assert_eq!(obj[bucket.label()], 0);
        }
    }

    #[test]
    fn test_empty_aggregate_has_null_ratios() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let agg = GenreAggregate::empty("Roguelike", date);

        assert!(agg.is_empty());
        assert_eq!(agg.total_ccu, 0);
        assert_eq!(agg.avg_ccu, None);
        assert_eq!(agg.early_access_pct, None);
        assert_eq!(agg.price_distribution.total(), 0);

        let json = serde_json::to_value(&agg).unwrap();
        assert!(json["avg_ccu"].is_null());
        assert_eq!(json["game_count"], 0);
    }
}
