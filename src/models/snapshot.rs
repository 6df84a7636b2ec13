//! Raw per-game snapshot rows.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Tag that marks a game as Early Access even when the flag is missing.
pub const EARLY_ACCESS_TAG: &str = "Early Access";

/// Error parsing a textual ownership range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid owners range: {0:?}")]
pub struct ParseOwnersError(pub String);

/// Estimated ownership bracket, e.g. 20,000 .. 50,000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnersRange {
    pub min: u64,
    pub max: u64,
}

impl OwnersRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Integer midpoint of the bracket.
    pub fn midpoint(&self) -> u64 {
        self.min / 2 + self.max / 2 + (self.min % 2 + self.max % 2) / 2
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

impl FromStr for OwnersRange {
    type Err = ParseOwnersError;

    /// Parse the store-style form `"100,000 .. 200,000"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.replace(',', "");
        let (min, max) = cleaned
            .split_once("..")
            .ok_or_else(|| ParseOwnersError(s.to_string()))?;
        let min = min
            .trim()
            .parse()
            .map_err(|_| ParseOwnersError(s.to_string()))?;
        let max = max
            .trim()
            .parse()
            .map_err(|_| ParseOwnersError(s.to_string()))?;
        Ok(Self { min, max })
    }
}

/// Ownership as found in imported data: structured, textual, or absent.
#[derive(Deserialize)]
#[serde(untagged)]
enum OwnersField {
    Range(OwnersRange),
    Text(String),
}

/// Accept either `{"min":..,"max":..}` or `"min .. max"`; unparseable text is unknown.
fn deserialize_owners<'de, D>(deserializer: D) -> Result<Option<OwnersRange>, D::Error>
where
    D: Deserializer<'de>,
{
    let field: Option<OwnersField> = Option::deserialize(deserializer)?;
    Ok(match field {
        Some(OwnersField::Range(range)) => Some(range),
        Some(OwnersField::Text(text)) => text.parse().ok(),
        None => None,
    })
}

/// One game's metrics at one snapshot date. One row per (app id, snapshot date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshotRow {
    /// Store app id
    pub app_id: u32,

    pub name: String,

    /// Date the snapshot was captured
    pub snapshot_date: NaiveDate,

    #[serde(default)]
    pub genres: BTreeSet<String>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Full price in cents
    #[serde(default)]
    pub price_cents: u64,

    /// Current discount, 0-100
    #[serde(default)]
    pub discount_percent: u8,

    /// Ownership bracket (None when unknown)
    #[serde(default, deserialize_with = "deserialize_owners")]
    pub owners: Option<OwnersRange>,

    /// Concurrent users at capture time
    #[serde(default)]
    pub ccu: u64,

    #[serde(default)]
    pub reviews_positive: u64,

    #[serde(default)]
    pub reviews_negative: u64,

    #[serde(default)]
    pub release_date: Option<NaiveDate>,

    #[serde(default)]
    pub early_access: bool,
}

impl GameSnapshotRow {
    /// Create a row with zeroed metrics; fill in with the `with_*` builders.
    pub fn new(app_id: u32, name: impl Into<String>, snapshot_date: NaiveDate) -> Self {
        Self {
            app_id,
            name: name.into(),
            snapshot_date,
            genres: BTreeSet::new(),
            tags: BTreeSet::new(),
            price_cents: 0,
            discount_percent: 0,
            owners: None,
            ccu: 0,
            reviews_positive: 0,
            reviews_negative: 0,
            release_date: None,
            early_access: false,
        }
    }

    pub fn with_genres(mut self, genres: &[&str]) -> Self {
        self.genres = genres.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_price(mut self, price_cents: u64) -> Self {
        self.price_cents = price_cents;
        self
    }

    pub fn with_owners(mut self, min: u64, max: u64) -> Self {
        self.owners = Some(OwnersRange::new(min, max));
        self
    }

    pub fn with_ccu(mut self, ccu: u64) -> Self {
        self.ccu = ccu;
        self
    }

    pub fn with_reviews(mut self, positive: u64, negative: u64) -> Self {
        self.reviews_positive = positive;
        self.reviews_negative = negative;
        self
    }

    pub fn with_release_date(mut self, date: NaiveDate) -> Self {
        self.release_date = Some(date);
        self
    }

    pub fn with_early_access(mut self, early_access: bool) -> Self {
        self.early_access = early_access;
        self
    }

    /// Total number of reviews.
    pub fn review_count(&self) -> u64 {
        self.reviews_positive + self.reviews_negative
    }

    /// Share of positive reviews as a whole percentage, None without reviews.
    pub fn review_score(&self) -> Option<u8> {
        let total = self.review_count();
        if total == 0 {
            return None;
        }
        let pct = (self.reviews_positive as f64 / total as f64 * 100.0).round();
        Some(pct as u8)
    }

    pub fn is_early_access(&self) -> bool {
        self.early_access || self.has_tag(EARLY_ACCESS_TAG)
    }

    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// A row belongs to a genre when the name is one of its genres or tags.
    pub fn in_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre)) || self.has_tag(genre)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_owners_from_str() {
        let range: OwnersRange = "100,000 .. 200,000".parse().unwrap();
        assert_eq!(range, OwnersRange::new(100_000, 200_000));

        let range: OwnersRange = "0 .. 20,000".parse().unwrap();
        assert_eq!(range, OwnersRange::new(0, 20_000));
    }

    #[test]
    fn test_owners_from_str_invalid() {
        assert!("lots".parse::<OwnersRange>().is_err());
        assert!("10 .. many".parse::<OwnersRange>().is_err());
        assert!("".parse::<OwnersRange>().is_err());
    }

    #[test]
    fn test_owners_midpoint() {
        assert_eq!(OwnersRange::new(0, 1000).midpoint(), 500);
        assert_eq!(OwnersRange::new(5000, 10000).midpoint(), 7500);
        assert_eq!(OwnersRange::new(1, 2).midpoint(), 1);
        assert_eq!(OwnersRange::new(u64::MAX, u64::MAX).midpoint(), u64::MAX);
    }

    #[test]
    fn test_review_score() {
        let row = GameSnapshotRow::new(1, "A", date()).with_reviews(90, 10);
        assert_eq!(row.review_score(), Some(90));

        let row = GameSnapshotRow::new(1, "A", date()).with_reviews(2, 1);
        assert_eq!(row.review_score(), Some(67));

        let row = GameSnapshotRow::new(1, "A", date());
        assert_eq!(row.review_score(), None);
    }

    #[test]
    fn test_early_access_from_flag_or_tag() {
        let flagged = GameSnapshotRow::new(1, "A", date()).with_early_access(true);
        let tagged = GameSnapshotRow::new(2, "B", date()).with_tags(&["early access"]);
        let neither = GameSnapshotRow::new(3, "C", date()).with_tags(&["Action"]);

        assert!(flagged.is_early_access());
        assert!(tagged.is_early_access());
        assert!(!neither.is_early_access());
    }

    #[test]
    fn test_in_genre_matches_genres_and_tags() {
        let row = GameSnapshotRow::new(1, "A", date())
            .with_genres(&["Indie"])
            .with_tags(&["Roguelike"]);

        assert!(row.in_genre("indie"));
        assert!(row.in_genre("Roguelike"));
        assert!(!row.in_genre("Puzzle"));
    }

    #[test]
    fn test_row_deserialize_textual_owners() {
        let json = r#"{"app_id":42,"name":"Hades","snapshot_date":"2025-03-10",
            "owners":"1,000,000 .. 2,000,000","ccu":1200}"#;
        let row: GameSnapshotRow = serde_json::from_str(json).unwrap();

        assert_eq!(row.owners, Some(OwnersRange::new(1_000_000, 2_000_000)));
        assert_eq!(row.ccu, 1200);
        assert!(row.tags.is_empty());
    }

    #[test]
    fn test_row_deserialize_structured_and_missing_owners() {
        let json = r#"{"app_id":1,"name":"A","snapshot_date":"2025-03-10",
            "owners":{"min":10,"max":20}}"#;
        let row: GameSnapshotRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.owners, Some(OwnersRange::new(10, 20)));

        let json = r#"{"app_id":1,"name":"A","snapshot_date":"2025-03-10"}"#;
        let row: GameSnapshotRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.owners, None);

        let json = r#"{"app_id":1,"name":"A","snapshot_date":"2025-03-10","owners":"n/a"}"#;
        let row: GameSnapshotRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.owners, None);
    }

    #[test]
    fn test_row_rejects_negative_price() {
        let json = r#"{"app_id":1,"name":"A","snapshot_date":"2025-03-10","price_cents":-5}"#;
        assert!(serde_json::from_str::<GameSnapshotRow>(json).is_err());
    }
}
