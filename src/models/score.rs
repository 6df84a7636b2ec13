//! Genre scores and the labels derived from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::RecordId;

/// Record kind used when hashing score IDs.
pub const GENRE_SCORE_KIND: &str = "genre_score";

/// Direction of week-over-week CCU movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Stable,
    Declining,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Rising => write!(f, "rising"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::Declining => write!(f, "declining"),
        }
    }
}

/// Headline verdict for a genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Hot,
    Warm,
    Cold,
    /// Not enough data to judge (e.g. no games)
    Unknown,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Hot => write!(f, "hot"),
            Recommendation::Warm => write!(f, "warm"),
            Recommendation::Cold => write!(f, "cold"),
            Recommendation::Unknown => write!(f, "unknown"),
        }
    }
}

/// Per-week trend label on the weekly series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Surging,
    Growing,
    Stable,
    Declining,
    Crashing,
}

/// Scores for one genre at one date.
///
/// Sub-scores are 0-100. Saturation, competition and discoverability read
/// "higher = worse": more crowded, more new competition, harder to get noticed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreScore {
    /// Hash of (genre, score_date)
    pub id: RecordId,

    pub genre: String,

    pub score_date: NaiveDate,

    pub hotness: Option<u8>,

    pub saturation: Option<u8>,

    pub success_rate: Option<u8>,

    pub timing: Option<u8>,

    /// Signed WoW change of total CCU, percent with one decimal
    pub growth_velocity: Option<f64>,

    pub competition: Option<u8>,

    pub revenue_potential: Option<u8>,

    pub discoverability: Option<u8>,

    pub overall: Option<u8>,

    pub trend_direction: Option<TrendDirection>,

    pub recommendation: Recommendation,
}

impl GenreScore {
    /// A score with every field unknown.
    pub fn unknown(genre: impl Into<String>, score_date: NaiveDate) -> Self {
        let genre = genre.into();
        Self {
            id: RecordId::for_genre(GENRE_SCORE_KIND, &genre, score_date),
            genre,
            score_date,
            hotness: None,
            saturation: None,
            success_rate: None,
            timing: None,
            growth_velocity: None,
            competition: None,
            revenue_potential: None,
            discoverability: None,
            overall: None,
            trend_direction: None,
            recommendation: Recommendation::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&TrendDirection::Rising).unwrap(),
            "\"rising\""
        );
        assert_eq!(
            serde_json::to_string(&Recommendation::Unknown).unwrap(),
            "\"unknown\""
        );
        assert_eq!(
            serde_json::to_string(&TrendLabel::Crashing).unwrap(),
            "\"crashing\""
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(TrendDirection::Declining.to_string(), "declining");
        assert_eq!(Recommendation::Warm.to_string(), "warm");
    }

    #[test]
    fn test_unknown_score() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let score = GenreScore::unknown("Cozy", date);

        assert_eq!(score.recommendation, Recommendation::Unknown);
        assert!(score.overall.is_none());
        assert!(score.trend_direction.is_none());
    }
}
