//! Tag co-occurrence records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{RankedGame, RecordId};

/// Record kind used when hashing correlation IDs.
pub const TAG_CORRELATION_KIND: &str = "tag_correlation";

/// An unordered pair of tags, stored in case-insensitive lexicographic order.
///
/// `TagPair::new("B", "A")` and `TagPair::new("A", "B")` are equal. Ties on the
/// folded form fall back to the raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagPair {
    tag_a: String,
    tag_b: String,
}

impl TagPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        let (first, second) = (first.into(), second.into());
        let folded = first.to_lowercase().cmp(&second.to_lowercase());
        if folded.then_with(|| first.cmp(&second)).is_le() {
            Self {
                tag_a: first,
                tag_b: second,
            }
        } else {
            Self {
                tag_a: second,
                tag_b: first,
            }
        }
    }

    pub fn tag_a(&self) -> &str {
        &self.tag_a
    }

    pub fn tag_b(&self) -> &str {
        &self.tag_b
    }
}

impl std::fmt::Display for TagPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} + {}", self.tag_a, self.tag_b)
    }
}

/// Overlap statistics for a tag pair at a snapshot date.
///
/// A stored correlation always has at least one co-occurring game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCorrelation {
    /// Hash of (tag_a, tag_b, snapshot_date)
    pub id: RecordId,

    pub tag_a: String,

    pub tag_b: String,

    pub snapshot_date: NaiveDate,

    /// Games carrying both tags
    pub co_occurrence_count: u32,

    /// Share of the smaller tag's games that carry the other tag, 0.0 to 1.0
    pub correlation_strength: f64,

    pub combined_ccu: u64,

    /// Mean over reviewed games, one decimal
    pub avg_review_score: Option<f64>,

    /// Mean over paid games
    pub avg_price_cents: Option<u64>,

    pub top_games: Vec<RankedGame>,
}

impl TagCorrelation {
    pub fn record_id(pair: &TagPair, snapshot_date: NaiveDate) -> RecordId {
        RecordId::generate(
            TAG_CORRELATION_KIND,
            &[pair.tag_a(), pair.tag_b(), &snapshot_date.to_string()],
        )
    }

    pub fn pair(&self) -> TagPair {
        TagPair::new(self.tag_a.clone(), self.tag_b.clone())
    }
}
