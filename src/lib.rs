//! # Market Intel
//!
//! Game market intelligence from daily store snapshots: genre health scores,
//! tag co-occurrence and week-over-week trends.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (snapshot rows, aggregates, correlations, scores)
//! - **calculate**: The pure engine (metrics, aggregation, correlation, scoring, trends)
//! - **views**: Read-only views for the API
//! - **storage**: Filesystem data lake operations (JSONL)
//! - **pipeline**: Compute-and-upsert runs per snapshot date
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod views;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "1d", "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('d') {
        (n, 86_400)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num.checked_mul(multiplier)?))
}
