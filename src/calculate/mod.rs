//! Market intelligence engine.
//!
//! Pure, synchronous computations over caller-supplied snapshot rows:
//! - Metric primitives (mean, median, price bands, release windows)
//! - Genre aggregation and revenue estimates
//! - Tag co-occurrence analysis
//! - Genre scoring and recommendations
//! - Week-over-week comparison and weekly trend series
//!
//! Nothing here does I/O or holds shared state, so callers may run any number of
//! keys in parallel.

pub mod correlation;
pub mod genre;
pub mod metrics;
pub mod scoring;
pub mod trend;

use chrono::NaiveDate;
use thiserror::Error;

/// Recoverable conditions reported by the engine. None of them abort a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A statistical primitive received no data; the caller picks the fallback.
    #[error("{0} of an empty sequence")]
    EmptyInput(&'static str),

    /// The two tags share no game; no correlation record is emitted.
    #[error("tags {tag_a:?} and {tag_b:?} share no games")]
    NoOverlap { tag_a: String, tag_b: String },

    /// No prior record on or before the cutoff; deltas are null.
    #[error("no baseline for {key:?} on or before {cutoff}")]
    MissingBaseline { key: String, cutoff: NaiveDate },

    /// A snapshot row violates an invariant and was left out.
    #[error("rejected row for app {app_id}: {reason}")]
    MalformedRow { app_id: u32, reason: String },
}

impl EngineError {
    pub fn malformed(app_id: u32, reason: impl Into<String>) -> Self {
        EngineError::MalformedRow {
            app_id,
            reason: reason.into(),
        }
    }
}
