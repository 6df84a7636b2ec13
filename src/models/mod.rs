//! Core data models for the market engine.

mod correlation;
mod genre;
mod ids;
mod score;
mod snapshot;

pub use correlation::*;
pub use genre::*;
pub use ids::*;
pub use score::*;
pub use snapshot::*;
