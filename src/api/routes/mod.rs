//! Route handlers.

pub mod market;
