//! Market data normalization for the liquidation map pipeline.
//!
//! This crate handles:
//! - Cross-exchange aggregation (same-timestamp rows)
//! - Historical open interest gap filling
//! - OI delta and price return derivation

pub mod aggregator;

pub use aggregator::MarketAggregator;
