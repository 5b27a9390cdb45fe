//! Entry cluster estimation for the liquidation map pipeline.
//!
//! This crate handles:
//! - Sort-based quantiles
//! - Run detection over qualifying bars
//! - Hotzone, volume spike and VWAP entry detectors
//! - Blending detector output into one normalized entry book

pub mod quantile;
pub mod runs;
pub mod detectors;
pub mod estimator;

pub use detectors::EntryMethod;
pub use estimator::{normalize_entries, scale_entries, EntryEstimator};
