//! Entry book estimation.
//!
//! Runs every detector, scales each method's raw weights to its blend share and
//! renormalizes the combined book to unit mass.

use crate::detectors::EntryMethod;
use liqmap_core::config::EntryConfig;
use liqmap_core::{Entry, MarketSeries, SummaryStats};
use tracing::debug;

/// Rescale entries so their weights sum to `share`.
///
/// When the raw weights sum to zero the share is split equally.
pub fn scale_entries(entries: &[Entry], share: f64) -> Vec<Entry> {
    if entries.is_empty() {
        return Vec::new();
    }
    let total: f64 = entries.iter().map(|e| e.weight).sum();
    if total > 0.0 {
        entries
            .iter()
            .map(|e| e.with_weight(e.weight / total * share))
            .collect()
    } else {
        let equal = share / entries.len() as f64;
        entries.iter().map(|e| e.with_weight(equal)).collect()
    }
}

/// Rescale entries so their weights sum to 1.
pub fn normalize_entries(entries: &[Entry]) -> Vec<Entry> {
    scale_entries(entries, 1.0)
}

/// Entry book estimator.
pub struct EntryEstimator {
    config: EntryConfig,
}

impl EntryEstimator {
    /// Create a new estimator.
    pub fn new(config: EntryConfig) -> Self {
        Self { config }
    }

    /// Infer the blended entry book. An empty book is a valid result.
    pub fn estimate(&self, series: &MarketSeries) -> Vec<Entry> {
        let samples = series.samples();
        let mut book = Vec::new();

        for method in EntryMethod::ALL {
            let raw = method.detect(samples, &self.config);
            let share = method.share(&self.config.blend);
            debug!(method = method.name(), entries = raw.len(), share, "detected entries");
            book.extend(scale_entries(&raw, share));
        }

        normalize_entries(&book)
    }

    /// Latest close, current OI and funding plus the window's extremes.
    pub fn summary_stats(series: &MarketSeries) -> SummaryStats {
        let last = series.last();
        let (high, low) = series
            .iter()
            .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), s| {
                (hi.max(s.high), lo.min(s.low))
            });

        SummaryStats {
            close: last.close,
            total_oi_usd: last.oi_usd_current,
            funding_rate: last.funding_rate,
            high,
            low,
        }
    }
}
