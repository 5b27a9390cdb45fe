//! Entry cluster detectors.
//!
//! Three independent proxies for where positions were opened:
//! - Hotzone: directional move + rising OI + heavy quote volume
//! - Volume spike: directional move + heavy quote volume, OI direction ignored
//! - VWAP: one neutral baseline entry for choppy windows
//!
//! Detectors return raw (unscaled) weights.

use crate::quantile::quantile;
use crate::runs::true_runs;
use liqmap_core::config::{BlendWeights, EntryConfig};
use liqmap_core::{Entry, EntrySide, MarketSample};
use std::ops::Range;

/// Entry detection methodology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMethod {
    Hotzone,
    VolumeOiSpike,
    Vwap,
}

impl EntryMethod {
    /// All methods in blend order.
    pub const ALL: [EntryMethod; 3] = [
        EntryMethod::Hotzone,
        EntryMethod::VolumeOiSpike,
        EntryMethod::Vwap,
    ];

    /// Share of the final entry book this method receives.
    pub fn share(self, blend: &BlendWeights) -> f64 {
        match self {
            EntryMethod::Hotzone => blend.hotzone,
            EntryMethod::VolumeOiSpike => blend.volume_oi,
            EntryMethod::Vwap => blend.vwap,
        }
    }

    /// Run the detector over a window.
    pub fn detect(self, samples: &[MarketSample], config: &EntryConfig) -> Vec<Entry> {
        match self {
            EntryMethod::Hotzone => detect_hotzones(samples, config),
            EntryMethod::VolumeOiSpike => detect_volume_spikes(samples, config),
            EntryMethod::Vwap => detect_vwap(samples).into_iter().collect(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntryMethod::Hotzone => "hotzone",
            EntryMethod::VolumeOiSpike => "volume_oi_spike",
            EntryMethod::Vwap => "vwap",
        }
    }
}

/// Volume-weighted average close. Falls back to the plain mean on zero volume.
pub fn volume_weighted_close(samples: &[MarketSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let volume: f64 = samples.iter().map(|s| s.volume).sum();
    if volume > 0.0 {
        let notional: f64 = samples.iter().map(|s| s.close * s.volume).sum();
        Some(notional / volume)
    } else {
        Some(samples.iter().map(|s| s.close).sum::<f64>() / samples.len() as f64)
    }
}

/// Build one entry per run, weighted by `weigh`.
fn entries_from_runs(
    samples: &[MarketSample],
    runs: Vec<Range<usize>>,
    side: EntrySide,
    weigh: impl Fn(&[MarketSample]) -> f64,
) -> Vec<Entry> {
    runs.into_iter()
        .filter_map(|run| {
            let bars = &samples[run];
            let price = volume_weighted_close(bars)?;
            Some(Entry {
                side,
                price,
                weight: weigh(bars),
                start_ts: bars[0].ts_ms,
                end_ts: bars[bars.len() - 1].ts_ms,
            })
        })
        .collect()
}

fn volume_threshold(samples: &[MarketSample], config: &EntryConfig) -> Option<f64> {
    quantile(samples.iter().map(|s| s.volume_usd), config.volume_quantile)
}

/// Directional move past the threshold: +1 up, -1 down, 0 otherwise.
fn move_direction(sample: &MarketSample, threshold: f64) -> i8 {
    match sample.price_return {
        Some(r) if r > threshold => 1,
        Some(r) if r < -threshold => -1,
        _ => 0,
    }
}

/// Bars where price moved hard, OI grew by a top-quantile amount and quote
/// volume was in the top quantile.
///
/// Weight is the run's summed OI delta, floored at zero.
pub fn detect_hotzones(samples: &[MarketSample], config: &EntryConfig) -> Vec<Entry> {
    let Some(volume_min) = volume_threshold(samples, config) else {
        return Vec::new();
    };
    let Some(oi_min) = quantile(
        samples.iter().filter_map(|s| s.oi_delta.map(f64::abs)),
        config.oi_delta_quantile,
    ) else {
        return Vec::new();
    };

    let qualifies = |s: &MarketSample, direction: i8| {
        move_direction(s, config.price_threshold) == direction
            && s.oi_delta.is_some_and(|d| d > oi_min)
            && s.volume_usd > volume_min
    };
    let oi_mass = |bars: &[MarketSample]| {
        bars.iter()
            .filter_map(|s| s.oi_delta)
            .sum::<f64>()
            .max(0.0)
    };

    let long_mask: Vec<bool> = samples.iter().map(|s| qualifies(s, 1)).collect();
    let short_mask: Vec<bool> = samples.iter().map(|s| qualifies(s, -1)).collect();

    let mut entries = entries_from_runs(samples, true_runs(&long_mask), EntrySide::Long, oi_mass);
    entries.extend(entries_from_runs(
        samples,
        true_runs(&short_mask),
        EntrySide::Short,
        oi_mass,
    ));
    entries
}

/// Bars with a hard directional move on top-quantile quote volume.
///
/// Weight is the run's summed quote volume.
pub fn detect_volume_spikes(samples: &[MarketSample], config: &EntryConfig) -> Vec<Entry> {
    let Some(volume_min) = volume_threshold(samples, config) else {
        return Vec::new();
    };

    let qualifies = |s: &MarketSample, direction: i8| {
        move_direction(s, config.price_threshold) == direction && s.volume_usd > volume_min
    };
    let quote_mass = |bars: &[MarketSample]| bars.iter().map(|s| s.volume_usd).sum::<f64>();

    let long_mask: Vec<bool> = samples.iter().map(|s| qualifies(s, 1)).collect();
    let short_mask: Vec<bool> = samples.iter().map(|s| qualifies(s, -1)).collect();

    let mut entries =
        entries_from_runs(samples, true_runs(&long_mask), EntrySide::Long, quote_mass);
    entries.extend(entries_from_runs(
        samples,
        true_runs(&short_mask),
        EntrySide::Short,
        quote_mass,
    ));
    entries
}

/// One neutral entry at the window VWAP with unit weight.
pub fn detect_vwap(samples: &[MarketSample]) -> Option<Entry> {
    let price = volume_weighted_close(samples)?;
    Some(Entry {
        side: EntrySide::Neutral,
        price,
        weight: 1.0,
        start_ts: samples[0].ts_ms,
        end_ts: samples[samples.len() - 1].ts_ms,
    })
}
