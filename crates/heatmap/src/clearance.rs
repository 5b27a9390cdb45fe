//! Clearance: has subsequent price action already reached a level?
//!
//! Only bars strictly after a point's origin count. A point without later
//! bars is Active.

use liqmap_core::config::BinningConfig;
use liqmap_core::{LiquidationPoint, MarketSeries, PositionSide, RawLiquidation, Status, TimestampMs};

/// Lowest low and highest high over a stretch of bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremes {
    pub low: f64,
    pub high: f64,
}

/// Suffix extremes of the canonical series for O(log n) lookups.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    ts: Vec<TimestampMs>,
    /// `suffix[i]` covers bars `i..`.
    suffix: Vec<Extremes>,
}

impl PriceHistory {
    /// Build from a canonical series.
    pub fn new(series: &MarketSeries) -> Self {
        let ts: Vec<TimestampMs> = series.iter().map(|s| s.ts_ms).collect();
        let mut suffix = vec![
            Extremes {
                low: f64::INFINITY,
                high: f64::NEG_INFINITY,
            };
            ts.len()
        ];

        let mut running = Extremes {
            low: f64::INFINITY,
            high: f64::NEG_INFINITY,
        };
        for (i, sample) in series.samples().iter().enumerate().rev() {
            running.low = running.low.min(sample.low);
            running.high = running.high.max(sample.high);
            suffix[i] = running;
        }

        Self { ts, suffix }
    }

    /// Extremes of all bars strictly after `ts_ms`, or None if there are none.
    pub fn extremes_after(&self, ts_ms: TimestampMs) -> Option<Extremes> {
        let first = self.ts.partition_point(|&t| t <= ts_ms);
        self.suffix.get(first).copied()
    }
}

/// Status of a single point against its own liquidation price.
///
/// A point is a zero-width level, so it is either Cleared or Active.
pub fn point_status(point: &LiquidationPoint, history: &PriceHistory) -> Status {
    let Some(after) = history.extremes_after(point.origin_ts) else {
        return Status::Active;
    };
    let reached = match point.side {
        PositionSide::Long => after.low <= point.price,
        PositionSide::Short => after.high >= point.price,
    };
    if reached {
        Status::Cleared
    } else {
        Status::Active
    }
}

/// Annotate every point with its own status.
pub fn annotate_points(points: &[LiquidationPoint], history: &PriceHistory) -> Vec<RawLiquidation> {
    points
        .iter()
        .map(|p| RawLiquidation {
            price: p.price,
            usd: p.usd,
            side: p.side,
            origin_ts: p.origin_ts,
            status: point_status(p, history),
        })
        .collect()
}

/// How far a point's later price action penetrated a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Penetration {
    /// Reached the far edge (lower edge for longs, upper for shorts).
    Full,
    /// Entered the bucket without crossing it.
    Partial,
    None,
}

/// Penetration of `[bucket_low, bucket_high]` by the price action after a point.
pub fn bucket_penetration(
    point: &LiquidationPoint,
    bucket_low: f64,
    bucket_high: f64,
    history: &PriceHistory,
) -> Penetration {
    let Some(after) = history.extremes_after(point.origin_ts) else {
        return Penetration::None;
    };
    let (full, entered) = match point.side {
        PositionSide::Long => (after.low <= bucket_low, after.low < bucket_high),
        PositionSide::Short => (after.high >= bucket_high, after.high > bucket_low),
    };
    if full {
        Penetration::Full
    } else if entered {
        Penetration::Partial
    } else {
        Penetration::None
    }
}

/// Cleared and partial USD accumulated for one bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearanceTally {
    pub total_usd: f64,
    pub cleared_usd: f64,
    pub partial_usd: f64,
}

impl ClearanceTally {
    pub fn add(&mut self, usd: f64, penetration: Penetration) {
        self.total_usd += usd;
        match penetration {
            Penetration::Full => self.cleared_usd += usd,
            Penetration::Partial => self.partial_usd += usd,
            Penetration::None => {}
        }
    }

    /// Bucket status from USD-weighted fractions.
    pub fn status(&self, config: &BinningConfig) -> Status {
        if self.total_usd <= 0.0 {
            return Status::Active;
        }
        let cleared = self.cleared_usd / self.total_usd;
        let partial = self.partial_usd / self.total_usd;

        if cleared > config.cleared_threshold {
            Status::Cleared
        } else if partial > config.partial_threshold || cleared > config.partial_threshold {
            Status::Partial
        } else {
            Status::Active
        }
    }
}
