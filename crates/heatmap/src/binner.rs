//! Price bucketing of liquidation points.
//!
//! Buckets are symmetric around the current price and wide enough to hold the
//! farthest point. Each bucket carries its USD mass, relative intensity and a
//! clearance status from subsequent price action.

use crate::clearance::{bucket_penetration, ClearanceTally, PriceHistory};
use liqmap_core::config::BinningConfig;
use liqmap_core::{Bucket, Error, LiquidationPoint, Result};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use tracing::debug;

/// Liquidation point binner.
pub struct Binner {
    config: BinningConfig,
}

impl Binner {
    /// Create a new binner.
    pub fn new(config: BinningConfig) -> Self {
        Self { config }
    }

    /// `num_buckets + 1` evenly spaced edges, symmetric about `current_price`.
    ///
    /// Half-range is the farthest point's distance, or a fraction of the price
    /// when every point sits on the current price.
    pub fn edges(&self, points: &[LiquidationPoint], current_price: f64, num_buckets: usize) -> Vec<f64> {
        let max_distance = points
            .iter()
            .map(|p| (p.price - current_price).abs())
            .fold(0.0_f64, f64::max);
        let max_distance = if max_distance > 0.0 {
            max_distance
        } else {
            current_price.abs() * self.config.fallback_range_pct
        };

        let half = (num_buckets / 2) as f64;
        let bucket_size = max_distance / half;
        let lower = current_price - half * bucket_size;
        let upper = current_price + half * bucket_size;
        let step = (upper - lower) / num_buckets as f64;

        let mut edges: Vec<f64> = (0..=num_buckets).map(|i| lower + i as f64 * step).collect();
        edges[num_buckets] = upper;
        edges
    }

    /// Bin points into buckets sorted by descending intensity.
    ///
    /// Intervals are right-closed, the lowest one also includes its left edge.
    /// Every point lands in some bucket, so USD is conserved.
    pub fn bin(
        &self,
        points: &[LiquidationPoint],
        current_price: f64,
        num_buckets: usize,
        history: &PriceHistory,
    ) -> Result<Vec<Bucket>> {
        if num_buckets < 2 {
            return Err(Error::config(format!(
                "num_buckets must be at least 2, got {num_buckets}"
            )));
        }
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let edges = self.edges(points, current_price, num_buckets);
        let mut tallies = vec![ClearanceTally::default(); num_buckets];

        for point in points {
            let idx = edges
                .partition_point(|&e| e < point.price)
                .saturating_sub(1)
                .min(num_buckets - 1);
            let penetration = bucket_penetration(point, edges[idx], edges[idx + 1], history);
            tallies[idx].add(point.usd, penetration);
        }

        let max_usd = tallies.iter().map(|t| t.total_usd).fold(0.0_f64, f64::max);

        let mut buckets: Vec<Bucket> = tallies
            .iter()
            .enumerate()
            .map(|(i, tally)| {
                let (low, high) = (edges[i], edges[i + 1]);
                Bucket {
                    price_low: low,
                    price_high: high,
                    mid_price: (low + high) / 2.0,
                    usd: tally.total_usd,
                    intensity: intensity(tally.total_usd, max_usd),
                    status: tally.status(&self.config),
                }
            })
            .collect();

        buckets.sort_by_key(|b| Reverse(OrderedFloat(b.intensity)));

        debug!(
            points = points.len(),
            buckets = buckets.len(),
            width = edges[1] - edges[0],
            "binned liquidations"
        );

        Ok(buckets)
    }
}

/// 100 * usd / max_usd rounded to one decimal, 0 when there is no mass.
pub fn intensity(usd: f64, max_usd: f64) -> f64 {
    if max_usd > 0.0 {
        (usd / max_usd * 1000.0).round() / 10.0
    } else {
        0.0
    }
}
