//! Directional pull of untriggered liquidity.

use liqmap_core::config::MagnetismConfig;
use liqmap_core::{Bias, Direction, PositionSide, RawLiquidation, Status};
use tracing::debug;

/// Resolves the magnetism bias from the annotated point list.
pub struct MagnetismResolver {
    config: MagnetismConfig,
}

impl MagnetismResolver {
    /// Create a new resolver.
    pub fn new(config: MagnetismConfig) -> Self {
        Self { config }
    }

    /// Inverse-distance pull of one side's Active points.
    fn pull(&self, current_price: f64, points: &[RawLiquidation], side: PositionSide) -> f64 {
        points
            .iter()
            .filter(|p| p.status == Status::Active && p.side == side)
            .map(|p| {
                let distance = (current_price - p.price).abs().max(self.config.min_distance);
                p.usd / distance.powf(self.config.decay)
            })
            .sum()
    }

    /// Shorts above pull up, longs below pull down. Cleared and partial
    /// points exert no pull.
    pub fn resolve(&self, current_price: f64, points: &[RawLiquidation]) -> Direction {
        let up = self.pull(current_price, points, PositionSide::Short);
        let down = self.pull(current_price, points, PositionSide::Long);
        let total = up + down;

        if !(total > 0.0) {
            return Direction::unbiased();
        }

        let imbalance = (up - down).abs() / total;
        let bias = if imbalance > self.config.bias_threshold {
            if up > down {
                Bias::Up
            } else {
                Bias::Down
            }
        } else {
            Bias::Unbiased
        };

        debug!(bias = bias.as_str(), up, down, imbalance, "resolved magnetism");

        Direction {
            bias,
            upward_magnitude: up,
            downward_magnitude: down,
        }
    }
}
