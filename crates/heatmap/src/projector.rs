//! Liquidation projection.
//!
//! Crosses the entry book with the leverage distribution: every
//! (entry, leverage) pair becomes one liquidation point.

use liqmap_core::config::LiquidationConfig;
use liqmap_core::{Entry, EntrySide, Error, LeverageSample, LiquidationPoint, PositionSide, Result};
use rand::Rng;
use tracing::debug;

/// Price at which a position opened at `entry_price` is force-closed.
///
/// The margin/fee buffer moves the level further from entry:
/// long = p(1 - 1/L) + p*buffer, short = p(1 + 1/L) - p*buffer.
#[inline]
pub fn liquidation_price(entry_price: f64, leverage: f64, side: PositionSide, total_buffer: f64) -> f64 {
    let sign = side.sign();
    entry_price * (1.0 - sign / leverage) + sign * entry_price * total_buffer
}

/// Projects entries into liquidation points.
pub struct LiquidationProjector {
    config: LiquidationConfig,
}

impl LiquidationProjector {
    /// Create a new projector.
    pub fn new(config: LiquidationConfig) -> Self {
        Self { config }
    }

    /// Liquidation price with the configured buffer.
    pub fn price(&self, entry_price: f64, leverage: f64, side: PositionSide) -> f64 {
        liquidation_price(entry_price, leverage, side, self.config.total_buffer())
    }

    /// Project every (entry, leverage) pair.
    ///
    /// Neutral entries get an independent coin flip per point, so their mass
    /// splits across both sides. Fails if there is mass to project but
    /// `total_oi_usd` is not positive.
    pub fn project<R: Rng + ?Sized>(
        &self,
        entries: &[Entry],
        leverages: &[LeverageSample],
        total_oi_usd: f64,
        rng: &mut R,
    ) -> Result<Vec<LiquidationPoint>> {
        let entry_mass: f64 = entries.iter().map(|e| e.weight).sum();
        let leverage_mass: f64 = leverages.iter().map(|l| l.weight).sum();
        if entry_mass * leverage_mass > 0.0 && !(total_oi_usd > 0.0 && total_oi_usd.is_finite()) {
            return Err(Error::data(format!(
                "total open interest must be positive to project liquidations, got {total_oi_usd}"
            )));
        }

        let mut points = Vec::with_capacity(entries.len() * leverages.len());

        for entry in entries {
            for lev in leverages {
                let side = match entry.side {
                    EntrySide::Long => PositionSide::Long,
                    EntrySide::Short => PositionSide::Short,
                    EntrySide::Neutral => {
                        if rng.gen_bool(0.5) {
                            PositionSide::Long
                        } else {
                            PositionSide::Short
                        }
                    }
                };

                points.push(LiquidationPoint {
                    price: self.price(entry.price, lev.leverage, side),
                    usd: entry.weight * lev.weight * total_oi_usd,
                    side,
                    origin_ts: entry.start_ts,
                });
            }
        }

        debug!(
            entries = entries.len(),
            leverages = leverages.len(),
            points = points.len(),
            "projected liquidation points"
        );

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(side: EntrySide, price: f64, weight: f64) -> Entry {
        Entry {
            side,
            price,
            weight,
            start_ts: 42,
            end_ts: 43,
        }
    }

    fn projector() -> LiquidationProjector {
        LiquidationProjector::new(LiquidationConfig::default())
    }

    #[test]
    fn test_long_entry_at_10x() {
        let mut rng = StdRng::seed_from_u64(0);
        let points = projector()
            .project(
                &[entry(EntrySide::Long, 100.0, 1.0)],
                &[LeverageSample { leverage: 10.0, weight: 1.0 }],
                1_000.0,
                &mut rng,
            )
            .unwrap();

        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].price, 90.6, epsilon = 1e-9);
        assert_relative_eq!(points[0].usd, 1_000.0, epsilon = 1e-9);
        assert_eq!(points[0].side, PositionSide::Long);
        assert_eq!(points[0].origin_ts, 42);
    }

    #[test]
    fn test_short_price() {
        // 100 * 1.1 - 100 * 0.006
        assert_relative_eq!(
            liquidation_price(100.0, 10.0, PositionSide::Short, 0.006),
            109.4,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_higher_leverage_moves_closer_to_entry() {
        for side in [PositionSide::Long, PositionSide::Short] {
            let distances: Vec<f64> = [2.0, 5.0, 10.0, 25.0, 50.0, 100.0]
                .iter()
                .map(|&l| (liquidation_price(100.0, l, side, 0.006) - 100.0).abs())
                .collect();
            assert!(distances.windows(2).all(|w| w[1] < w[0]), "{side:?}: {distances:?}");
        }
    }

    #[test]
    fn test_notional_is_product_of_weights() {
        let mut rng = StdRng::seed_from_u64(0);
        let points = projector()
            .project(
                &[entry(EntrySide::Short, 100.0, 0.25)],
                &[
                    LeverageSample { leverage: 5.0, weight: 0.4 },
                    LeverageSample { leverage: 20.0, weight: 0.6 },
                ],
                2_000.0,
                &mut rng,
            )
            .unwrap();
        assert_relative_eq!(points[0].usd, 200.0, epsilon = 1e-9);
        assert_relative_eq!(points[1].usd, 300.0, epsilon = 1e-9);
        assert!(points.iter().all(|p| p.price > 100.0));
    }

    #[test]
    fn test_neutral_entry_splits_per_point() {
        let mut rng = StdRng::seed_from_u64(99);
        let leverages: Vec<LeverageSample> = (0..400)
            .map(|i| LeverageSample {
                leverage: 10.0 + (i % 50) as f64,
                weight: 1.0 / 400.0,
            })
            .collect();
        let points = projector()
            .project(&[entry(EntrySide::Neutral, 100.0, 1.0)], &leverages, 1.0, &mut rng)
            .unwrap();

        let longs = points.iter().filter(|p| p.side == PositionSide::Long).count();
        let shorts = points.len() - longs;
        assert!(longs > 100 && shorts > 100, "longs={longs} shorts={shorts}");
        for p in &points {
            match p.side {
                PositionSide::Long => assert!(p.price < 100.0),
                PositionSide::Short => assert!(p.price > 100.0),
            }
        }
    }

    #[test]
    fn test_non_positive_open_interest_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = projector()
            .project(
                &[entry(EntrySide::Long, 100.0, 1.0)],
                &[LeverageSample { leverage: 10.0, weight: 1.0 }],
                0.0,
                &mut rng,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_empty_book_projects_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        let points = projector()
            .project(&[], &[LeverageSample { leverage: 10.0, weight: 1.0 }], 0.0, &mut rng)
            .unwrap();
        assert!(points.is_empty());
    }
}
