//! Liquidation map engine.
//!
//! Runs the whole pipeline for one refresh: entry book, leverage mix,
//! projection, bucketing with clearance, and magnetism.

use crate::{
    binner::Binner,
    clearance::{annotate_points, PriceHistory},
    leverage::LeverageModel,
    magnetism::MagnetismResolver,
    projector::LiquidationProjector,
};
use liqmap_core::{
    Config, Error, LeverageProfile, LiquidationMap, MarketRow, MarketSeries, Result, SummaryStats,
};
use liqmap_features::EntryEstimator;
use liqmap_ingestion::MarketAggregator;
use rand::Rng;
use tracing::{debug, info};

/// Current-state scalars for one computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapInputs {
    pub current_price: f64,
    pub total_open_interest_usd: f64,
    pub funding_rate: f64,
    pub profile: LeverageProfile,
    pub num_buckets: usize,
}

impl MapInputs {
    /// Price, OI and funding taken from the latest bar of the window.
    pub fn from_summary(summary: &SummaryStats, profile: LeverageProfile, num_buckets: usize) -> Self {
        Self {
            current_price: summary.close,
            total_open_interest_usd: summary.total_oi_usd,
            funding_rate: summary.funding_rate,
            profile,
            num_buckets,
        }
    }
}

/// End-to-end liquidation map engine.
pub struct HeatmapEngine {
    aggregator: MarketAggregator,
    estimator: EntryEstimator,
    leverage: LeverageModel,
    projector: LiquidationProjector,
    binner: Binner,
    magnetism: MagnetismResolver,
    /// Default bucket count for `compute_from_rows`.
    num_buckets: usize,
}

impl HeatmapEngine {
    /// Create a new engine from a validated configuration.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            aggregator: MarketAggregator::new(),
            estimator: EntryEstimator::new(config.entries.clone()),
            leverage: LeverageModel::new(config.leverage.clone()),
            projector: LiquidationProjector::new(config.liquidation.clone()),
            binner: Binner::new(config.binning.clone()),
            magnetism: MagnetismResolver::new(config.magnetism.clone()),
            num_buckets: config.binning.num_buckets,
        })
    }

    /// Compute the map for a canonical series and explicit scalars.
    pub fn compute<R: Rng + ?Sized>(
        &self,
        series: &MarketSeries,
        inputs: &MapInputs,
        rng: &mut R,
    ) -> Result<LiquidationMap> {
        let current_price = inputs.current_price;
        if !(current_price > 0.0 && current_price.is_finite()) {
            return Err(Error::data(format!("current price must be positive, got {current_price}")));
        }

        let entries = self.estimator.estimate(series);
        let leverages = self.leverage.sample(inputs.profile, inputs.funding_rate, rng)?;
        let points = self
            .projector
            .project(&entries, &leverages, inputs.total_open_interest_usd, rng)?;

        let history = PriceHistory::new(series);
        let buckets = self.binner.bin(&points, current_price, inputs.num_buckets, &history)?;
        let raw_points = annotate_points(&points, &history);
        let direction = self.magnetism.resolve(current_price, &raw_points);

        info!(
            profile = %inputs.profile,
            entries = entries.len(),
            points = raw_points.len(),
            bias = direction.bias.as_str(),
            "computed liquidation map"
        );

        Ok(LiquidationMap {
            as_of_ms: series.last().ts_ms,
            current_price,
            total_oi_usd: inputs.total_open_interest_usd,
            profile: inputs.profile,
            summary: EntryEstimator::summary_stats(series),
            direction,
            buckets,
            points: raw_points,
        })
    }

    /// Aggregate raw rows and compute the map at the latest bar's price and OI.
    pub fn compute_from_rows<R: Rng + ?Sized>(
        &self,
        rows: &[MarketRow],
        profile: LeverageProfile,
        rng: &mut R,
    ) -> Result<LiquidationMap> {
        let series = self.aggregator.aggregate(rows)?;
        let summary = EntryEstimator::summary_stats(&series);
        let inputs = MapInputs::from_summary(&summary, profile, self.num_buckets);

        debug!(
            bars = series.len(),
            close = summary.close,
            oi = summary.total_oi_usd,
            "derived map inputs from latest bar"
        );

        self.compute(&series, &inputs, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use liqmap_core::{Bias, Direction, MarketSample, Status};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const OI: f64 = 5_000_000_000.0;

    fn row(exchange: &str, i: i64, close: f64, volume: f64, oi_hist: f64) -> MarketRow {
        MarketRow {
            ts_ms: i * 3_600_000,
            exchange: exchange.to_string(),
            symbol: "BTCUSDT".to_string(),
            close,
            high: close * 1.002,
            low: close * 0.998,
            volume,
            volume_usd: volume * close,
            oi_usd_hist: Some(oi_hist),
            oi_usd_current: OI / 2.0,
            funding_rate: Some(0.0001),
        }
    }

    /// A ramp up with a volume and OI burst, then a flat stretch.
    fn rows() -> Vec<MarketRow> {
        let mut close = 60_000.0;
        let mut oi = 1_000_000_000.0;
        let mut rows = Vec::new();
        for i in 0..48 {
            let burst = (10..14).contains(&i);
            if burst {
                close *= 1.02;
                oi += 50_000_000.0;
            } else {
                oi += 1_000_000.0;
            }
            let volume = if burst { 900.0 } else { 100.0 };
            rows.push(row("binance", i, close, volume, oi));
            rows.push(row("bybit", i, close * 1.0005, volume / 2.0, oi / 2.0));
        }
        rows
    }

    fn engine() -> HeatmapEngine {
        HeatmapEngine::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_map_from_rows() {
        let mut rng = StdRng::seed_from_u64(5);
        let map = engine()
            .compute_from_rows(&rows(), LeverageProfile::Neutral, &mut rng)
            .unwrap();

        assert_eq!(map.as_of_ms, 47 * 3_600_000);
        assert_relative_eq!(map.total_oi_usd, OI, max_relative = 1e-12);
        assert_relative_eq!(map.summary.total_oi_usd, OI, max_relative = 1e-12);
        assert_relative_eq!(map.summary.funding_rate, 0.0001, epsilon = 1e-12);
        assert_eq!(map.buckets.len(), 40);

        let binned: f64 = map.buckets.iter().map(|b| b.usd).sum();
        let raw: f64 = map.points.iter().map(|p| p.usd).sum();
        assert_relative_eq!(binned, OI, max_relative = 1e-6);
        assert_relative_eq!(raw, OI, max_relative = 1e-6);

        assert_eq!(map.buckets[0].intensity, 100.0);
        assert!(map.buckets.windows(2).all(|w| w[0].intensity >= w[1].intensity));
    }

    #[test]
    fn test_seeded_runs_match() {
        let a = engine()
            .compute_from_rows(&rows(), LeverageProfile::Dynamic, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = engine()
            .compute_from_rows(&rows(), LeverageProfile::Dynamic, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(a.buckets, b.buckets);
        assert_eq!(a.points, b.points);
        assert_eq!(a.direction, b.direction);
    }

    /// Flat bars at 100 with one bar after the first that trades through every level.
    fn swept_series() -> MarketSeries {
        let samples = (0..4)
            .map(|i| {
                let (low, high) = if i == 1 { (0.01, 1_000_000.0) } else { (99.0, 101.0) };
                MarketSample {
                    ts_ms: i * 3_600_000,
                    close: 100.0,
                    high,
                    low,
                    volume: 1.0,
                    volume_usd: 100.0,
                    oi_usd_hist: 1_000.0,
                    oi_usd_current: 1_000.0,
                    oi_delta: (i > 0).then_some(0.0),
                    price_return: (i > 0).then_some(0.0),
                    funding_rate: 0.0,
                }
            })
            .collect();
        MarketSeries::new(samples).unwrap()
    }

    #[test]
    fn test_cleared_points_do_not_pull() {
        let series = swept_series();
        let summary = EntryEstimator::summary_stats(&series);
        let inputs = MapInputs::from_summary(&summary, LeverageProfile::Aggressive, 40);
        let map = engine()
            .compute(&series, &inputs, &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert!(!map.points.is_empty());
        assert!(map.points.iter().all(|p| p.status == Status::Cleared));
        assert_eq!(map.direction, Direction::unbiased());
        assert_eq!(map.direction.bias, Bias::Unbiased);
    }

    #[test]
    fn test_nan_open_interest_never_reaches_compute() {
        let series = MarketAggregator::new().aggregate(&rows()).unwrap();
        let mut samples = series.samples().to_vec();
        samples[20].oi_usd_hist = f64::NAN;
        samples[20].oi_delta = Some(f64::NAN);
        samples[21].oi_delta = Some(f64::NAN);

        let err = MarketSeries::new(samples).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_zero_open_interest_is_rejected() {
        let aggregator = MarketAggregator::new();
        let series = aggregator.aggregate(&rows()).unwrap();
        let summary = EntryEstimator::summary_stats(&series);
        let mut inputs = MapInputs::from_summary(&summary, LeverageProfile::Neutral, 40);
        inputs.total_open_interest_usd = 0.0;

        let err = engine()
            .compute(&series, &inputs, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_invalid_inputs() {
        let series = MarketAggregator::new().aggregate(&rows()).unwrap();
        let summary = EntryEstimator::summary_stats(&series);
        let mut rng = StdRng::seed_from_u64(0);

        let mut inputs = MapInputs::from_summary(&summary, LeverageProfile::Neutral, 40);
        inputs.current_price = 0.0;
        assert!(matches!(engine().compute(&series, &inputs, &mut rng), Err(Error::Data(_))));

        let inputs = MapInputs::from_summary(&summary, LeverageProfile::Neutral, 1);
        assert!(matches!(engine().compute(&series, &inputs, &mut rng), Err(Error::Config(_))));

        assert!(matches!(
            engine().compute_from_rows(&[], LeverageProfile::Neutral, &mut rng),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.binning.num_buckets = 1;
        assert!(HeatmapEngine::new(&config).is_err());
    }

    #[test]
    fn test_map_serializes() {
        let mut rng = StdRng::seed_from_u64(2);
        let map = engine()
            .compute_from_rows(&rows(), LeverageProfile::Conservative, &mut rng)
            .unwrap();
        let json = map.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["profile"], "conservative");
        assert_eq!(value["buckets"].as_array().map(Vec::len), Some(40));
    }
}
