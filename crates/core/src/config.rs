//! Configuration structures for the liquidation map pipeline.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Exchanges the acquisition layer knows how to talk to.
pub const KNOWN_EXCHANGES: &[&str] = &[
    "binance",
    "bybit",
    "okx",
    "hyperliquid",
    "mexc",
    "krakenfutures",
    "kucoinfutures",
    "gateio",
    "bitget",
    "deribit",
];

/// Tickers with enough derivatives depth to map.
pub const KNOWN_TICKERS: &[&str] = &["BTC", "ETH", "SOL", "BNB", "XRP", "DOGE", "ADA"];

/// Main configuration for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Market selection.
    pub market: MarketConfig,
    /// Entry detection configuration.
    pub entries: EntryConfig,
    /// Leverage distribution configuration.
    pub leverage: LeverageConfig,
    /// Liquidation price buffer configuration.
    pub liquidation: LiquidationConfig,
    /// Price bucketing configuration.
    pub binning: BinningConfig,
    /// Magnetism configuration.
    pub magnetism: MagnetismConfig,
}

impl Config {
    /// Parse a configuration from a JSON string. Missing sections take defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Check every section for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.entries.validate()?;
        self.leverage.validate()?;
        self.liquidation.validate()?;
        self.binning.validate()?;
        self.magnetism.validate()
    }
}

/// Market selection handed to the acquisition layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Base asset ticker (e.g., "BTC").
    pub ticker: String,
    /// Exchange identifiers.
    pub exchanges: Vec<String>,
    /// Bar timeframe.
    pub timeframe: String,
    /// Lookback window in days.
    pub lookback_days: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            ticker: "BTC".to_string(),
            exchanges: vec![
                "binance".to_string(),
                "bybit".to_string(),
                "okx".to_string(),
                "hyperliquid".to_string(),
            ],
            timeframe: "1h".to_string(),
            lookback_days: 14.0,
        }
    }
}

impl MarketConfig {
    /// Return a copy with ticker, exchanges and lookback normalized.
    ///
    /// Unknown tickers fall back to BTC, unknown exchanges are dropped and the
    /// lookback is clamped to [0.5, 30] days.
    pub fn sanitized(&self) -> Self {
        let ticker = self.ticker.to_uppercase();
        let ticker = if KNOWN_TICKERS.contains(&ticker.as_str()) {
            ticker
        } else {
            "BTC".to_string()
        };

        let exchanges = self
            .exchanges
            .iter()
            .map(|ex| ex.to_lowercase())
            .filter(|ex| KNOWN_EXCHANGES.contains(&ex.as_str()))
            .collect();

        Self {
            ticker,
            exchanges,
            timeframe: self.timeframe.clone(),
            lookback_days: self.lookback_days.clamp(0.5, 30.0),
        }
    }

    /// Lookback expressed in hourly bars.
    pub fn lookback_hours(&self) -> u32 {
        (24.0 * self.lookback_days) as u32
    }
}

/// Blend shares of the three entry detection methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    /// Share of the price/OI hotzone detector.
    pub hotzone: f64,
    /// Share of the volume/OI spike detector.
    pub volume_oi: f64,
    /// Share of the window VWAP baseline.
    pub vwap: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            hotzone: 0.70,
            volume_oi: 0.20,
            vwap: 0.10,
        }
    }
}

/// Entry detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    /// Minimum absolute bar return to count as directional (0.008 = 0.8%).
    pub price_threshold: f64,
    /// Quantile of |OI delta| a bar must exceed (0.70 = top 30%).
    pub oi_delta_quantile: f64,
    /// Quantile of quote volume a bar must exceed (0.75 = top 25%).
    pub volume_quantile: f64,
    /// Method blend shares.
    pub blend: BlendWeights,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            price_threshold: 0.008,
            oi_delta_quantile: 0.70,
            volume_quantile: 0.75,
            blend: BlendWeights::default(),
        }
    }
}

impl EntryConfig {
    fn validate(&self) -> Result<()> {
        for (name, q) in [
            ("oi_delta_quantile", self.oi_delta_quantile),
            ("volume_quantile", self.volume_quantile),
        ] {
            if !(0.0..=1.0).contains(&q) {
                return Err(Error::config(format!("{name} must be in [0, 1], got {q}")));
            }
        }
        if !(self.price_threshold >= 0.0) {
            return Err(Error::config(format!(
                "price_threshold must be non-negative, got {}",
                self.price_threshold
            )));
        }
        let blend = &self.blend;
        if [blend.hotzone, blend.volume_oi, blend.vwap]
            .iter()
            .any(|w| !(*w >= 0.0))
        {
            return Err(Error::config("blend weights must be non-negative"));
        }
        Ok(())
    }
}

/// Mean and standard deviation of a leverage distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    pub mean: f64,
    pub std: f64,
}

/// Leverage distribution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverageConfig {
    /// Number of leverage samples drawn per refresh.
    pub num_samples: usize,
    /// Lowest leverage a sample is clipped to.
    pub min_leverage: f64,
    /// Highest leverage a sample is clipped to.
    pub max_leverage: f64,
    /// Low leverage, wide spread.
    pub conservative: NormalParams,
    /// Mid leverage, moderate spread.
    pub neutral: NormalParams,
    /// High leverage.
    pub aggressive: NormalParams,
    /// Dynamic profile mean at zero funding.
    pub dynamic_base_mean: f64,
    /// Mean increase per unit of aggressiveness.
    pub dynamic_mean_slope: f64,
    /// Dynamic profile std at zero funding.
    pub dynamic_base_std: f64,
    /// Std decrease per unit of aggressiveness.
    pub dynamic_std_slope: f64,
    /// Multiplier turning |funding rate| into aggressiveness.
    pub funding_scale: f64,
    /// Aggressiveness cap.
    pub max_aggressiveness: f64,
}

impl Default for LeverageConfig {
    fn default() -> Self {
        Self {
            num_samples: 200,
            min_leverage: 1.0,
            max_leverage: 125.0,
            conservative: NormalParams { mean: 12.0, std: 8.0 },
            neutral: NormalParams { mean: 25.0, std: 15.0 },
            aggressive: NormalParams { mean: 60.0, std: 25.0 },
            dynamic_base_mean: 25.0,
            dynamic_mean_slope: 30.0,
            dynamic_base_std: 15.0,
            dynamic_std_slope: 5.0,
            funding_scale: 10_000.0,
            max_aggressiveness: 2.0,
        }
    }
}

impl LeverageConfig {
    fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(Error::config("leverage num_samples must be at least 1"));
        }
        if !(self.min_leverage >= 1.0 && self.max_leverage <= 125.0)
            || self.min_leverage > self.max_leverage
        {
            return Err(Error::config(format!(
                "leverage bounds [{}, {}] must lie within [1, 125]",
                self.min_leverage, self.max_leverage
            )));
        }
        for (name, p) in [
            ("conservative", self.conservative),
            ("neutral", self.neutral),
            ("aggressive", self.aggressive),
        ] {
            if !(p.std > 0.0) || !p.mean.is_finite() {
                return Err(Error::config(format!(
                    "profile {name} needs finite mean and positive std"
                )));
            }
        }
        let tightest = self.dynamic_base_std - self.dynamic_std_slope * self.max_aggressiveness;
        if !(tightest > 0.0) {
            return Err(Error::config(format!(
                "dynamic profile std reaches {tightest} at the aggressiveness cap"
            )));
        }
        Ok(())
    }
}

/// Liquidation price buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidationConfig {
    /// Maintenance margin rate.
    pub maintenance_margin_rate: f64,
    /// Taker fee charged on the forced close.
    pub fee_buffer: f64,
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            maintenance_margin_rate: 0.005,
            fee_buffer: 0.001,
        }
    }
}

impl LiquidationConfig {
    /// Margin plus fee buffer applied to every liquidation price.
    #[inline]
    pub fn total_buffer(&self) -> f64 {
        self.maintenance_margin_rate + self.fee_buffer
    }

    fn validate(&self) -> Result<()> {
        if !(self.maintenance_margin_rate >= 0.0 && self.fee_buffer >= 0.0) {
            return Err(Error::config("liquidation buffers must be non-negative"));
        }
        Ok(())
    }
}

/// Price bucketing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    /// Number of buckets spanning both sides of the current price.
    pub num_buckets: usize,
    /// Half-range used when every point sits on the current price (fraction of price).
    pub fallback_range_pct: f64,
    /// Cleared USD fraction above which a bucket is Cleared.
    pub cleared_threshold: f64,
    /// Partial (or cleared) USD fraction above which a bucket is Partial.
    pub partial_threshold: f64,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            num_buckets: 40,
            fallback_range_pct: 0.01,
            cleared_threshold: 0.8,
            partial_threshold: 0.2,
        }
    }
}

impl BinningConfig {
    fn validate(&self) -> Result<()> {
        if self.num_buckets < 2 {
            return Err(Error::config(format!(
                "num_buckets must be at least 2, got {}",
                self.num_buckets
            )));
        }
        if !(self.fallback_range_pct > 0.0) {
            return Err(Error::config("fallback_range_pct must be positive"));
        }
        Ok(())
    }
}

/// Magnetism configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnetismConfig {
    /// Distance decay exponent.
    pub decay: f64,
    /// Distance floor for points sitting on the current price.
    pub min_distance: f64,
    /// Normalized imbalance required to call a bias.
    pub bias_threshold: f64,
}

impl Default for MagnetismConfig {
    fn default() -> Self {
        Self {
            decay: 2.0,
            min_distance: 0.01,
            bias_threshold: 0.05,
        }
    }
}

impl MagnetismConfig {
    fn validate(&self) -> Result<()> {
        if !(self.decay > 0.0 && self.min_distance > 0.0) {
            return Err(Error::config("decay and min_distance must be positive"));
        }
        Ok(())
    }
}
