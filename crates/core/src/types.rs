//! Core data types for the liquidation map pipeline.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Convert a millisecond timestamp to a UTC datetime.
#[inline]
pub fn ts_to_datetime(ts_ms: TimestampMs) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts_ms)
}

/// One raw bar from one exchange/symbol, as handed over by the acquisition layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRow {
    /// Bar open timestamp (ms).
    pub ts_ms: TimestampMs,
    /// Exchange identifier.
    pub exchange: String,
    /// Exchange-native symbol.
    pub symbol: String,
    /// Close price.
    pub close: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Base-currency volume.
    pub volume: f64,
    /// Quote-currency volume (0 when the venue does not report it).
    pub volume_usd: f64,
    /// Historical open interest in USD (None = gap).
    pub oi_usd_hist: Option<f64>,
    /// Current open interest in USD.
    pub oi_usd_current: f64,
    /// Funding rate, if reported.
    pub funding_rate: Option<f64>,
}

/// One canonical per-timestamp sample after cross-exchange aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSample {
    /// Timestamp (ms).
    pub ts_ms: TimestampMs,
    /// Mean close across exchanges.
    pub close: f64,
    /// Highest high across exchanges.
    pub high: f64,
    /// Lowest low across exchanges.
    pub low: f64,
    /// Summed base volume.
    pub volume: f64,
    /// Summed quote volume.
    pub volume_usd: f64,
    /// Summed historical open interest (USD).
    pub oi_usd_hist: f64,
    /// Summed current open interest (USD).
    pub oi_usd_current: f64,
    /// First difference of `oi_usd_hist` (None on the first sample).
    pub oi_delta: Option<f64>,
    /// Percentage change of `close` (None on the first sample).
    pub price_return: Option<f64>,
    /// Mean funding rate of the reporting exchanges.
    pub funding_rate: f64,
}

impl MarketSample {
    /// First field holding NaN or an infinity, if any.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        let required = [
            ("close", self.close),
            ("high", self.high),
            ("low", self.low),
            ("volume", self.volume),
            ("volume_usd", self.volume_usd),
            ("oi_usd_hist", self.oi_usd_hist),
            ("oi_usd_current", self.oi_usd_current),
            ("funding_rate", self.funding_rate),
        ];
        let derived = [("oi_delta", self.oi_delta), ("price_return", self.price_return)];

        required
            .into_iter()
            .find(|(_, v)| !v.is_finite())
            .or_else(|| {
                derived
                    .into_iter()
                    .find_map(|(name, v)| v.filter(|v| !v.is_finite()).map(|v| (name, v)))
            })
            .map(|(name, _)| name)
    }
}

/// Canonical series: non-empty, strictly increasing timestamps, finite values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSeries {
    samples: Vec<MarketSample>,
}

impl MarketSeries {
    /// Wrap samples, checking the series invariants.
    pub fn new(samples: Vec<MarketSample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::insufficient_data("canonical series has no rows"));
        }
        if let Some(pair) = samples.windows(2).find(|w| w[1].ts_ms <= w[0].ts_ms) {
            return Err(Error::data(format!(
                "timestamps must strictly increase: {} followed by {}",
                pair[0].ts_ms, pair[1].ts_ms
            )));
        }
        if let Some((sample, field)) = samples
            .iter()
            .find_map(|s| s.non_finite_field().map(|field| (s, field)))
        {
            return Err(Error::data(format!(
                "sample at {}: {field} is not finite",
                sample.ts_ms
            )));
        }
        Ok(Self { samples })
    }

    /// All samples in time order.
    pub fn samples(&self) -> &[MarketSample] {
        &self.samples
    }

    /// Most recent sample.
    pub fn last(&self) -> &MarketSample {
        // Non-empty by construction.
        &self.samples[self.samples.len() - 1]
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate samples in time order.
    pub fn iter(&self) -> std::slice::Iter<'_, MarketSample> {
        self.samples.iter()
    }
}

/// Inferred side of an entry cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntrySide {
    Long,
    Short,
    /// No directional evidence; resolved per liquidation point.
    Neutral,
}

/// Side of a leveraged position (and of its liquidation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Get sign: +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    /// Label used in rendered output.
    pub fn as_str(self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
        }
    }
}

/// An inferred cluster of position entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Inferred side.
    pub side: EntrySide,
    /// Volume-weighted average price over the qualifying run.
    pub price: f64,
    /// Relative USD mass.
    pub weight: f64,
    /// First bar of the run.
    pub start_ts: TimestampMs,
    /// Last bar of the run.
    pub end_ts: TimestampMs,
}

impl Entry {
    /// Same entry carrying a different weight.
    pub fn with_weight(&self, weight: f64) -> Self {
        Self {
            weight,
            ..self.clone()
        }
    }
}

/// One point of a leverage distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeverageSample {
    /// Leverage multiple in [1, 125].
    pub leverage: f64,
    /// Probability weight; a full set sums to 1.
    pub weight: f64,
}

/// A projected liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidationPoint {
    /// Liquidation price.
    pub price: f64,
    /// USD notional liquidated.
    pub usd: f64,
    /// Side of the liquidated position.
    pub side: PositionSide,
    /// Start of the entry cluster the position came from.
    pub origin_ts: TimestampMs,
}

/// Whether subsequent price action already hit a liquidation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Active,
    Partial,
    Cleared,
}

impl Status {
    /// Label used in rendered output.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Partial => "PARTIAL",
            Status::Cleared => "CLEARED",
        }
    }
}

/// A price bucket of the heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Lower edge.
    pub price_low: f64,
    /// Upper edge.
    pub price_high: f64,
    /// Midpoint.
    pub mid_price: f64,
    /// Summed USD notional.
    pub usd: f64,
    /// 0-100 relative to the heaviest bucket, one decimal.
    pub intensity: f64,
    /// Clearance status.
    pub status: Status,
}

/// A liquidation point with its own clearance status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawLiquidation {
    pub price: f64,
    pub usd: f64,
    pub side: PositionSide,
    pub origin_ts: TimestampMs,
    pub status: Status,
}

/// Directional bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bias {
    Up,
    Down,
    Unbiased,
}

impl Bias {
    /// Label used in rendered output.
    pub fn as_str(self) -> &'static str {
        match self {
            Bias::Up => "UP",
            Bias::Down => "DOWN",
            Bias::Unbiased => "UNBIASED",
        }
    }
}

/// Aggregate pull of untriggered liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub bias: Bias,
    pub upward_magnitude: f64,
    pub downward_magnitude: f64,
}

impl Direction {
    /// No pull in either direction.
    pub fn unbiased() -> Self {
        Self {
            bias: Bias::Unbiased,
            upward_magnitude: 0.0,
            downward_magnitude: 0.0,
        }
    }
}

/// Current-state scalars of the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Close of the most recent bar.
    pub close: f64,
    /// Current open interest (USD) of the most recent bar.
    pub total_oi_usd: f64,
    /// Funding rate of the most recent bar.
    pub funding_rate: f64,
    /// Highest high of the window.
    pub high: f64,
    /// Lowest low of the window.
    pub low: f64,
}

/// Named leverage risk profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeverageProfile {
    Conservative,
    #[default]
    Neutral,
    Aggressive,
    /// Mean and spread follow the funding rate.
    Dynamic,
}

impl LeverageProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            LeverageProfile::Conservative => "conservative",
            LeverageProfile::Neutral => "neutral",
            LeverageProfile::Aggressive => "aggressive",
            LeverageProfile::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for LeverageProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeverageProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(LeverageProfile::Conservative),
            "neutral" => Ok(LeverageProfile::Neutral),
            "aggressive" => Ok(LeverageProfile::Aggressive),
            "dynamic" => Ok(LeverageProfile::Dynamic),
            other => Err(Error::config(format!("unknown leverage profile: {other}"))),
        }
    }
}

/// Everything the serving layer publishes for one refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationMap {
    /// Timestamp of the last canonical bar.
    pub as_of_ms: TimestampMs,
    /// Price the buckets and magnetism were centered on.
    pub current_price: f64,
    /// Total open interest the projected notionals were scaled to.
    pub total_oi_usd: f64,
    /// Profile the leverage mix was drawn from.
    pub profile: LeverageProfile,
    pub summary: SummaryStats,
    pub direction: Direction,
    /// Buckets sorted by descending intensity.
    pub buckets: Vec<Bucket>,
    /// Unbinned points with their own status.
    pub points: Vec<RawLiquidation>,
}

impl LiquidationMap {
    /// Serialize for the serving layer.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts_ms: TimestampMs) -> MarketSample {
        MarketSample {
            ts_ms,
            close: 100.0,
            high: 101.0,
            low: 99.0,
            volume: 1.0,
            volume_usd: 100.0,
            oi_usd_hist: 1000.0,
            oi_usd_current: 1000.0,
            oi_delta: None,
            price_return: None,
            funding_rate: 0.0,
        }
    }

    #[test]
    fn test_ts_to_datetime() {
        let dt = ts_to_datetime(1_704_067_200_000).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_series_rejects_empty() {
        let err = MarketSeries::new(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_series_rejects_duplicate_timestamps() {
        let err = MarketSeries::new(vec![sample(1), sample(2), sample(2)]).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_series_rejects_nan_open_interest() {
        let mut bad = sample(2);
        bad.oi_usd_hist = f64::NAN;
        let err = MarketSeries::new(vec![sample(1), bad]).unwrap_err();
        assert!(matches!(err, Error::Data(ref msg) if msg.contains("oi_usd_hist")));

        let mut bad = sample(2);
        bad.oi_delta = Some(f64::NAN);
        let err = MarketSeries::new(vec![sample(1), bad]).unwrap_err();
        assert!(matches!(err, Error::Data(ref msg) if msg.contains("oi_delta")));

        let mut bad = sample(1);
        bad.low = f64::NEG_INFINITY;
        assert!(MarketSeries::new(vec![bad]).is_err());
    }

    #[test]
    fn test_series_accepts_missing_derived_fields() {
        let mut second = sample(2);
        second.oi_delta = Some(0.0);
        second.price_return = Some(0.0);
        assert!(MarketSeries::new(vec![sample(1), second]).is_ok());
    }

    #[test]
    fn test_series_last() {
        let series = MarketSeries::new(vec![sample(1), sample(5)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().ts_ms, 5);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("Dynamic".parse::<LeverageProfile>().unwrap(), LeverageProfile::Dynamic);
        assert_eq!(" neutral ".parse::<LeverageProfile>().unwrap(), LeverageProfile::Neutral);
        assert!("yolo".parse::<LeverageProfile>().is_err());
        assert_eq!(LeverageProfile::Aggressive.to_string(), "aggressive");
    }

    #[test]
    fn test_entry_with_weight() {
        let entry = Entry {
            side: EntrySide::Long,
            price: 100.0,
            weight: 5.0,
            start_ts: 1,
            end_ts: 2,
        };
        let scaled = entry.with_weight(0.5);
        assert_eq!(scaled.weight, 0.5);
        assert_eq!(scaled.price, 100.0);
        assert_eq!(entry.weight, 5.0);
    }

    #[test]
    fn test_position_side_sign() {
        assert_eq!(PositionSide::Long.sign(), 1.0);
        assert_eq!(PositionSide::Short.sign(), -1.0);
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&Status::Cleared).unwrap(), "\"CLEARED\"");
        assert_eq!(serde_json::to_string(&LeverageProfile::Dynamic).unwrap(), "\"dynamic\"");
    }
}
