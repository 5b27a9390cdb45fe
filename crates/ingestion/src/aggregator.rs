//! Cross-exchange aggregation into one canonical series.
//!
//! Collapses rows sharing a timestamp: mean close, summed volumes and open
//! interest, extreme high/low, mean funding. Then derives OI deltas and price
//! returns as first differences.

use liqmap_core::{Error, MarketRow, MarketSample, MarketSeries, Result, TimestampMs};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Accumulator for all rows sharing one timestamp.
#[derive(Debug, Clone)]
struct TimestampAccumulator {
    close_sum: f64,
    rows: u32,
    high: f64,
    low: f64,
    volume: f64,
    volume_usd: f64,
    oi_usd_hist: f64,
    oi_usd_current: f64,
    funding_sum: f64,
    funding_rows: u32,
}

impl TimestampAccumulator {
    fn new() -> Self {
        Self {
            close_sum: 0.0,
            rows: 0,
            high: f64::NEG_INFINITY,
            low: f64::INFINITY,
            volume: 0.0,
            volume_usd: 0.0,
            oi_usd_hist: 0.0,
            oi_usd_current: 0.0,
            funding_sum: 0.0,
            funding_rows: 0,
        }
    }

    fn add_row(&mut self, row: &MarketRow, oi_usd_hist: f64) {
        self.close_sum += row.close;
        self.rows += 1;
        self.high = self.high.max(row.high);
        self.low = self.low.min(row.low);
        self.volume += row.volume;
        self.volume_usd += quote_volume(row);
        self.oi_usd_hist += oi_usd_hist;
        self.oi_usd_current += row.oi_usd_current;
        if let Some(rate) = row.funding_rate {
            self.funding_sum += rate;
            self.funding_rows += 1;
        }
    }

    fn close(&self) -> f64 {
        self.close_sum / self.rows as f64
    }

    fn funding_rate(&self) -> f64 {
        if self.funding_rows > 0 {
            self.funding_sum / self.funding_rows as f64
        } else {
            0.0
        }
    }
}

/// Quote volume, derived from base volume when the venue leaves it empty.
fn quote_volume(row: &MarketRow) -> f64 {
    if row.volume_usd > 0.0 {
        row.volume_usd
    } else {
        row.volume * row.close
    }
}

/// Collapses raw multi-exchange rows into the canonical series.
#[derive(Debug, Clone, Default)]
pub struct MarketAggregator;

impl MarketAggregator {
    /// Create a new aggregator.
    pub fn new() -> Self {
        Self
    }

    /// Aggregate raw rows into a canonical, strictly ordered series.
    ///
    /// Rows may arrive in any order. Historical OI gaps (`None`) are
    /// forward-filled per exchange/symbol, leading gaps take the row's current
    /// OI. An explicit NaN historical OI is rejected.
    pub fn aggregate(&self, rows: &[MarketRow]) -> Result<MarketSeries> {
        if rows.is_empty() {
            return Err(Error::insufficient_data("no market rows to aggregate"));
        }
        for row in rows {
            validate_row(row)?;
        }

        let oi_hist = fill_open_interest_gaps(rows);

        let mut by_ts: BTreeMap<TimestampMs, TimestampAccumulator> = BTreeMap::new();
        for (row, oi) in rows.iter().zip(oi_hist) {
            by_ts
                .entry(row.ts_ms)
                .or_insert_with(TimestampAccumulator::new)
                .add_row(row, oi);
        }

        let mut samples = Vec::with_capacity(by_ts.len());
        let mut prev: Option<(f64, f64)> = None;

        for (ts_ms, acc) in by_ts {
            let close = acc.close();
            let (oi_delta, price_return) = match prev {
                Some((prev_close, prev_oi)) => {
                    let ret = if prev_close > 0.0 {
                        Some((close - prev_close) / prev_close)
                    } else {
                        None
                    };
                    (Some(acc.oi_usd_hist - prev_oi), ret)
                }
                None => (None, None),
            };
            prev = Some((close, acc.oi_usd_hist));

            samples.push(MarketSample {
                ts_ms,
                close,
                high: acc.high,
                low: acc.low,
                volume: acc.volume,
                volume_usd: acc.volume_usd,
                oi_usd_hist: acc.oi_usd_hist,
                oi_usd_current: acc.oi_usd_current,
                oi_delta,
                price_return,
                funding_rate: acc.funding_rate(),
            });
        }

        debug!(
            rows = rows.len(),
            samples = samples.len(),
            "aggregated market rows"
        );

        MarketSeries::new(samples)
    }
}

fn validate_row(row: &MarketRow) -> Result<()> {
    let fields = [
        ("close", row.close),
        ("high", row.high),
        ("low", row.low),
        ("volume", row.volume),
        ("volume_usd", row.volume_usd),
        ("oi_usd_current", row.oi_usd_current),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::data(format!(
            "{} {} at {}: {name} is not finite",
            row.exchange, row.symbol, row.ts_ms
        )));
    }
    if matches!(row.oi_usd_hist, Some(v) if v.is_nan()) {
        return Err(Error::data(format!(
            "{} {} at {}: oi_usd_hist is NaN",
            row.exchange, row.symbol, row.ts_ms
        )));
    }
    if matches!(row.funding_rate, Some(v) if !v.is_finite()) {
        return Err(Error::data(format!(
            "{} {} at {}: funding_rate is not finite",
            row.exchange, row.symbol, row.ts_ms
        )));
    }
    Ok(())
}

/// Resolve the historical OI of every row, index-aligned with `rows`.
fn fill_open_interest_gaps(rows: &[MarketRow]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&rows[a], &rows[b]);
        (ra.exchange.as_str(), ra.symbol.as_str(), ra.ts_ms)
            .cmp(&(rb.exchange.as_str(), rb.symbol.as_str(), rb.ts_ms))
    });

    let mut filled = vec![0.0; rows.len()];
    let mut last_seen: HashMap<(&str, &str), f64> = HashMap::new();

    for idx in order {
        let row = &rows[idx];
        let key = (row.exchange.as_str(), row.symbol.as_str());
        let value = match row.oi_usd_hist {
            Some(v) => v,
            None => last_seen.get(&key).copied().unwrap_or(row.oi_usd_current),
        };
        last_seen.insert(key, value);
        filled[idx] = value;
    }

    filled
}
