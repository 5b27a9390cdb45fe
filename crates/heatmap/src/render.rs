//! Fixed-width text rendering of a liquidation map.

use liqmap_core::{ts_to_datetime, LiquidationMap};
use std::fmt::Write;

const WIDTH: usize = 60;

/// Render the header and the `rows` most intense buckets.
pub fn render_heatmap(map: &LiquidationMap, rows: usize) -> String {
    let rule = "=".repeat(WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:^WIDTH$}", "LIQUIDATION HEATMAP");
    let _ = writeln!(out, "{rule}");
    if let Some(as_of) = ts_to_datetime(map.as_of_ms) {
        let _ = writeln!(out, "As of: {}", as_of.format("%Y-%m-%d %H:%M UTC"));
    }
    let _ = writeln!(
        out,
        "Current Price: ${} | Total OI: ${:.2}B",
        thousands(map.current_price, 0),
        map.total_oi_usd / 1e9
    );
    let _ = writeln!(
        out,
        "Directional Bias: {} | UPWARD MAGNET: {} | DOWNWARD MAGNET: {}",
        map.direction.bias.as_str(),
        thousands(map.direction.upward_magnitude, 2),
        thousands(map.direction.downward_magnitude, 2)
    );
    out.push('\n');

    for bucket in map.buckets.iter().take(rows) {
        let bar = "█".repeat((bucket.intensity / 5.0) as usize);
        let side = if bucket.mid_price < map.current_price {
            "LONG"
        } else {
            "SHORT"
        };
        let _ = writeln!(
            out,
            "{:8} | {:5} ${:>8} | {:<20} {:5.1}% (${:.2}B)",
            bucket.status.as_str(),
            side,
            thousands(bucket.mid_price, 0),
            bar,
            bucket.intensity,
            bucket.usd / 1e9
        );
    }

    out
}

/// Fixed decimals with comma-grouped thousands.
fn thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        grouped.push('-');
    }
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}
