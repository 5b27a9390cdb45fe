//! Sort-based percentile routine.

use ordered_float::OrderedFloat;

/// Quantile with linear interpolation between closest ranks.
///
/// Non-finite values are skipped. Returns `None` when nothing is left.
pub fn quantile(values: impl IntoIterator<Item = f64>, q: f64) -> Option<f64> {
    let mut sorted: Vec<OrderedFloat<f64>> = values
        .into_iter()
        .filter(|v| v.is_finite())
        .map(OrderedFloat)
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable();

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    let lo = sorted[lower].0;
    let hi = sorted[upper].0;
    Some(lo + (hi - lo) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert!(quantile(Vec::new(), 0.5).is_none());
        assert!(quantile(vec![f64::NAN], 0.5).is_none());
    }

    #[test]
    fn test_single_value() {
        assert_eq!(quantile(vec![7.0], 0.75), Some(7.0));
    }

    #[test]
    fn test_interpolates() {
        // Positions 0..4, q=0.75 -> pos 3.0 -> 4.0
        assert_eq!(quantile(vec![5.0, 1.0, 3.0, 2.0, 4.0], 0.75), Some(4.0));
        // q=0.7 over 4 values -> pos 2.1 -> 3 + 0.1 * (4 - 3)
        let q = quantile(vec![1.0, 2.0, 3.0, 4.0], 0.7).unwrap();
        assert!((q - 3.1).abs() < 1e-12);
    }

    #[test]
    fn test_bounds() {
        let values = vec![10.0, -2.0, 4.0];
        assert_eq!(quantile(values.clone(), 0.0), Some(-2.0));
        assert_eq!(quantile(values, 1.0), Some(10.0));
    }
}
